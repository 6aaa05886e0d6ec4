use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::{controllers::playlist_controller::PlaylistController, AppState};

const COVER_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub struct PlaylistRoutes;

impl PlaylistRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/",
                get(PlaylistController::list_playlists).post(PlaylistController::create_playlist),
            )
            .route("/featured", get(PlaylistController::featured))
            .route("/user", get(PlaylistController::my_playlists))
            .route("/user/{user_id}", get(PlaylistController::user_playlists))
            .route("/all", get(PlaylistController::list_all_for_admin))
            .route(
                "/{playlist_id}",
                get(PlaylistController::get_details)
                    .patch(PlaylistController::update_playlist)
                    .delete(PlaylistController::delete_playlist),
            )
            .route(
                "/{playlist_id}/reorder",
                patch(PlaylistController::reorder_songs),
            )
            .route(
                "/{playlist_id}/songs/{song_id}",
                post(PlaylistController::add_song).delete(PlaylistController::remove_song),
            )
            .route(
                "/{playlist_id}/featured",
                patch(PlaylistController::set_featured),
            )
            .route(
                "/{playlist_id}/cover",
                post(PlaylistController::upload_cover)
                    .layer(DefaultBodyLimit::max(COVER_BODY_LIMIT)),
            )
    }
}
