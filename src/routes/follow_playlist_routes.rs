use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{controllers::follow_playlist_controller::FollowPlaylistController, AppState};

pub struct FollowPlaylistRoutes;

impl FollowPlaylistRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/", post(FollowPlaylistController::create_follow))
            .route("/user/followed", get(FollowPlaylistController::followed_by_me))
            .route(
                "/{id}/follow",
                post(FollowPlaylistController::follow),
            )
            .route(
                "/{id}/unfollow",
                delete(FollowPlaylistController::unfollow),
            )
            .route(
                "/{id}/status",
                get(FollowPlaylistController::status),
            )
            .route(
                "/{id}/followers",
                get(FollowPlaylistController::followers),
            )
            .route("/{id}", delete(FollowPlaylistController::remove))
    }
}
