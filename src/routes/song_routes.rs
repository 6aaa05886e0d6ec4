use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::{controllers::song_controller::SongController, AppState};

/// Largest plan allows 100MB files; leave room for the other form fields.
const UPLOAD_BODY_LIMIT: usize = 110 * 1024 * 1024;

pub struct SongRoutes;

impl SongRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/",
                get(SongController::list_public).post(SongController::create_song),
            )
            .route("/all", get(SongController::list_all_for_admin))
            .route("/user-songs", get(SongController::my_songs))
            .route("/feed", get(SongController::feed))
            .route("/user/{user_id}", get(SongController::user_songs))
            .route("/search", get(SongController::search))
            .route("/search/lyrics", get(SongController::search_lyrics))
            .route(
                "/embeddings/backfill",
                post(SongController::backfill_embeddings),
            )
            .route(
                "/upload",
                post(SongController::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            )
            .route(
                "/upload-with-data",
                post(SongController::upload_with_data)
                    .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            )
            .route("/get-signed-url", post(SongController::signed_url))
            .route("/admin/flag-reports", get(SongController::flag_reports))
            .route(
                "/admin/flag-reports/{report_id}/review",
                patch(SongController::review_flag_report),
            )
            .route("/admin/flagged", get(SongController::flagged_songs))
            .route(
                "/{song_id}",
                get(SongController::get_song)
                    .patch(SongController::update_song)
                    .delete(SongController::delete_song),
            )
            .route("/{song_id}/plays", patch(SongController::increment_plays))
            .route("/{song_id}/lyrics", patch(SongController::update_lyrics))
            .route("/{song_id}/flag", patch(SongController::flag_song))
            .route("/{song_id}/audio-url", get(SongController::audio_url))
            .route("/{song_id}/report", post(SongController::report_song))
    }
}
