use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{controllers::like_controller::LikeController, AppState};

pub struct LikeRoutes;

impl LikeRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/", post(LikeController::create_like))
            .route("/like/{song_id}", post(LikeController::like_song))
            .route("/unlike/{song_id}", post(LikeController::unlike_song))
            .route("/status/{song_id}", get(LikeController::status))
            .route("/count/{song_id}", get(LikeController::count))
            .route("/check/{song_id}", get(LikeController::check))
            .route("/song/{song_id}", delete(LikeController::unlike_song))
            .route("/{like_id}", delete(LikeController::remove_like))
    }
}
