use axum::{routing::get, Router};

use crate::{controllers::playback_controller::PlaybackController, AppState};

pub struct PlaybackRoutes;

impl PlaybackRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new().route(
            "/session",
            get(PlaybackController::get_session).post(PlaybackController::save_session),
        )
    }
}
