use axum::{routing::get, Router};

use crate::{controllers::health_controller::HealthController, AppState};

pub struct HealthRoutes;

impl HealthRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/", get(HealthController::check))
            .route("/ping", get(HealthController::ping))
    }
}
