use axum::{routing::get, Router};

use crate::{controllers::proxy_controller::ProxyController, AppState};

pub struct ProxyRoutes;

impl ProxyRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new().route("/audio/{song_id}", get(ProxyController::audio))
    }
}
