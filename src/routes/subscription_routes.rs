use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::subscription_controller::SubscriptionController, AppState};

pub struct SubscriptionRoutes;

impl SubscriptionRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/current", get(SubscriptionController::current))
            .route("/limits", get(SubscriptionController::limits))
            .route("/stats", get(SubscriptionController::stats))
            .route("/plans", get(SubscriptionController::plans))
            .route("/create", post(SubscriptionController::create))
            .route("/cancel", post(SubscriptionController::cancel))
            .route("/check/songs/{count}", get(SubscriptionController::check_songs))
            .route(
                "/check/playlists/{count}",
                get(SubscriptionController::check_playlists),
            )
            .route(
                "/check/filesize/{size}",
                get(SubscriptionController::check_file_size),
            )
    }
}
