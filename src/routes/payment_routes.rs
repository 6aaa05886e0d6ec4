use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::payment_controller::PaymentController, AppState};

pub struct PaymentRoutes;

impl PaymentRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/create-subscription",
                post(PaymentController::create_subscription),
            )
            .route("/webhook", post(PaymentController::webhook))
            .route("/return", get(PaymentController::payment_return))
            .route(
                "/current-subscription",
                get(PaymentController::current_subscription),
            )
            .route("/payment-history", get(PaymentController::payment_history))
    }
}
