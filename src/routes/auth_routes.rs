use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{controllers::auth_controller::AuthController, AppState};

pub struct AuthRoutes;

impl AuthRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/register", post(AuthController::register))
            .route("/login", post(AuthController::login))
            .route("/verify", put(AuthController::verify))
            .route("/resend-verify", put(AuthController::resend_verify))
            .route("/forgot-password", post(AuthController::forgot_password))
            .route("/reset-password", put(AuthController::reset_password))
            .route("/profile", get(AuthController::profile))
    }
}
