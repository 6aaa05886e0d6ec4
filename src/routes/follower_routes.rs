use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{controllers::follower_controller::FollowerController, AppState};

pub struct FollowerRoutes;

impl FollowerRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/", post(FollowerController::follow))
            .route("/{id}", delete(FollowerController::unfollow))
            .route("/{id}/followers", get(FollowerController::followers))
            .route("/{id}/following", get(FollowerController::following))
    }
}
