use axum::{routing::get, Router};

use crate::{controllers::admin_controller::AdminController, AppState};

pub struct AdminRoutes;

impl AdminRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/dashboard/stats", get(AdminController::dashboard_stats))
            .route("/dashboard/activity", get(AdminController::dashboard_activity))
    }
}
