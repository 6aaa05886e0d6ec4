use axum::{routing::get, Router};

use crate::{controllers::file_controller::FileController, AppState};

pub struct FileRoutes;

impl FileRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new().route("/{*key}", get(FileController::serve))
    }
}
