use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::{controllers::user_controller::UserController, AppState};

const AVATAR_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub struct UserRoutes;

impl UserRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/",
                get(UserController::list_users).post(UserController::create_user),
            )
            .route("/all", get(UserController::list_all_for_admin))
            .route("/discover", get(UserController::discover))
            .route("/popular", get(UserController::discover))
            .route(
                "/{user_id}",
                get(UserController::get_profile)
                    .patch(UserController::update_user)
                    .delete(UserController::delete_user),
            )
            .route(
                "/{user_id}/songs-playlists",
                get(UserController::songs_and_playlists),
            )
            .route("/{user_id}/status", patch(UserController::update_status))
            .route("/{user_id}/role", patch(UserController::update_role))
            .route(
                "/{user_id}/avatar",
                post(UserController::upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
            )
    }
}
