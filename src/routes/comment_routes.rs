use axum::{routing::get, Router};

use crate::{controllers::comment_controller::CommentController, AppState};

pub struct CommentRoutes;

impl CommentRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/",
                get(CommentController::list_comments).post(CommentController::create_comment),
            )
            .route("/song/{song_id}", get(CommentController::song_comments))
            .route(
                "/{comment_id}",
                get(CommentController::get_comment)
                    .patch(CommentController::update_comment)
                    .delete(CommentController::delete_comment),
            )
    }
}
