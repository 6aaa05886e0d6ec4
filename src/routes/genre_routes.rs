use axum::{routing::get, Router};

use crate::{controllers::genre_controller::GenreController, AppState};

pub struct GenreRoutes;

impl GenreRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/",
                get(GenreController::list_genres).post(GenreController::create_genre),
            )
            .route(
                "/{genre_id}",
                get(GenreController::get_genre)
                    .patch(GenreController::update_genre)
                    .delete(GenreController::delete_genre),
            )
            .route("/{genre_id}/songs", get(GenreController::genre_songs))
    }
}
