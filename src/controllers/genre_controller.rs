use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::AdminCtx,
    models::{
        database_helpers::ApiResponse,
        genre::{CreateGenreRequest, GenreView, UpdateGenreRequest},
        song::SongView,
    },
    services::{genre_service::GenreService, song_service::sign_covers},
    AppState, Result,
};

pub struct GenreController;

impl GenreController {
    pub async fn create_genre(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Json(payload): Json<CreateGenreRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<GenreView>>)> {
        let genre = GenreService::create_genre(&state.db, payload).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(genre))))
    }

    pub async fn list_genres(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<GenreView>>>> {
        let genres = GenreService::find_all(&state.db).await?;
        Ok(Json(ApiResponse::ok(genres)))
    }

    pub async fn get_genre(
        State(state): State<AppState>,
        Path(genre_id): Path<String>,
    ) -> Result<Json<ApiResponse<GenreView>>> {
        let genre = GenreService::get_genre(&state.db, &genre_id).await?;
        Ok(Json(ApiResponse::ok(GenreView::from(genre))))
    }

    pub async fn update_genre(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(genre_id): Path<String>,
        Json(payload): Json<UpdateGenreRequest>,
    ) -> Result<Json<ApiResponse<GenreView>>> {
        let genre = GenreService::update_genre(&state.db, &genre_id, payload).await?;
        Ok(Json(ApiResponse::ok(genre)))
    }

    pub async fn delete_genre(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(genre_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        GenreService::delete_genre(&state.db, &genre_id).await?;
        Ok(Json(ApiResponse::with_message("Genre deleted successfully", ())))
    }

    pub async fn genre_songs(
        State(state): State<AppState>,
        Path(genre_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<SongView>>>> {
        let mut songs = GenreService::songs_of_genre(&state.db, &genre_id).await?;
        sign_covers(&state.storage, &mut songs);
        Ok(Json(ApiResponse::ok(songs)))
    }
}
