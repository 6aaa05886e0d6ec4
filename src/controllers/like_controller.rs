use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        social::{CreateLikeRequest, LikeCheck, LikeCount, LikeStatus, LikeToggleResult, LikeView},
    },
    services::like_service::LikeService,
    AppState, Result,
};

pub struct LikeController;

impl LikeController {
    pub async fn create_like(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateLikeRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<LikeView>>)> {
        let like = LikeService::like(&state.db, &ctx.user_id, &payload.song_id).await?;
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message("Like added successfully", like)),
        ))
    }

    pub async fn like_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<LikeToggleResult>>> {
        let res = LikeService::like_song(&state.db, &ctx.user_id, &song_id).await?;
        Ok(Json(ApiResponse::with_message("Song liked successfully", res)))
    }

    /// Serves both `POST /unlike/{song_id}` and `DELETE /song/{song_id}`.
    pub async fn unlike_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<LikeToggleResult>>> {
        let res = LikeService::unlike_song(&state.db, &ctx.user_id, &song_id).await?;
        Ok(Json(ApiResponse::with_message("Song unliked successfully", res)))
    }

    pub async fn status(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<LikeStatus>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let status = LikeService::get_status(&state.db, viewer, &song_id).await?;
        Ok(Json(ApiResponse::ok(status)))
    }

    pub async fn count(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<LikeCount>>> {
        let count = LikeService::count(&state.db, &song_id).await?;
        Ok(Json(ApiResponse::ok(LikeCount { count })))
    }

    pub async fn check(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<LikeCheck>>> {
        let check = LikeService::check(&state.db, &ctx.user_id, &song_id).await?;
        Ok(Json(ApiResponse::ok(check)))
    }

    pub async fn remove_like(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(like_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        LikeService::remove_by_id(&state.db, &ctx, &like_id).await?;
        Ok(Json(ApiResponse::with_message("Like removed successfully", ())))
    }
}
