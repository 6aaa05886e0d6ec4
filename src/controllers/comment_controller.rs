use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        social::{CommentView, CreateCommentRequest, UpdateCommentRequest},
    },
    services::comment_service::CommentService,
    AppState, Result,
};

pub struct CommentController;

impl CommentController {
    pub async fn create_comment(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateCommentRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<CommentView>>)> {
        let comment = CommentService::create_comment(&state.db, &ctx.user_id, payload).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(comment))))
    }

    pub async fn list_comments(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<CommentView>>>> {
        let comments = CommentService::find_all(&state.db).await?;
        Ok(Json(ApiResponse::ok(comments)))
    }

    pub async fn song_comments(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<CommentView>>>> {
        let comments = CommentService::find_by_song(&state.db, &song_id).await?;
        Ok(Json(ApiResponse::ok(comments)))
    }

    pub async fn get_comment(
        State(state): State<AppState>,
        Path(comment_id): Path<String>,
    ) -> Result<Json<ApiResponse<CommentView>>> {
        let comment = CommentService::find_one(&state.db, &comment_id).await?;
        Ok(Json(ApiResponse::ok(comment)))
    }

    pub async fn update_comment(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(comment_id): Path<String>,
        Json(payload): Json<UpdateCommentRequest>,
    ) -> Result<Json<ApiResponse<CommentView>>> {
        let comment =
            CommentService::update_comment(&state.db, &ctx, &comment_id, &payload.content).await?;
        Ok(Json(ApiResponse::ok(comment)))
    }

    pub async fn delete_comment(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(comment_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        CommentService::delete_comment(&state.db, &ctx, &comment_id).await?;
        Ok(Json(ApiResponse::with_message("Comment deleted successfully", ())))
    }
}
