use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        social::{CreateFollowerRequest, FollowListEntry, FollowerView},
    },
    services::follower_service::FollowerService,
    AppState, Result,
};

pub struct FollowerController;

impl FollowerController {
    pub async fn follow(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateFollowerRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<FollowerView>>)> {
        let follow = FollowerService::follow(&state.db, &ctx.user_id, &payload.following_id).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(follow))))
    }

    pub async fn unfollow(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(follow_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        FollowerService::unfollow(&state.db, &ctx, &follow_id).await?;
        Ok(Json(ApiResponse::with_message("Unfollowed successfully", ())))
    }

    pub async fn followers(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<FollowListEntry>>>> {
        let list = FollowerService::followers_of(&state.db, &user_id, Some(&ctx.user_id)).await?;
        Ok(Json(ApiResponse::ok(list)))
    }

    pub async fn following(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<FollowListEntry>>>> {
        let list = FollowerService::following_of(&state.db, &user_id, Some(&ctx.user_id)).await?;
        Ok(Json(ApiResponse::ok(list)))
    }
}
