use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        social::{
            CreateFollowPlaylistRequest, FollowPlaylistStatus, FollowPlaylistView,
            FollowedPlaylist, PlaylistFollowers,
        },
    },
    services::follow_playlist_service::FollowPlaylistService,
    AppState, Result,
};

pub struct FollowPlaylistController;

impl FollowPlaylistController {
    pub async fn create_follow(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateFollowPlaylistRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<FollowPlaylistView>>)> {
        let follow =
            FollowPlaylistService::follow(&state.db, &ctx.user_id, &payload.playlist_id).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(follow))))
    }

    pub async fn follow(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
    ) -> Result<(StatusCode, Json<ApiResponse<FollowPlaylistView>>)> {
        let follow = FollowPlaylistService::follow(&state.db, &ctx.user_id, &playlist_id).await?;
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message("Playlist followed", follow)),
        ))
    }

    pub async fn unfollow(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        FollowPlaylistService::unfollow(&state.db, &ctx.user_id, &playlist_id).await?;
        Ok(Json(ApiResponse::with_message("Playlist unfollowed", ())))
    }

    pub async fn status(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
    ) -> Result<Json<ApiResponse<FollowPlaylistStatus>>> {
        let status = FollowPlaylistService::status(&state.db, &ctx.user_id, &playlist_id).await?;
        Ok(Json(ApiResponse::ok(status)))
    }

    pub async fn followers(
        State(state): State<AppState>,
        Path(playlist_id): Path<String>,
    ) -> Result<Json<ApiResponse<PlaylistFollowers>>> {
        let followers = FollowPlaylistService::followers(&state.db, &playlist_id).await?;
        Ok(Json(ApiResponse::ok(followers)))
    }

    pub async fn followed_by_me(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<Vec<FollowedPlaylist>>>> {
        let playlists = FollowPlaylistService::followed_by(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn remove(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(follow_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        FollowPlaylistService::remove_by_id(&state.db, &ctx, &follow_id).await?;
        Ok(Json(ApiResponse::with_message("Follow removed", ())))
    }
}
