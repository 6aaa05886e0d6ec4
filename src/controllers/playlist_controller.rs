use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    helpers::upload_helpers::{ensure_content_type, UploadForm},
    middlewares::mw_auth::{AdminCtx, Ctx},
    models::{
        database_helpers::ApiResponse,
        playlist::{
            CreatePlaylistRequest, FeaturePlaylistRequest, PlaylistDetails, PlaylistListQuery,
            PlaylistView, ReorderPlaylistRequest, UpdatePlaylistRequest,
        },
    },
    services::{
        playlist_service::PlaylistService, song_service::sign_covers,
        storage_service::StorageFolder,
    },
    AppState, Result,
};

pub struct PlaylistController;

impl PlaylistController {
    pub async fn create_playlist(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreatePlaylistRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<PlaylistView>>)> {
        let playlist = PlaylistService::create_playlist(&state.db, &ctx.user_id, payload).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(playlist))))
    }

    pub async fn list_playlists(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Query(query): Query<PlaylistListQuery>,
    ) -> Result<Json<ApiResponse<Vec<PlaylistView>>>> {
        let playlists = PlaylistService::find_all(&state.db, ctx.as_ref(), query).await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn featured(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<PlaylistView>>>> {
        let playlists = PlaylistService::find_featured(&state.db).await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn my_playlists(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<Vec<PlaylistView>>>> {
        let playlists =
            PlaylistService::find_user_playlists(&state.db, &ctx.user_id, Some(&ctx.user_id))
                .await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn user_playlists(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<PlaylistView>>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let playlists = PlaylistService::find_user_playlists(&state.db, &user_id, viewer).await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn list_all_for_admin(
        State(state): State<AppState>,
        _admin: AdminCtx,
    ) -> Result<Json<ApiResponse<Vec<PlaylistView>>>> {
        let playlists = PlaylistService::find_all_for_admin(&state.db).await?;
        Ok(Json(ApiResponse::ok(playlists)))
    }

    pub async fn get_details(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(playlist_id): Path<String>,
    ) -> Result<Json<ApiResponse<PlaylistDetails>>> {
        let mut details = PlaylistService::get_details(&state.db, ctx.as_ref(), &playlist_id).await?;
        sign_covers(&state.storage, &mut details.songs);
        Ok(Json(ApiResponse::ok(details)))
    }

    pub async fn update_playlist(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
        Json(payload): Json<UpdatePlaylistRequest>,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        let playlist =
            PlaylistService::update_playlist(&state.db, &ctx, &playlist_id, payload).await?;
        Ok(Json(ApiResponse::ok(playlist)))
    }

    pub async fn reorder_songs(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
        Json(payload): Json<ReorderPlaylistRequest>,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        let playlist =
            PlaylistService::reorder_songs(&state.db, &ctx, &playlist_id, payload.song_ids).await?;
        Ok(Json(ApiResponse::with_message("Playlist reordered", playlist)))
    }

    pub async fn add_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path((playlist_id, song_id)): Path<(String, String)>,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        let playlist = PlaylistService::add_song(&state.db, &ctx, &playlist_id, &song_id).await?;
        Ok(Json(ApiResponse::with_message("Song added to playlist", playlist)))
    }

    pub async fn remove_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path((playlist_id, song_id)): Path<(String, String)>,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        let playlist =
            PlaylistService::remove_song(&state.db, &ctx, &playlist_id, &song_id).await?;
        Ok(Json(ApiResponse::with_message("Song removed from playlist", playlist)))
    }

    pub async fn set_featured(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(playlist_id): Path<String>,
        Json(payload): Json<FeaturePlaylistRequest>,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        let playlist =
            PlaylistService::set_featured(&state.db, &playlist_id, payload.is_featured).await?;
        Ok(Json(ApiResponse::ok(playlist)))
    }

    /// Multipart field `cover`.
    pub async fn upload_cover(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
        multipart: Multipart,
    ) -> Result<Json<ApiResponse<PlaylistView>>> {
        PlaylistService::get_managed_playlist(&state.db, &ctx, &playlist_id).await?;

        let mut form = UploadForm::read(multipart).await?;
        let file = form.require_file("cover")?;
        ensure_content_type(&file, "image/")?;

        let url = state
            .storage
            .upload(&file.bytes, &file.file_name, StorageFolder::Covers)
            .await?;
        let updated =
            PlaylistService::set_cover(&state.db, &state.storage, &ctx, &playlist_id, url.clone())
                .await;
        match updated {
            Ok(playlist) => Ok(Json(ApiResponse::with_message(
                "Cover uploaded successfully",
                playlist,
            ))),
            Err(err) => {
                state.storage.delete(&url).await?;
                Err(err)
            }
        }
    }

    pub async fn delete_playlist(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(playlist_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        PlaylistService::delete_playlist(&state.db, &state.storage, &ctx, &playlist_id).await?;
        Ok(Json(ApiResponse::with_message("Playlist deleted successfully", ())))
    }
}
