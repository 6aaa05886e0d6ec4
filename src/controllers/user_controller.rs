use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::Error,
    helpers::{
        upload_helpers::{ensure_content_type, UploadForm},
        user_helpers::get_user,
    },
    middlewares::mw_auth::{AdminCtx, Ctx},
    models::{
        database_helpers::ApiResponse,
        playlist::UserSongsAndPlaylists,
        user::{
            CreateUserRequest, DiscoverQuery, UpdateRoleRequest, UpdateStatusRequest,
            UpdateUserRequest, UserListPage, UserListQuery, UserProfileView, UserView,
            UserWithFollowStats,
        },
    },
    services::{
        song_service::sign_covers, storage_service::StorageFolder, user_service::UserService,
    },
    AppState, Result,
};

pub struct UserController;

impl UserController {
    pub async fn create_user(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Json(payload): Json<CreateUserRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<UserView>>)> {
        let user = UserService::create_user(&state.db, payload).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
    }

    pub async fn list_users(
        State(state): State<AppState>,
        _ctx: Ctx,
        Query(query): Query<UserListQuery>,
    ) -> Result<Json<ApiResponse<UserListPage>>> {
        let page = UserService::find_paged(&state.db, query).await?;
        Ok(Json(ApiResponse::ok(page)))
    }

    pub async fn list_all_for_admin(
        State(state): State<AppState>,
        _admin: AdminCtx,
    ) -> Result<Json<ApiResponse<Vec<UserView>>>> {
        let users = UserService::find_all_for_admin(&state.db).await?;
        Ok(Json(ApiResponse::ok(users)))
    }

    /// Serves both `/discover` and `/popular`.
    pub async fn discover(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Query(query): Query<DiscoverQuery>,
    ) -> Result<Json<ApiResponse<Vec<UserWithFollowStats>>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let users = UserService::discover(&state.db, viewer, query.limit).await?;
        Ok(Json(ApiResponse::ok(users)))
    }

    pub async fn get_profile(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<UserProfileView>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let profile = UserService::get_profile(&state.db, viewer, &user_id).await?;
        Ok(Json(ApiResponse::ok(profile)))
    }

    pub async fn songs_and_playlists(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<UserSongsAndPlaylists>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let mut res = UserService::songs_and_playlists(&state.db, viewer, &user_id).await?;
        sign_covers(&state.storage, &mut res.songs);
        Ok(Json(ApiResponse::ok(res)))
    }

    pub async fn update_user(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(user_id): Path<String>,
        Json(payload): Json<UpdateUserRequest>,
    ) -> Result<Json<ApiResponse<UserView>>> {
        let user = UserService::update_user(&state.db, &ctx, &user_id, payload).await?;
        Ok(Json(ApiResponse::ok(user)))
    }

    pub async fn update_status(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(user_id): Path<String>,
        Json(payload): Json<UpdateStatusRequest>,
    ) -> Result<Json<ApiResponse<UserView>>> {
        let user = UserService::update_status(&state.db, &user_id, payload.status).await?;
        Ok(Json(ApiResponse::ok(user)))
    }

    pub async fn update_role(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(user_id): Path<String>,
        Json(payload): Json<UpdateRoleRequest>,
    ) -> Result<Json<ApiResponse<UserView>>> {
        let user = UserService::update_role(&state.db, &user_id, payload.role).await?;
        Ok(Json(ApiResponse::ok(user)))
    }

    /// Multipart field `avatar`.
    pub async fn upload_avatar(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(user_id): Path<String>,
        multipart: Multipart,
    ) -> Result<Json<ApiResponse<UserView>>> {
        if !ctx.can_manage(&user_id) {
            return Err(Error::Forbidden {
                reason: "You can only modify your own account".to_string(),
            });
        }
        get_user(&state.db, &user_id).await?;

        let mut form = UploadForm::read(multipart).await?;
        let file = form.require_file("avatar")?;
        ensure_content_type(&file, "image/")?;

        let url = state
            .storage
            .upload(&file.bytes, &file.file_name, StorageFolder::Avatars)
            .await?;
        let updated =
            UserService::set_avatar(&state.db, &state.storage, &ctx, &user_id, url.clone()).await;
        let user = match updated {
            Ok(user) => user,
            Err(err) => {
                state.storage.delete(&url).await?;
                return Err(err);
            }
        };

        Ok(Json(ApiResponse::with_message("Avatar uploaded successfully", user)))
    }

    pub async fn delete_user(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        UserService::delete_user(&state.db, &state.storage, &ctx, &user_id).await?;
        Ok(Json(ApiResponse::with_message("User deleted successfully", ())))
    }
}
