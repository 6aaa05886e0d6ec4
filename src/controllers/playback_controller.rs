use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        playback::{PlaybackQuery, PlaybackSessionView, SavePlaybackRequest},
    },
    services::playback_service::PlaybackService,
    AppState, Result,
};

/// Sessions always belong to the caller; a user id in the body is ignored.
pub struct PlaybackController;

impl PlaybackController {
    pub async fn save_session(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<SavePlaybackRequest>,
    ) -> Result<Json<ApiResponse<PlaybackSessionView>>> {
        let session = PlaybackService::save_session(&state.db, &ctx.user_id, payload).await?;
        Ok(Json(ApiResponse::ok(session)))
    }

    pub async fn get_session(
        State(state): State<AppState>,
        ctx: Ctx,
        Query(query): Query<PlaybackQuery>,
    ) -> Result<Json<ApiResponse<Option<PlaybackSessionView>>>> {
        let session = PlaybackService::get_session(&state.db, &ctx.user_id, &query.track_id).await?;
        Ok(Json(ApiResponse::ok(session)))
    }
}
