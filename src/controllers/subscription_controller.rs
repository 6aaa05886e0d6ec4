use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::Error,
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        subscription::{
            CreateCheck, CreateSubscriptionRequest, PlanInfo, PlanLimits, SubscriptionPlan,
            SubscriptionStats, SubscriptionView, UploadCheck,
        },
    },
    services::subscription_service::SubscriptionService,
    AppState, Result,
};

pub struct SubscriptionController;

impl SubscriptionController {
    pub async fn current(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<SubscriptionView>>> {
        let sub = SubscriptionService::get_user_subscription(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(SubscriptionView::from(sub))))
    }

    pub async fn limits(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<PlanLimits>>> {
        let limits = SubscriptionService::get_user_limits(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(limits)))
    }

    pub async fn stats(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<SubscriptionStats>>> {
        let stats = SubscriptionService::get_subscription_stats(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(stats)))
    }

    pub async fn plans() -> Json<ApiResponse<Vec<PlanInfo>>> {
        Json(ApiResponse::ok(SubscriptionService::plans()))
    }

    /// Paid plans are granted here by admins only; users go through `/payments`.
    pub async fn create(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateSubscriptionRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<SubscriptionView>>)> {
        if payload.plan != SubscriptionPlan::Free && !ctx.is_admin() {
            return Err(Error::Forbidden {
                reason: "Paid plans must be purchased through a payment".to_string(),
            });
        }

        let payment_id = payload
            .payment_id
            .unwrap_or_else(|| format!("manual-{}", Utc::now().timestamp_millis()));
        let sub = SubscriptionService::create_subscription(
            &state.db,
            &ctx.user_id,
            payload.plan,
            &payment_id,
            payload.duration_months.unwrap_or(1).max(1),
        )
        .await?;

        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message(
                "Subscription created successfully",
                SubscriptionView::from(sub),
            )),
        ))
    }

    pub async fn cancel(State(state): State<AppState>, ctx: Ctx) -> Result<Json<ApiResponse<()>>> {
        SubscriptionService::cancel_subscription(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::with_message("Subscription cancelled successfully", ())))
    }

    pub async fn check_songs(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(count): Path<u64>,
    ) -> Result<Json<ApiResponse<UploadCheck>>> {
        let check = SubscriptionService::can_upload_song(&state.db, &ctx.user_id, count).await?;
        Ok(Json(ApiResponse::ok(check)))
    }

    pub async fn check_playlists(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(count): Path<u64>,
    ) -> Result<Json<ApiResponse<CreateCheck>>> {
        let check =
            SubscriptionService::can_create_playlist(&state.db, &ctx.user_id, count).await?;
        Ok(Json(ApiResponse::ok(check)))
    }

    pub async fn check_file_size(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(size): Path<u64>,
    ) -> Result<Json<ApiResponse<UploadCheck>>> {
        let check = SubscriptionService::can_upload_file_size(&state.db, &ctx.user_id, size).await?;
        Ok(Json(ApiResponse::ok(check)))
    }
}
