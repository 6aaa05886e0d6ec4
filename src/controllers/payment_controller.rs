use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    middlewares::mw_auth::Ctx,
    models::{
        database_helpers::ApiResponse,
        payment::{
            CreateSubscriptionPaymentRequest, PaymentOrderView, PaymentReturnQuery,
            PaymentReturnResult, PaymentWebhook, SubscriptionPaymentResponse, WebhookAck,
        },
        subscription::SubscriptionView,
    },
    services::payment_service::{PaymentService, PayosGateway},
    AppState, Result,
};

pub struct PaymentController;

impl PaymentController {
    pub async fn create_subscription(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateSubscriptionPaymentRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<SubscriptionPaymentResponse>>)> {
        let gateway = PayosGateway {
            http: &state.http,
            config: &state.config.payos,
            frontend_url: &state.config.frontend_url,
        };
        let res =
            PaymentService::create_subscription_payment(&state.db, &gateway, &ctx.user_id, payload)
                .await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(res))))
    }

    /// Called by the gateway; answered with its own small ack body.
    pub async fn webhook(
        State(state): State<AppState>,
        Json(payload): Json<PaymentWebhook>,
    ) -> Result<Json<WebhookAck>> {
        let ack =
            PaymentService::handle_webhook(&state.db, &state.config.payos.checksum_key, payload)
                .await?;
        Ok(Json(ack))
    }

    pub async fn payment_return(
        Query(query): Query<PaymentReturnQuery>,
    ) -> Json<ApiResponse<PaymentReturnResult>> {
        Json(ApiResponse::ok(PaymentService::handle_return(query)))
    }

    pub async fn current_subscription(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<SubscriptionView>>> {
        let sub = PaymentService::current_subscription(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(sub)))
    }

    pub async fn payment_history(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<Vec<PaymentOrderView>>>> {
        let orders = PaymentService::payment_history(&state.db, &ctx.user_id).await?;
        Ok(Json(ApiResponse::ok(orders)))
    }
}
