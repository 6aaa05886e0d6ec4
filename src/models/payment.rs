use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::sql::{Datetime, Thing};

use crate::models::subscription::SubscriptionPlan;

/// Pending checkout, keyed by the gateway order code until the webhook lands.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentOrderRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub order_code: i64,
    pub user: Thing,
    pub plan: SubscriptionPlan,
    pub duration_months: u32,
    pub amount: u64,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderView {
    pub order_code: i64,
    pub plan: SubscriptionPlan,
    pub duration_months: u32,
    pub amount: u64,
    pub created_at: Datetime,
}

impl From<PaymentOrderRecord> for PaymentOrderView {
    fn from(order: PaymentOrderRecord) -> Self {
        Self {
            order_code: order.order_code,
            plan: order.plan,
            duration_months: order.duration_months,
            amount: order.amount,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionPaymentRequest {
    pub plan: SubscriptionPlan,
    pub duration_months: Option<u32>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPaymentResponse {
    pub order_code: i64,
    pub amount: u64,
    pub plan: SubscriptionPlan,
    pub duration_months: u32,
    pub checkout_url: Option<String>,
    pub qr_code: Option<String>,
    pub payment_link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body posted by the payment gateway. `data` is kept as raw JSON since the
/// signature covers every field the gateway sends.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub code: Option<String>,
    pub desc: Option<String>,
    pub success: Option<bool>,
    pub data: Value,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnQuery {
    pub code: Option<String>,
    pub id: Option<String>,
    pub cancel: Option<String>,
    pub status: Option<String>,
    pub order_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnResult {
    pub success: bool,
    pub message: &'static str,
    pub order_code: Option<String>,
    pub status: String,
}

/// Payment link returned by the gateway (`data` of its response envelope).
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub checkout_url: Option<String>,
    pub qr_code: Option<String>,
    pub payment_link_id: Option<String>,
}
