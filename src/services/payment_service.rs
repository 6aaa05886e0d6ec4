use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use surrealdb::{engine::any::Any, Surreal};

use crate::config::PayosConfig;
use crate::error::{Error, Result};
use crate::helpers::signature_helpers::{hmac_sha256_hex, verify_hmac_sha256_hex};
use crate::helpers::thing_helpers::{create_user_thing, thing_to_id};
use crate::models::payment::{
    CreateSubscriptionPaymentRequest, PaymentLink, PaymentOrderRecord, PaymentOrderView,
    PaymentReturnQuery, PaymentReturnResult, PaymentWebhook, SubscriptionPaymentResponse,
    WebhookAck,
};
use crate::models::subscription::{SubscriptionPlan, SubscriptionView};
use crate::services::subscription_service::SubscriptionService;

const PAYOS_PAYMENT_REQUESTS_URL: &str = "https://api-merchant.payos.vn/v2/payment-requests";
const PAYOS_SUCCESS_CODE: &str = "00";
const PAID_STATUS: &str = "PAID";

/// Gateway envelope: `{code, desc, data}`.
#[derive(Debug, Deserialize)]
struct PayosEnvelope {
    code: String,
    desc: Option<String>,
    data: Option<PaymentLink>,
}

/// Everything needed to reach the gateway.
pub struct PayosGateway<'a> {
    pub http: &'a reqwest::Client,
    pub config: &'a PayosConfig,
    pub frontend_url: &'a str,
}

pub struct PaymentService;

impl PaymentService {
    /// FREE activates on the spot; paid plans park an order and return a checkout link.
    pub async fn create_subscription_payment(
        db: &Surreal<Any>,
        gateway: &PayosGateway<'_>,
        user_id: &str,
        req: CreateSubscriptionPaymentRequest,
    ) -> Result<SubscriptionPaymentResponse> {
        let duration_months = req.duration_months.unwrap_or(1).max(1);
        let amount = req.plan.monthly_price() * u64::from(duration_months);
        let order_code = Utc::now().timestamp_millis();

        if amount == 0 {
            SubscriptionService::create_subscription(
                db,
                user_id,
                req.plan,
                &format!("free-{order_code}"),
                duration_months,
            )
            .await?;
            return Ok(SubscriptionPaymentResponse {
                order_code,
                amount: 0,
                plan: req.plan,
                duration_months,
                checkout_url: None,
                qr_code: None,
                payment_link_id: None,
                message: Some("Free plan activated successfully".to_string()),
            });
        }

        let order: Option<PaymentOrderRecord> = db
            .create("payment_order")
            .content(PaymentOrderRecord {
                id: None,
                order_code,
                user: create_user_thing(user_id),
                plan: req.plan,
                duration_months,
                amount,
                created_at: Utc::now().into(),
            })
            .await?;
        order.ok_or_else(|| Error::DbError("Could not store payment order".into()))?;

        tracing::info!(
            "Creating {} payment {} for user {}",
            req.plan.as_ref(),
            order_code,
            user_id
        );
        let body = payment_request_body(
            gateway.config,
            gateway.frontend_url,
            order_code,
            req.plan,
            duration_months,
            req.buyer_name.as_deref(),
            req.buyer_email.as_deref(),
        )?;
        let link = Self::request_payment_link(gateway, &body).await?;

        Ok(SubscriptionPaymentResponse {
            order_code,
            amount,
            plan: req.plan,
            duration_months,
            checkout_url: link.checkout_url,
            qr_code: link.qr_code,
            payment_link_id: link.payment_link_id,
            message: None,
        })
    }

    async fn request_payment_link(gateway: &PayosGateway<'_>, body: &Value) -> Result<PaymentLink> {
        let envelope: PayosEnvelope = gateway
            .http
            .post(PAYOS_PAYMENT_REQUESTS_URL)
            .header("x-client-id", &gateway.config.client_id)
            .header("x-api-key", &gateway.config.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if envelope.code != PAYOS_SUCCESS_CODE {
            tracing::error!("Payment gateway refused link: {:?}", envelope.desc);
            return Err(Error::ExternalService {
                service: "PayOS".to_string(),
                message: envelope.desc.unwrap_or(envelope.code),
            });
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Verifies the gateway signature, then activates the plan of a paid order.
    pub async fn handle_webhook(
        db: &Surreal<Any>,
        checksum_key: &str,
        webhook: PaymentWebhook,
    ) -> Result<WebhookAck> {
        let Some(payload) = signature_payload(&webhook.data) else {
            return Err(Error::InvalidSignature);
        };
        if !verify_hmac_sha256_hex(checksum_key, &payload, &webhook.signature) {
            tracing::warn!("Webhook rejected: invalid signature");
            return Err(Error::InvalidSignature);
        }

        let paid = webhook.success.unwrap_or(false)
            && webhook.code.as_deref().unwrap_or(PAYOS_SUCCESS_CODE) == PAYOS_SUCCESS_CODE
            && webhook.data.get("code").and_then(Value::as_str).unwrap_or(PAYOS_SUCCESS_CODE)
                == PAYOS_SUCCESS_CODE
            && webhook
                .data
                .get("status")
                .and_then(Value::as_str)
                .map_or(true, |status| status.eq_ignore_ascii_case(PAID_STATUS));
        let order_code = webhook.data.get("orderCode").and_then(order_code_of);

        match (paid, order_code) {
            (true, Some(order_code)) => {
                Self::activate_by_order_code(db, order_code).await?;
                Ok(WebhookAck {
                    success: true,
                    message: "Subscription activated",
                })
            }
            _ => {
                tracing::info!("Webhook ignored: payment not completed");
                Ok(WebhookAck {
                    success: false,
                    message: "Payment not completed",
                })
            }
        }
    }

    /// Activates the parked order and removes it. Unknown codes are only logged.
    pub async fn activate_by_order_code(db: &Surreal<Any>, order_code: i64) -> Result<()> {
        let mut orders: Vec<PaymentOrderRecord> = db
            .query("SELECT * FROM payment_order WHERE order_code = $code LIMIT 1")
            .bind(("code", order_code))
            .await?
            .take(0)?;
        let Some(order) = orders.pop() else {
            tracing::warn!("No payment order found for code {}", order_code);
            return Ok(());
        };

        let user_id = thing_to_id(&order.user);
        SubscriptionService::create_subscription(
            db,
            &user_id,
            order.plan,
            &order_code.to_string(),
            order.duration_months,
        )
        .await?;

        db.query("DELETE $order")
            .bind(("order", order.id))
            .await?
            .check()?;
        tracing::info!(
            "Activated {} for user {} (order {})",
            order.plan.as_ref(),
            user_id,
            order_code
        );
        Ok(())
    }

    /// Interprets the query string of the gateway redirect.
    pub fn handle_return(query: PaymentReturnQuery) -> PaymentReturnResult {
        tracing::info!(
            "Payment return: orderCode={:?}, status={:?}",
            query.order_code,
            query.status
        );
        let status = query.status.unwrap_or_default();
        if query.cancel.as_deref() == Some("true") || status == "CANCELLED" {
            return PaymentReturnResult {
                success: false,
                message: "Payment was cancelled",
                order_code: query.order_code,
                status: "CANCELLED".to_string(),
            };
        }
        if status == "PAID" {
            return PaymentReturnResult {
                success: true,
                message: "Payment completed successfully",
                order_code: query.order_code,
                status,
            };
        }
        PaymentReturnResult {
            success: false,
            message: "Payment status unknown",
            order_code: query.order_code,
            status,
        }
    }

    pub async fn current_subscription(
        db: &Surreal<Any>,
        user_id: &str,
    ) -> Result<SubscriptionView> {
        let sub = SubscriptionService::get_user_subscription(db, user_id).await?;
        Ok(SubscriptionView::from(sub))
    }

    /// Pending orders of the user, newest first.
    pub async fn payment_history(
        db: &Surreal<Any>,
        user_id: &str,
    ) -> Result<Vec<PaymentOrderView>> {
        let orders: Vec<PaymentOrderRecord> = db
            .query("SELECT * FROM payment_order WHERE user = $user ORDER BY order_code DESC")
            .bind(("user", create_user_thing(user_id)))
            .await?
            .take(0)?;
        Ok(orders.into_iter().map(PaymentOrderView::from).collect())
    }
}

/// Signed request body for a new payment link.
pub fn payment_request_body(
    config: &PayosConfig,
    frontend_url: &str,
    order_code: i64,
    plan: SubscriptionPlan,
    duration_months: u32,
    buyer_name: Option<&str>,
    buyer_email: Option<&str>,
) -> Result<Value> {
    let amount = plan.monthly_price() * u64::from(duration_months);
    let plan_name = format!("{} Plan", plan.display_name());
    let description = format!("{plan_name} - {duration_months} month(s)");
    let frontend_url = frontend_url.trim_end_matches('/');
    let return_url = format!("{frontend_url}/payment/success");
    let cancel_url = format!("{frontend_url}/payment/cancel");

    let signature = hmac_sha256_hex(
        &config.checksum_key,
        &format!(
            "amount={amount}&cancelUrl={cancel_url}&description={description}&orderCode={order_code}&returnUrl={return_url}"
        ),
    )?;

    let mut body = json!({
        "orderCode": order_code,
        "amount": amount,
        "description": description,
        "returnUrl": return_url,
        "cancelUrl": cancel_url,
        "items": [{
            "name": plan_name,
            "quantity": duration_months,
            "price": plan.monthly_price(),
        }],
        "signature": signature,
    });
    if let Value::Object(map) = &mut body {
        if let Some(name) = buyer_name {
            map.insert("buyerName".to_string(), Value::from(name));
        }
        if let Some(email) = buyer_email {
            map.insert("buyerEmail".to_string(), Value::from(email));
        }
    }
    Ok(body)
}

/// `key=value&...` over the webhook data, keys sorted, as the gateway signs it.
pub fn signature_payload(data: &Value) -> Option<String> {
    let Value::Object(map) = data else {
        return None;
    };
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    Some(
        keys.into_iter()
            .map(|k| format!("{k}={}", signature_value(&map[k])))
            .collect::<Vec<_>>()
            .join("&"),
    )
}

fn signature_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s == "null" || s == "undefined" => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let sorted: Vec<Value> = items.iter().map(sort_object_keys).collect();
            Value::Array(sorted).to_string()
        }
        other => other.to_string(),
    }
}

fn sort_object_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), sort_object_keys(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

fn order_code_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
