use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};

const MB: u64 = 1024 * 1024;

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
    PremiumPlus,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [Self::Free, Self::Premium, Self::PremiumPlus];

    /// Monthly price in VND.
    pub fn monthly_price(self) -> u64 {
        match self {
            Self::Free => 0,
            Self::Premium => 10_000,
            Self::PremiumPlus => 25_000,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Premium => "Premium",
            Self::PremiumPlus => "Premium Plus",
        }
    }

    pub fn limits(self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                max_songs: 10,
                max_playlists: 5,
                max_file_size: 10 * MB,
                features: vec!["10 songs", "5 playlists", "10MB file size"],
            },
            Self::Premium => PlanLimits {
                max_songs: 100,
                max_playlists: 50,
                max_file_size: 50 * MB,
                features: vec!["100 songs", "50 playlists", "50MB file size"],
            },
            Self::PremiumPlus => PlanLimits {
                max_songs: UNLIMITED,
                max_playlists: UNLIMITED,
                max_file_size: 100 * MB,
                features: vec!["Unlimited songs", "Unlimited playlists", "100MB file size"],
            },
        }
    }

    pub fn marketing_features(self) -> Vec<&'static str> {
        match self {
            Self::Free => vec![
                "Upload up to 10 songs",
                "Create up to 5 playlists",
                "Max file size: 10MB",
                "Standard quality streaming",
            ],
            Self::Premium => vec![
                "Upload up to 100 songs",
                "Create up to 50 playlists",
                "Max file size: 50MB",
                "High-quality streaming",
                "Priority support",
            ],
            Self::PremiumPlus => vec![
                "Unlimited song uploads",
                "Unlimited playlists",
                "Max file size: 100MB",
                "Lossless quality streaming",
                "Priority support",
                "Early access to new features",
            ],
        }
    }
}

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    Pending,
}

/// Sentinel for "no limit" in `max_songs` / `max_playlists`.
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_songs: i64,
    pub max_playlists: i64,
    /// Bytes.
    pub max_file_size: u64,
    pub features: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubscriptionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: Datetime,
    pub end_date: Option<Datetime>,
    pub price: u64,
    pub payment_id: String,
    pub payment_method: String,
    pub auto_renew: bool,
    pub next_billing_date: Option<Datetime>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: String,
    pub user_id: String,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: Datetime,
    pub end_date: Option<Datetime>,
    pub price: u64,
    pub payment_id: String,
    pub payment_method: String,
    pub auto_renew: bool,
    pub next_billing_date: Option<Datetime>,
    pub created_at: Datetime,
}

impl From<SubscriptionRecord> for SubscriptionView {
    fn from(sub: SubscriptionRecord) -> Self {
        Self {
            id: opt_thing_to_id(&sub.id),
            user_id: thing_to_id(&sub.user),
            plan: sub.plan,
            status: sub.status,
            start_date: sub.start_date,
            end_date: sub.end_date,
            price: sub.price,
            payment_id: sub.payment_id,
            payment_method: sub.payment_method,
            auto_renew: sub.auto_renew,
            next_billing_date: sub.next_billing_date,
            created_at: sub.created_at,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadCheck {
    pub can_upload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheck {
    pub can_create: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub current: u64,
    pub max: i64,
    pub percentage: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    pub plan: SubscriptionPlan,
    pub limits: PlanLimits,
    pub songs: UsageEntry,
    pub playlists: UsageEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
    pub id: SubscriptionPlan,
    pub name: &'static str,
    pub price: u64,
    pub duration: &'static str,
    pub features: Vec<&'static str>,
    pub limits: PlanLimits,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub plan: SubscriptionPlan,
    pub payment_id: Option<String>,
    pub duration_months: Option<u32>,
}
