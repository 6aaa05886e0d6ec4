use chrono::{Months, Utc};
use surrealdb::sql::Datetime;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::thing_helpers::create_user_thing;
use crate::models::subscription::{
    CreateCheck, PlanInfo, PlanLimits, SubscriptionPlan, SubscriptionRecord, SubscriptionStats,
    SubscriptionStatus, UploadCheck, UsageEntry, UNLIMITED,
};

const MB: u64 = 1024 * 1024;

pub struct SubscriptionService;

impl SubscriptionService {
    /// Active subscription of the user. An expired one is closed and a FREE
    /// plan takes over; users without any subscription get FREE lazily.
    pub async fn get_user_subscription(
        db: &Surreal<Any>,
        user_id: &str,
    ) -> Result<SubscriptionRecord> {
        let mut current: Vec<SubscriptionRecord> = db
            .query(
                "SELECT * FROM subscription WHERE user = $user AND status = 'ACTIVE' \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("user", create_user_thing(user_id)))
            .await?
            .take(0)?;

        match current.pop() {
            Some(sub) if Self::is_expired(&sub) => {
                if let Some(id) = sub.id.clone() {
                    db.query("UPDATE $id SET status = 'EXPIRED', updated_at = time::now()")
                        .bind(("id", id))
                        .await?
                        .check()?;
                }
                tracing::info!("Subscription of user {} expired, falling back to FREE", user_id);
                Self::create_free_subscription(db, user_id).await
            }
            Some(sub) => Ok(sub),
            None => Self::create_free_subscription(db, user_id).await,
        }
    }

    fn is_expired(sub: &SubscriptionRecord) -> bool {
        sub.end_date
            .as_ref()
            .is_some_and(|end| end.0 < Utc::now())
    }

    async fn create_free_subscription(
        db: &Surreal<Any>,
        user_id: &str,
    ) -> Result<SubscriptionRecord> {
        Self::create_subscription(db, user_id, SubscriptionPlan::Free, "free", 0).await
    }

    /// Starts a new subscription, expiring whatever was active before.
    /// Paid plans run for `duration_months`; FREE has no end date.
    pub async fn create_subscription(
        db: &Surreal<Any>,
        user_id: &str,
        plan: SubscriptionPlan,
        payment_id: &str,
        duration_months: u32,
    ) -> Result<SubscriptionRecord> {
        let user_thing = create_user_thing(user_id);

        db.query(
            "UPDATE subscription SET status = 'EXPIRED', updated_at = time::now() \
             WHERE user = $user AND status = 'ACTIVE'",
        )
        .bind(("user", user_thing.clone()))
        .await?
        .check()?;

        let now = Utc::now();
        let end_date = match plan {
            SubscriptionPlan::Free => None,
            _ => now
                .checked_add_months(Months::new(duration_months.max(1)))
                .map(Datetime::from),
        };

        let record = SubscriptionRecord {
            id: None,
            user: user_thing,
            plan,
            status: SubscriptionStatus::Active,
            start_date: now.into(),
            end_date: end_date.clone(),
            price: plan.monthly_price() * u64::from(duration_months),
            payment_id: payment_id.to_string(),
            payment_method: "PayOS".to_string(),
            auto_renew: plan != SubscriptionPlan::Free,
            next_billing_date: end_date,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let created: Option<SubscriptionRecord> =
            db.create("subscription").content(record).await?;
        tracing::info!("Created {} subscription for user {}", plan.as_ref(), user_id);

        created.ok_or_else(|| Error::DbError("Could not create subscription".into()))
    }

    pub async fn get_user_limits(db: &Surreal<Any>, user_id: &str) -> Result<PlanLimits> {
        let sub = Self::get_user_subscription(db, user_id).await?;
        Ok(sub.plan.limits())
    }

    pub async fn can_upload_song(
        db: &Surreal<Any>,
        user_id: &str,
        current_song_count: u64,
    ) -> Result<UploadCheck> {
        let limits = Self::get_user_limits(db, user_id).await?;
        Ok(song_check(&limits, current_song_count))
    }

    pub async fn can_create_playlist(
        db: &Surreal<Any>,
        user_id: &str,
        current_playlist_count: u64,
    ) -> Result<CreateCheck> {
        let limits = Self::get_user_limits(db, user_id).await?;
        Ok(playlist_check(&limits, current_playlist_count))
    }

    pub async fn can_upload_file_size(
        db: &Surreal<Any>,
        user_id: &str,
        file_size: u64,
    ) -> Result<UploadCheck> {
        let limits = Self::get_user_limits(db, user_id).await?;
        Ok(file_size_check(&limits, file_size))
    }

    /// Fails with `LimitExceeded` when the user is at the song cap.
    pub async fn ensure_can_upload_song(db: &Surreal<Any>, user_id: &str) -> Result<()> {
        let count = Self::count_user_songs(db, user_id).await?;
        let check = Self::can_upload_song(db, user_id, count).await?;
        into_limit_result(check.can_upload, check.reason)
    }

    pub async fn ensure_can_create_playlist(db: &Surreal<Any>, user_id: &str) -> Result<()> {
        let count = Self::count_user_playlists(db, user_id).await?;
        let check = Self::can_create_playlist(db, user_id, count).await?;
        into_limit_result(check.can_create, check.reason)
    }

    pub async fn ensure_file_size_allowed(
        db: &Surreal<Any>,
        user_id: &str,
        file_size: u64,
    ) -> Result<()> {
        let check = Self::can_upload_file_size(db, user_id, file_size).await?;
        into_limit_result(check.can_upload, check.reason)
    }

    pub async fn cancel_subscription(db: &Surreal<Any>, user_id: &str) -> Result<()> {
        db.query(
            "UPDATE subscription SET status = 'CANCELLED', auto_renew = false, updated_at = time::now() \
             WHERE user = $user AND status = 'ACTIVE'",
        )
        .bind(("user", create_user_thing(user_id)))
        .await?
        .check()?;
        Ok(())
    }

    pub async fn get_subscription_stats(
        db: &Surreal<Any>,
        user_id: &str,
    ) -> Result<SubscriptionStats> {
        let sub = Self::get_user_subscription(db, user_id).await?;
        let limits = sub.plan.limits();
        let songs = Self::count_user_songs(db, user_id).await?;
        let playlists = Self::count_user_playlists(db, user_id).await?;

        Ok(SubscriptionStats {
            plan: sub.plan,
            songs: usage(songs, limits.max_songs),
            playlists: usage(playlists, limits.max_playlists),
            limits,
        })
    }

    pub fn plans() -> Vec<PlanInfo> {
        SubscriptionPlan::ALL
            .into_iter()
            .map(|plan| PlanInfo {
                id: plan,
                name: plan.display_name(),
                price: plan.monthly_price(),
                duration: match plan {
                    SubscriptionPlan::Free => "Forever",
                    _ => "Per month",
                },
                features: plan.marketing_features(),
                limits: plan.limits(),
            })
            .collect()
    }

    pub async fn count_user_songs(db: &Surreal<Any>, user_id: &str) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM song WHERE user = $user GROUP ALL")
            .bind(("user", create_user_thing(user_id)))
            .await?;
        take_count(&mut res, 0)
    }

    pub async fn count_user_playlists(db: &Surreal<Any>, user_id: &str) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM playlist WHERE user = $user GROUP ALL")
            .bind(("user", create_user_thing(user_id)))
            .await?;
        take_count(&mut res, 0)
    }
}

fn into_limit_result(allowed: bool, reason: Option<String>) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::LimitExceeded {
            reason: reason.unwrap_or_else(|| "Subscription limit exceeded".to_string()),
        })
    }
}

pub fn song_check(limits: &PlanLimits, current: u64) -> UploadCheck {
    if limits.max_songs != UNLIMITED && current as i64 >= limits.max_songs {
        return UploadCheck {
            can_upload: false,
            reason: Some(format!(
                "You've reached your song limit of {}. Upgrade to Premium for more uploads.",
                limits.max_songs
            )),
        };
    }
    UploadCheck {
        can_upload: true,
        reason: None,
    }
}

pub fn playlist_check(limits: &PlanLimits, current: u64) -> CreateCheck {
    if limits.max_playlists != UNLIMITED && current as i64 >= limits.max_playlists {
        return CreateCheck {
            can_create: false,
            reason: Some(format!(
                "You've reached your playlist limit of {}. Upgrade to Premium for more playlists.",
                limits.max_playlists
            )),
        };
    }
    CreateCheck {
        can_create: true,
        reason: None,
    }
}

pub fn file_size_check(limits: &PlanLimits, file_size: u64) -> UploadCheck {
    if file_size > limits.max_file_size {
        return UploadCheck {
            can_upload: false,
            reason: Some(format!(
                "File size {}MB exceeds your limit of {}MB. Upgrade to Premium for larger uploads.",
                round_mb(file_size),
                round_mb(limits.max_file_size)
            )),
        };
    }
    UploadCheck {
        can_upload: true,
        reason: None,
    }
}

fn round_mb(bytes: u64) -> u64 {
    (bytes as f64 / MB as f64).round() as u64
}

fn usage(current: u64, max: i64) -> UsageEntry {
    let percentage = if max <= 0 {
        0
    } else {
        ((current as f64 / max as f64) * 100.0).round() as u64
    };
    UsageEntry {
        current,
        max,
        percentage,
    }
}
