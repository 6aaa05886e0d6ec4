use serde::Deserialize;
use surrealdb::sql::{Datetime, Thing};
use surrealdb::{engine::any::Any, Surreal};

use crate::error::Result;
use crate::helpers::db_helpers::take_count;
use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::models::admin::{
    ActiveUser, Activity, ActivityPage, ActivityQuery, ActivityType, DashboardCounts,
    DashboardStats, GrowthPoint,
};
use crate::models::pagination::{offset, PageQuery};
use crate::models::user::{UserRecord, UserSummary};

/// Size of the default activity feed.
pub const RECENT_ACTIVITY_LIMIT: u32 = 15;
const TOP_UPLOADERS: u32 = 5;

#[derive(Debug, Deserialize)]
struct ActiveUserRow {
    id: Thing,
    username: String,
    email: String,
    name: Option<String>,
    song_count: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: Thing,
    label: String,
    user: Thing,
    created_at: Datetime,
}

pub struct AdminService;

impl AdminService {
    pub async fn get_stats(db: &Surreal<Any>) -> Result<DashboardStats> {
        let mut res = db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .query("SELECT count() AS total FROM user WHERE status = 'ACTIVE' GROUP ALL")
            .query("SELECT count() AS total FROM song GROUP ALL")
            .query("SELECT count() AS total FROM song WHERE visibility = 'PUBLIC' GROUP ALL")
            .query("SELECT count() AS total FROM song WHERE visibility = 'PRIVATE' GROUP ALL")
            .query("SELECT count() AS total FROM playlist GROUP ALL")
            .query("SELECT count() AS total FROM user WHERE created_at >= time::now() - 7d GROUP ALL")
            .query("SELECT count() AS total FROM song WHERE created_at >= time::now() - 7d GROUP ALL")
            .query(
                "SELECT time::format(created_at, '%Y-%m-%d') AS date, count() AS count FROM user \
                 WHERE created_at >= time::now() - 30d GROUP BY date ORDER BY date ASC",
            )
            .query(
                "SELECT id, username, email, name, \
                 count((SELECT id FROM song WHERE user = $parent.id)) AS song_count \
                 FROM user ORDER BY song_count DESC LIMIT $top",
            )
            .bind(("top", TOP_UPLOADERS))
            .await?;

        let counts = DashboardCounts {
            total_users: take_count(&mut res, 0)?,
            active_users: take_count(&mut res, 1)?,
            total_songs: take_count(&mut res, 2)?,
            public_songs: take_count(&mut res, 3)?,
            private_songs: take_count(&mut res, 4)?,
            total_playlists: take_count(&mut res, 5)?,
            new_users: take_count(&mut res, 6)?,
            new_songs: take_count(&mut res, 7)?,
        };
        let user_growth: Vec<GrowthPoint> = res.take(8)?;
        let rows: Vec<ActiveUserRow> = res.take(9)?;

        Ok(DashboardStats {
            counts,
            user_growth,
            most_active_users: rows
                .into_iter()
                .map(|r| ActiveUser {
                    id: thing_to_id(&r.id),
                    username: r.username,
                    email: r.email,
                    name: r.name,
                    song_count: r.song_count,
                })
                .collect(),
        })
    }

    /// Latest registrations, uploads and playlists merged into one feed.
    pub async fn recent_activity(db: &Surreal<Any>) -> Result<ActivityPage> {
        let mut activities = Self::collect(db, RECENT_ACTIVITY_LIMIT, None).await?;
        activities.truncate(RECENT_ACTIVITY_LIMIT as usize);
        Ok(ActivityPage {
            total: activities.len(),
            activities,
            page: None,
            limit: None,
            pages: None,
        })
    }

    pub async fn paged_activity(db: &Surreal<Any>, query: ActivityQuery) -> Result<ActivityPage> {
        let (page, limit) = PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .resolve(10, 100);
        let start = offset(page, limit) as usize;

        let total = Self::count(db, query.kind).await? as usize;
        let activities: Vec<Activity> = Self::collect(db, page * limit, query.kind)
            .await?
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok(ActivityPage {
            activities,
            page: Some(page),
            limit: Some(limit),
            total,
            pages: Some(total.div_ceil(limit as usize) as u32),
        })
    }

    /// Up to `per_kind` newest events of each kind, merged newest first.
    async fn collect(
        db: &Surreal<Any>,
        per_kind: u32,
        kind: Option<ActivityType>,
    ) -> Result<Vec<Activity>> {
        let wants = |k: ActivityType| kind.map_or(true, |wanted| wanted == k);
        let mut activities = Vec::new();

        if wants(ActivityType::UserRegistered) {
            let users: Vec<UserRecord> = db
                .query("SELECT * FROM user ORDER BY created_at DESC LIMIT $n")
                .bind(("n", per_kind))
                .await?
                .take(0)?;
            activities.extend(users.iter().map(|u| Activity {
                id: format!("user_{}", opt_thing_to_id(&u.id)),
                kind: ActivityType::UserRegistered,
                message: "registered a new account".to_string(),
                timestamp: u.created_at.clone(),
                user: Some(UserSummary::from(u)),
                target_id: None,
                target_type: None,
                target_name: None,
            }));
        }

        if wants(ActivityType::TrackUploaded) {
            let songs: Vec<CreatedItem> = db
                .query("SELECT id, title AS label, user, created_at FROM song ORDER BY created_at DESC LIMIT $n")
                .bind(("n", per_kind))
                .await?
                .take(0)?;
            activities.extend(Self::item_activities(db, songs, ActivityType::TrackUploaded).await?);
        }

        if wants(ActivityType::PlaylistCreated) {
            let playlists: Vec<CreatedItem> = db
                .query("SELECT id, name AS label, user, created_at FROM playlist ORDER BY created_at DESC LIMIT $n")
                .bind(("n", per_kind))
                .await?
                .take(0)?;
            activities
                .extend(Self::item_activities(db, playlists, ActivityType::PlaylistCreated).await?);
        }

        activities.sort_by(|a, b| b.timestamp.0.cmp(&a.timestamp.0));
        Ok(activities)
    }

    async fn item_activities(
        db: &Surreal<Any>,
        items: Vec<CreatedItem>,
        kind: ActivityType,
    ) -> Result<Vec<Activity>> {
        let users = fetch_user_summaries(db, items.iter().map(|i| i.user.clone()).collect()).await?;
        let (prefix, target_type, verb) = match kind {
            ActivityType::PlaylistCreated => ("playlist", "PLAYLIST", "created a new playlist"),
            _ => ("song", "TRACK", "uploaded a new track"),
        };

        Ok(items
            .into_iter()
            .map(|item| {
                let id = thing_to_id(&item.id);
                Activity {
                    id: format!("{prefix}_{id}"),
                    kind,
                    message: format!("{verb} \"{}\"", item.label),
                    timestamp: item.created_at,
                    user: users.get(&thing_to_id(&item.user)).cloned(),
                    target_id: Some(id),
                    target_type: Some(target_type),
                    target_name: Some(item.label),
                }
            })
            .collect())
    }

    async fn count(db: &Surreal<Any>, kind: Option<ActivityType>) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .query("SELECT count() AS total FROM song GROUP ALL")
            .query("SELECT count() AS total FROM playlist GROUP ALL")
            .await?;
        let users = take_count(&mut res, 0)?;
        let songs = take_count(&mut res, 1)?;
        let playlists = take_count(&mut res, 2)?;
        Ok(match kind {
            None => users + songs + playlists,
            Some(ActivityType::UserRegistered) => users,
            Some(ActivityType::TrackUploaded) => songs,
            Some(ActivityType::PlaylistCreated) => playlists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::song::Visibility;

    #[tokio::test]
    async fn test_stats_counts() {
        let db = setup_test_db().await;
        let ana = insert_test_user(&db, "ana").await;
        let bo = insert_test_user(&db, "bo").await;
        insert_test_song(&db, &ana, "One", Visibility::Public).await;
        insert_test_song(&db, &ana, "Two", Visibility::Private).await;
        insert_test_song(&db, &bo, "Three", Visibility::Public).await;

        let stats = AdminService::get_stats(&db).await.unwrap();
        assert_eq!(stats.counts.total_users, 2);
        assert_eq!(stats.counts.active_users, 2);
        assert_eq!(stats.counts.total_songs, 3);
        assert_eq!(stats.counts.public_songs, 2);
        assert_eq!(stats.counts.private_songs, 1);
        assert_eq!(stats.counts.new_users, 2);
        assert_eq!(stats.user_growth.iter().map(|p| p.count).sum::<u64>(), 2);
        assert_eq!(stats.most_active_users[0].username, "ana");
        assert_eq!(stats.most_active_users[0].song_count, 2);
    }

    #[tokio::test]
    async fn test_activity_feed() {
        let db = setup_test_db().await;
        let ana = insert_test_user(&db, "ana").await;
        insert_test_song(&db, &ana, "Sunrise", Visibility::Public).await;

        let feed = AdminService::recent_activity(&db).await.unwrap();
        assert_eq!(feed.total, 2);
        let upload = feed
            .activities
            .iter()
            .find(|a| a.kind == ActivityType::TrackUploaded)
            .unwrap();
        assert_eq!(upload.message, "uploaded a new track \"Sunrise\"");
        assert_eq!(upload.target_type, Some("TRACK"));
        assert_eq!(upload.user.as_ref().unwrap().username, "ana");

        let only_users = AdminService::paged_activity(
            &db,
            ActivityQuery {
                page: Some(1),
                limit: Some(5),
                kind: Some(ActivityType::UserRegistered),
            },
        )
        .await
        .unwrap();
        assert_eq!(only_users.total, 1);
        assert_eq!(only_users.pages, Some(1));
        assert_eq!(only_users.activities[0].message, "registered a new account");
    }
}
