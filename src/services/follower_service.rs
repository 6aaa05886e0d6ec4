use std::collections::HashSet;

use chrono::Utc;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::thing_helpers::{
    create_thing, create_user_thing, opt_thing_to_id, parse_id_part, thing_to_id,
};
use crate::helpers::user_helpers::{fetch_user_summaries, get_user};
use crate::middlewares::mw_auth::Ctx;
use crate::models::social::{FollowListEntry, FollowerRecord, FollowerView};

pub struct FollowerService;

impl FollowerService {
    pub async fn follow(
        db: &Surreal<Any>,
        follower_id: &str,
        following_id: &str,
    ) -> Result<FollowerView> {
        if parse_id_part(following_id) == follower_id {
            return Err(Error::InvalidInput {
                reason: "You cannot follow yourself".to_string(),
            });
        }
        get_user(db, following_id).await?;

        let follower = create_user_thing(follower_id);
        let following = create_user_thing(following_id);

        let mut res = db
            .query(
                "SELECT count() AS total FROM follower \
                 WHERE follower = $follower AND following = $following GROUP ALL",
            )
            .bind(("follower", follower.clone()))
            .bind(("following", following.clone()))
            .await?;
        if take_count(&mut res, 0)? > 0 {
            return Err(Error::Conflict {
                message: "You are already following this user".to_string(),
            });
        }

        let created: Option<FollowerRecord> = db
            .create("follower")
            .content(FollowerRecord {
                id: None,
                follower,
                following,
                created_at: Utc::now().into(),
            })
            .await?;
        created
            .map(FollowerView::from)
            .ok_or_else(|| Error::DbError("Could not create follow".into()))
    }

    /// Deletes a follow record; only its follower may.
    pub async fn unfollow(db: &Surreal<Any>, ctx: &Ctx, follow_id: &str) -> Result<()> {
        let follow: Option<FollowerRecord> = db
            .query("SELECT * FROM $follow")
            .bind(("follow", create_thing("follower", follow_id)))
            .await?
            .take(0)?;
        let follow = follow.ok_or_else(|| Error::ResourceNotFound {
            message: "Follow relationship not found".to_string(),
        })?;

        if thing_to_id(&follow.follower) != ctx.user_id {
            return Err(Error::Forbidden {
                reason: "You can only remove your own follows".to_string(),
            });
        }

        db.query("DELETE $follow")
            .bind(("follow", follow.id))
            .await?
            .check()?;
        Ok(())
    }

    /// Users following `user_id`.
    pub async fn followers_of(
        db: &Surreal<Any>,
        user_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<FollowListEntry>> {
        let rows: Vec<FollowerRecord> = db
            .query("SELECT * FROM follower WHERE following = $user ORDER BY created_at DESC")
            .bind(("user", create_user_thing(user_id)))
            .await?
            .take(0)?;
        Self::entries(db, rows, viewer_id, |r| r.follower.clone()).await
    }

    /// Users `user_id` follows.
    pub async fn following_of(
        db: &Surreal<Any>,
        user_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<FollowListEntry>> {
        let rows: Vec<FollowerRecord> = db
            .query("SELECT * FROM follower WHERE follower = $user ORDER BY created_at DESC")
            .bind(("user", create_user_thing(user_id)))
            .await?
            .take(0)?;
        Self::entries(db, rows, viewer_id, |r| r.following.clone()).await
    }

    async fn entries(
        db: &Surreal<Any>,
        rows: Vec<FollowerRecord>,
        viewer_id: Option<&str>,
        listed: impl Fn(&FollowerRecord) -> Thing,
    ) -> Result<Vec<FollowListEntry>> {
        let people: Vec<Thing> = rows.iter().map(&listed).collect();
        let users = fetch_user_summaries(db, people.clone()).await?;
        let followed = match viewer_id {
            Some(viewer) => Self::followed_among(db, viewer, people).await?,
            None => HashSet::new(),
        };

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let person = thing_to_id(&listed(&row));
                users.get(&person).cloned().map(|user| FollowListEntry {
                    follow_id: opt_thing_to_id(&row.id),
                    user,
                    is_following: followed.contains(&person),
                    followed_at: row.created_at,
                })
            })
            .collect())
    }

    /// Subset of `candidates` that `viewer_id` follows, as bare ids.
    pub async fn followed_among(
        db: &Surreal<Any>,
        viewer_id: &str,
        candidates: Vec<Thing>,
    ) -> Result<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let followed: Vec<Thing> = db
            .query("SELECT VALUE following FROM follower WHERE follower = $viewer AND following IN $candidates")
            .bind(("viewer", create_user_thing(viewer_id)))
            .bind(("candidates", candidates))
            .await?
            .take(0)?;
        Ok(followed.iter().map(thing_to_id).collect())
    }

    pub async fn is_following(db: &Surreal<Any>, viewer_id: &str, user_id: &str) -> Result<bool> {
        let set = Self::followed_among(db, viewer_id, vec![create_user_thing(user_id)]).await?;
        Ok(!set.is_empty())
    }

    pub async fn followers_count(db: &Surreal<Any>, user_id: &str) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM follower WHERE following = $user GROUP ALL")
            .bind(("user", create_user_thing(user_id)))
            .await?;
        take_count(&mut res, 0)
    }

    pub async fn following_count(db: &Surreal<Any>, user_id: &str) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM follower WHERE follower = $user GROUP ALL")
            .bind(("user", create_user_thing(user_id)))
            .await?;
        take_count(&mut res, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::user::Role;

    fn ctx(user_id: &str) -> Ctx {
        Ctx {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            role: Role::User,
            username: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let db = setup_test_db().await;
        let ana = insert_test_user(&db, "ana").await;
        let bo = insert_test_user(&db, "bo").await;

        assert!(matches!(
            FollowerService::follow(&db, &ana, &ana).await,
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            FollowerService::follow(&db, &ana, "nobody").await,
            Err(Error::UserNotFound { .. })
        ));

        let follow = FollowerService::follow(&db, &ana, &bo).await.unwrap();
        assert_eq!(follow.following_id, bo);
        assert!(matches!(
            FollowerService::follow(&db, &ana, &bo).await,
            Err(Error::Conflict { .. })
        ));

        assert_eq!(FollowerService::followers_count(&db, &bo).await.unwrap(), 1);
        assert_eq!(FollowerService::following_count(&db, &ana).await.unwrap(), 1);

        assert!(matches!(
            FollowerService::unfollow(&db, &ctx(&bo), &follow.id).await,
            Err(Error::Forbidden { .. })
        ));
        FollowerService::unfollow(&db, &ctx(&ana), &follow.id).await.unwrap();
        assert!(!FollowerService::is_following(&db, &ana, &bo).await.unwrap());
    }

    #[tokio::test]
    async fn test_lists_mark_viewer_follows() {
        let db = setup_test_db().await;
        let star = insert_test_user(&db, "star").await;
        let fan1 = insert_test_user(&db, "fan_one").await;
        let fan2 = insert_test_user(&db, "fan_two").await;
        let viewer = insert_test_user(&db, "viewer").await;

        FollowerService::follow(&db, &fan1, &star).await.unwrap();
        FollowerService::follow(&db, &fan2, &star).await.unwrap();
        FollowerService::follow(&db, &viewer, &fan1).await.unwrap();

        let followers = FollowerService::followers_of(&db, &star, Some(&viewer)).await.unwrap();
        assert_eq!(followers.len(), 2);
        let fan1_entry = followers.iter().find(|e| e.user.id == fan1).unwrap();
        let fan2_entry = followers.iter().find(|e| e.user.id == fan2).unwrap();
        assert!(fan1_entry.is_following);
        assert!(!fan2_entry.is_following);

        let following = FollowerService::following_of(&db, &fan1, None).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].user.username, "star");
        assert!(!following[0].is_following);
    }
}
