use chrono::Utc;
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};
use surrealdb::{engine::any::Any, Surreal};

use crate::auth::password_service::{ensure_password_policy, hash_password};
use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::thing_helpers::{create_user_thing, thing_to_id};
use crate::helpers::user_helpers::get_user;
use crate::middlewares::mw_auth::Ctx;
use crate::models::pagination::offset;
use crate::models::playlist::UserSongsAndPlaylists;
use crate::models::user::{
    CreateUserRequest, Role, UpdateUserRequest, UserListPage, UserListQuery, UserProfileView,
    UserRecord, UserStatus, UserSummary, UserView, UserWithFollowStats,
};
use crate::services::follower_service::FollowerService;
use crate::services::playlist_service::PlaylistService;
use crate::services::song_service::SongService;
use crate::services::storage_service::StorageService;
use crate::services::subscription_service::SubscriptionService;
use crate::validators::text_validator::{ensure_optional_max_len, ensure_text};
use crate::validators::user_validator::{ensure_email, ensure_username};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_DISCOVER_LIMIT: u32 = 20;
const MAX_DISCOVER_LIMIT: u32 = 50;

#[derive(Debug, Serialize, Default)]
struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_picture: Option<String>,
    updated_at: Datetime,
}

#[derive(Debug, Deserialize)]
struct RankedUserRow {
    id: Thing,
    username: String,
    name: Option<String>,
    profile_picture: Option<String>,
    bio: Option<String>,
    followers_count: u64,
    songs_count: u64,
}

/// Fields of a new account, validated by the caller.
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub code_id: Option<String>,
    pub code_expired: Option<Datetime>,
}

pub struct UserService;

impl UserService {
    /// Fails with `UserAlreadyExists` when the email or username is taken.
    pub async fn ensure_available(
        db: &Surreal<Any>,
        email: &str,
        username: &str,
    ) -> Result<()> {
        let mut res = db
            .query("SELECT count() AS total FROM user WHERE email = $email GROUP ALL")
            .query("SELECT count() AS total FROM user WHERE username = $username GROUP ALL")
            .bind(("email", email.to_string()))
            .bind(("username", username.to_string()))
            .await?;
        if take_count(&mut res, 0)? > 0 {
            return Err(Error::UserAlreadyExists {
                field: "Email".to_string(),
            });
        }
        if take_count(&mut res, 1)? > 0 {
            return Err(Error::UserAlreadyExists {
                field: "Username".to_string(),
            });
        }
        Ok(())
    }

    /// Hashes the password and stores the account.
    pub async fn insert_user(db: &Surreal<Any>, new_user: NewUser) -> Result<UserRecord> {
        let now: Datetime = Utc::now().into();
        let record = UserRecord {
            id: None,
            email: new_user.email,
            username: new_user.username,
            password: hash_password(&new_user.password)?,
            name: new_user.name,
            phone: new_user.phone,
            address: new_user.address,
            bio: None,
            profile_picture: None,
            account_type: "LOCAL".to_string(),
            role: new_user.role,
            status: UserStatus::Active,
            is_active: new_user.is_active,
            code_id: new_user.code_id,
            code_expired: new_user.code_expired,
            created_at: now.clone(),
            updated_at: now,
        };
        let created: Option<UserRecord> = db.create("user").content(record).await?;
        created.ok_or_else(|| Error::DbError("Could not create user".into()))
    }

    /// Admin creation: the account is active right away.
    pub async fn create_user(db: &Surreal<Any>, req: CreateUserRequest) -> Result<UserView> {
        let email = ensure_email(&req.email)?;
        let username = ensure_username(&req.username)?;
        ensure_password_policy(&req.password)?;
        Self::ensure_available(db, &email, &username).await?;

        let user = Self::insert_user(
            db,
            NewUser {
                email,
                username,
                password: req.password,
                name: req.name,
                phone: req.phone,
                address: req.address,
                role: req.role.unwrap_or_default(),
                is_active: true,
                code_id: None,
                code_expired: None,
            },
        )
        .await?;
        tracing::info!("User {} created", user.username);
        Ok(UserView::from(user))
    }

    pub async fn find_paged(db: &Surreal<Any>, query: UserListQuery) -> Result<UserListPage> {
        let current_page = query.current_page.unwrap_or(1).max(1);
        let page_size = query
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let search = query
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let filter = if search.is_some() {
            "WHERE string::lowercase(username) CONTAINS $search \
             OR string::lowercase(email) CONTAINS $search \
             OR string::lowercase(name ?? '') CONTAINS $search"
        } else {
            ""
        };

        let mut res = db
            .query(format!("SELECT count() AS total FROM user {filter} GROUP ALL"))
            .query(format!(
                "SELECT * FROM user {filter} ORDER BY created_at DESC LIMIT $limit START $start"
            ))
            .bind(("search", search.unwrap_or_default()))
            .bind(("limit", page_size))
            .bind(("start", offset(current_page, page_size)))
            .await?;
        let total_items = take_count(&mut res, 0)?;
        let users: Vec<UserRecord> = res.take(1)?;

        Ok(UserListPage {
            results: users.into_iter().map(UserView::from).collect(),
            current_page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size as u64) as u32,
        })
    }

    pub async fn find_all_for_admin(db: &Surreal<Any>) -> Result<Vec<UserView>> {
        let users: Vec<UserRecord> = db
            .query("SELECT * FROM user ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    /// Active users ranked by follower count, without the caller.
    pub async fn discover(
        db: &Surreal<Any>,
        viewer_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<UserWithFollowStats>> {
        let limit = limit
            .unwrap_or(DEFAULT_DISCOVER_LIMIT)
            .clamp(1, MAX_DISCOVER_LIMIT);
        let rows: Vec<RankedUserRow> = db
            .query(
                "SELECT id, username, name, profile_picture, bio, \
                 count((SELECT id FROM follower WHERE following = $parent.id)) AS followers_count, \
                 count((SELECT id FROM song WHERE user = $parent.id AND visibility = 'PUBLIC')) AS songs_count \
                 FROM user WHERE status = 'ACTIVE' AND id != $viewer \
                 ORDER BY followers_count DESC LIMIT $limit",
            )
            .bind(("viewer", viewer_id.map(create_user_thing)))
            .bind(("limit", limit))
            .await?
            .take(0)?;

        let followed = match viewer_id {
            Some(viewer) => {
                FollowerService::followed_among(db, viewer, rows.iter().map(|r| r.id.clone()).collect())
                    .await?
            }
            None => Default::default(),
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = thing_to_id(&row.id);
                UserWithFollowStats {
                    is_following: followed.contains(&id),
                    user: UserSummary {
                        id,
                        username: row.username,
                        name: row.name,
                        profile_picture: row.profile_picture,
                    },
                    bio: row.bio,
                    followers_count: row.followers_count,
                    songs_count: row.songs_count,
                }
            })
            .collect())
    }

    pub async fn get_profile(
        db: &Surreal<Any>,
        viewer_id: Option<&str>,
        user_id: &str,
    ) -> Result<UserProfileView> {
        let user = get_user(db, user_id).await?;
        let is_following = match viewer_id {
            Some(viewer) if viewer != user_id => {
                FollowerService::is_following(db, viewer, user_id).await?
            }
            _ => false,
        };

        Ok(UserProfileView {
            user: UserView::from(user),
            followers_count: FollowerService::followers_count(db, user_id).await?,
            following_count: FollowerService::following_count(db, user_id).await?,
            songs_count: SubscriptionService::count_user_songs(db, user_id).await?,
            playlists_count: SubscriptionService::count_user_playlists(db, user_id).await?,
            is_following,
        })
    }

    pub async fn songs_and_playlists(
        db: &Surreal<Any>,
        viewer_id: Option<&str>,
        user_id: &str,
    ) -> Result<UserSongsAndPlaylists> {
        get_user(db, user_id).await?;
        Ok(UserSongsAndPlaylists {
            songs: SongService::find_user_songs(db, user_id, viewer_id).await?,
            playlists: PlaylistService::find_user_playlists(db, user_id, viewer_id).await?,
        })
    }

    /// Self or admin.
    pub async fn update_user(
        db: &Surreal<Any>,
        ctx: &Ctx,
        user_id: &str,
        req: UpdateUserRequest,
    ) -> Result<UserView> {
        ensure_can_manage(ctx, user_id)?;
        let current = get_user(db, user_id).await?;

        let username = match req.username {
            Some(username) => {
                let username = ensure_username(&username)?;
                if username != current.username {
                    Self::ensure_username_free(db, &username).await?;
                }
                Some(username)
            }
            None => None,
        };
        let name = match req.name {
            Some(name) => Some(ensure_text("name", &name, 100)?),
            None => None,
        };
        ensure_optional_max_len("bio", req.bio.as_deref(), 500)?;
        ensure_optional_max_len("phone", req.phone.as_deref(), 20)?;
        ensure_optional_max_len("address", req.address.as_deref(), 200)?;

        let patch = UserPatch {
            name,
            username,
            phone: req.phone,
            address: req.address,
            bio: req.bio,
            profile_picture: req.profile_picture,
            updated_at: Utc::now().into(),
        };
        Self::merge(db, user_id, patch).await
    }

    pub async fn update_status(
        db: &Surreal<Any>,
        user_id: &str,
        status: UserStatus,
    ) -> Result<UserView> {
        let updated: Option<UserRecord> = db
            .query("UPDATE $user SET status = $status, updated_at = time::now() RETURN AFTER")
            .bind(("user", create_user_thing(user_id)))
            .bind(("status", status))
            .await?
            .take(0)?;
        tracing::info!("User {} status set to {}", user_id, status.as_ref());
        updated.map(UserView::from).ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
    }

    pub async fn update_role(db: &Surreal<Any>, user_id: &str, role: Role) -> Result<UserView> {
        let updated: Option<UserRecord> = db
            .query("UPDATE $user SET role = $role, updated_at = time::now() RETURN AFTER")
            .bind(("user", create_user_thing(user_id)))
            .bind(("role", role))
            .await?
            .take(0)?;
        tracing::info!("User {} role set to {}", user_id, role.as_ref());
        updated.map(UserView::from).ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
    }

    /// Points the profile picture at a freshly stored avatar, dropping the old file.
    pub async fn set_avatar(
        db: &Surreal<Any>,
        storage: &StorageService,
        ctx: &Ctx,
        user_id: &str,
        avatar_url: String,
    ) -> Result<UserView> {
        ensure_can_manage(ctx, user_id)?;
        let current = get_user(db, user_id).await?;
        if let Some(old) = &current.profile_picture {
            if let Err(e) = storage.delete(old).await {
                tracing::warn!("Could not delete avatar {}: {:?}", old, e);
            }
        }

        let patch = UserPatch {
            profile_picture: Some(avatar_url),
            updated_at: Utc::now().into(),
            ..Default::default()
        };
        Self::merge(db, user_id, patch).await
    }

    /// Removes the account with its songs, playlists and social records.
    pub async fn delete_user(
        db: &Surreal<Any>,
        storage: &StorageService,
        ctx: &Ctx,
        user_id: &str,
    ) -> Result<()> {
        ensure_can_manage(ctx, user_id)?;
        let user = get_user(db, user_id).await?;
        let user_thing = create_user_thing(user_id);

        let song_ids: Vec<Thing> = db
            .query("SELECT VALUE id FROM song WHERE user = $user")
            .bind(("user", user_thing.clone()))
            .await?
            .take(0)?;
        for song in &song_ids {
            SongService::delete_song(db, storage, ctx, &thing_to_id(song)).await?;
        }

        let playlist_ids: Vec<Thing> = db
            .query("SELECT VALUE id FROM playlist WHERE user = $user")
            .bind(("user", user_thing.clone()))
            .await?
            .take(0)?;
        for playlist in &playlist_ids {
            PlaylistService::delete_playlist(db, storage, ctx, &thing_to_id(playlist)).await?;
        }

        if let Some(avatar) = &user.profile_picture {
            if let Err(e) = storage.delete(avatar).await {
                tracing::warn!("Could not delete avatar {}: {:?}", avatar, e);
            }
        }

        db.query(
            "FOR $like IN (SELECT song FROM song_like WHERE user = $user) {
                UPDATE $like.song SET like_count = math::max([like_count - 1, 0]);
            }",
        )
        .query(
            "FOR $comment IN (SELECT song FROM comment WHERE user = $user) {
                UPDATE $comment.song SET comment_count = math::max([comment_count - 1, 0]);
            }",
        )
        .query("DELETE song_like WHERE user = $user")
        .query("DELETE comment WHERE user = $user")
        .query("DELETE follower WHERE follower = $user OR following = $user")
        .query("DELETE follow_playlist WHERE user = $user")
        .query("DELETE flag_report WHERE reported_by = $user")
        .query("DELETE subscription WHERE user = $user")
        .query("DELETE payment_order WHERE user = $user")
        .query("DELETE playback_session WHERE user_id = $user_id")
        .query("DELETE $user")
        .bind(("user", user_thing))
        .bind(("user_id", user_id.to_string()))
        .await?
        .check()?;

        tracing::info!("User {} deleted by {}", user_id, ctx.user_id);
        Ok(())
    }

    async fn ensure_username_free(db: &Surreal<Any>, username: &str) -> Result<()> {
        let mut res = db
            .query("SELECT count() AS total FROM user WHERE username = $username GROUP ALL")
            .bind(("username", username.to_string()))
            .await?;
        if take_count(&mut res, 0)? > 0 {
            return Err(Error::UserAlreadyExists {
                field: "Username".to_string(),
            });
        }
        Ok(())
    }

    async fn merge(db: &Surreal<Any>, user_id: &str, patch: UserPatch) -> Result<UserView> {
        let updated: Option<UserRecord> = db
            .query("UPDATE $user MERGE $patch RETURN AFTER")
            .bind(("user", create_user_thing(user_id)))
            .bind(("patch", patch))
            .await?
            .take(0)?;
        updated.map(UserView::from).ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
    }
}

fn ensure_can_manage(ctx: &Ctx, user_id: &str) -> Result<()> {
    if !ctx.can_manage(user_id) {
        return Err(Error::Forbidden {
            reason: "You can only modify your own account".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::song::Visibility;
    use crate::services::like_service::LikeService;
    use crate::services::storage_service::test_storage;

    fn ctx(user_id: &str, role: Role) -> Ctx {
        Ctx {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            role,
            username: user_id.to_string(),
        }
    }

    fn create_request(email: &str, username: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: "secret42".to_string(),
            name: Some("Someone".to_string()),
            phone: None,
            address: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_uniqueness() {
        let db = setup_test_db().await;
        let user = UserService::create_user(&db, create_request("Ana@Example.com", "ana"))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(user.is_active);
        assert_eq!(user.role, Role::User);

        let dup_email =
            UserService::create_user(&db, create_request("ana@example.com", "other")).await;
        assert!(matches!(dup_email, Err(Error::UserAlreadyExists { ref field }) if field == "Email"));

        let dup_name = UserService::create_user(&db, create_request("new@example.com", "ana")).await;
        assert!(matches!(dup_name, Err(Error::UserAlreadyExists { ref field }) if field == "Username"));
    }

    #[tokio::test]
    async fn test_paged_list_with_search() {
        let db = setup_test_db().await;
        for name in ["alpha", "beta", "gamma", "alphonse"] {
            insert_test_user(&db, name).await;
        }

        let page = UserService::find_paged(
            &db,
            UserListQuery {
                current_page: Some(1),
                page_size: Some(3),
                search: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total_items, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.results.len(), 3);

        let found = UserService::find_paged(
            &db,
            UserListQuery {
                current_page: None,
                page_size: None,
                search: Some("ALPH".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(found.total_items, 2);
    }

    #[tokio::test]
    async fn test_discover_ranks_by_followers() {
        let db = setup_test_db().await;
        let me = insert_test_user(&db, "me").await;
        let star = insert_test_user(&db, "star").await;
        let quiet = insert_test_user(&db, "quiet").await;
        let fan = insert_test_user(&db, "fan").await;

        FollowerService::follow(&db, &me, &star).await.unwrap();
        FollowerService::follow(&db, &fan, &star).await.unwrap();
        FollowerService::follow(&db, &fan, &quiet).await.unwrap();

        let ranked = UserService::discover(&db, Some(&me), None).await.unwrap();
        assert!(ranked.iter().all(|u| u.user.id != me));
        assert_eq!(ranked[0].user.id, star);
        assert_eq!(ranked[0].followers_count, 2);
        assert!(ranked[0].is_following);
        assert!(!ranked.iter().find(|u| u.user.id == quiet).unwrap().is_following);
    }

    #[tokio::test]
    async fn test_profile_counts_and_update_rules() {
        let db = setup_test_db().await;
        let ana = insert_test_user(&db, "ana").await;
        let bo = insert_test_user(&db, "bo").await;
        insert_test_song(&db, &ana, "One", Visibility::Public).await;
        FollowerService::follow(&db, &bo, &ana).await.unwrap();

        let profile = UserService::get_profile(&db, Some(&bo), &ana).await.unwrap();
        assert_eq!(profile.followers_count, 1);
        assert_eq!(profile.songs_count, 1);
        assert!(profile.is_following);

        let denied = UserService::update_user(
            &db,
            &ctx(&bo, Role::User),
            &ana,
            UpdateUserRequest::default(),
        )
        .await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let taken = UserService::update_user(
            &db,
            &ctx(&ana, Role::User),
            &ana,
            UpdateUserRequest {
                username: Some("bo".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(taken, Err(Error::UserAlreadyExists { .. })));

        let updated = UserService::update_user(
            &db,
            &ctx(&ana, Role::User),
            &ana,
            UpdateUserRequest {
                bio: Some("Writes songs".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Writes songs"));
        assert_eq!(updated.username, "ana");

        let banned = UserService::update_status(&db, &bo, UserStatus::Banned).await.unwrap();
        assert_eq!(banned.status, UserStatus::Banned);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("msa-user-{}", uuid::Uuid::new_v4()));
        let storage = test_storage(&dir);
        let ana = insert_test_user(&db, "ana").await;
        let bo = insert_test_user(&db, "bo").await;
        let ana_song = insert_test_song(&db, &ana, "Mine", Visibility::Public).await;
        let bo_song = insert_test_song(&db, &bo, "Theirs", Visibility::Public).await;

        LikeService::like(&db, &ana, &bo_song).await.unwrap();
        FollowerService::follow(&db, &bo, &ana).await.unwrap();

        UserService::delete_user(&db, &storage, &ctx(&ana, Role::User), &ana)
            .await
            .unwrap();

        assert!(matches!(get_user(&db, &ana).await, Err(Error::UserNotFound { .. })));
        assert!(SongService::find_one(&db, &ana_song).await.is_err());
        assert_eq!(
            crate::helpers::song_helpers::get_song(&db, &bo_song)
                .await
                .unwrap()
                .like_count,
            0
        );
        assert_eq!(FollowerService::following_count(&db, &bo).await.unwrap(), 0);
    }
}
