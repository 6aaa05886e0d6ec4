use std::collections::{HashMap, HashSet};

use chrono::Utc;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::song_helpers::song_exists;
use crate::helpers::thing_helpers::{
    create_playlist_thing, create_song_thing, create_user_thing, opt_thing_to_id, thing_to_id,
};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::middlewares::mw_auth::Ctx;
use crate::models::playlist::{
    CreatePlaylistRequest, PlaylistDetails, PlaylistListQuery, PlaylistRecord, PlaylistView,
    UpdatePlaylistRequest,
};
use crate::models::song::{SongRecord, Visibility};
use crate::services::song_service::SongService;
use crate::services::storage_service::StorageService;
use crate::services::subscription_service::SubscriptionService;
use crate::validators::text_validator::{ensure_optional_max_len, ensure_text};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;
const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 100;

pub struct PlaylistService;

impl PlaylistService {
    pub async fn get_playlist(db: &Surreal<Any>, playlist_id: &str) -> Result<PlaylistRecord> {
        let playlist: Option<PlaylistRecord> = db
            .query("SELECT * FROM $playlist")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .await?
            .take(0)?;
        playlist.ok_or_else(|| Error::PlaylistNotFound {
            id: playlist_id.to_string(),
        })
    }

    /// Playlist the caller may modify (owner or admin).
    pub async fn get_managed_playlist(
        db: &Surreal<Any>,
        ctx: &Ctx,
        playlist_id: &str,
    ) -> Result<PlaylistRecord> {
        let playlist = Self::get_playlist(db, playlist_id).await?;
        if !ctx.can_manage(&playlist.owner_id()) {
            return Err(Error::Forbidden {
                reason: "You can only modify your own playlists".to_string(),
            });
        }
        Ok(playlist)
    }

    pub async fn create_playlist(
        db: &Surreal<Any>,
        user_id: &str,
        req: CreatePlaylistRequest,
    ) -> Result<PlaylistView> {
        let name = ensure_text("name", &req.name, MAX_NAME_LEN)?;
        ensure_optional_max_len("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        SubscriptionService::ensure_can_create_playlist(db, user_id).await?;

        let mut songs: Vec<Thing> = Vec::with_capacity(req.songs.len());
        for song_id in &req.songs {
            if !song_exists(db, song_id).await? {
                return Err(Error::SongNotFound {
                    id: song_id.clone(),
                });
            }
            let song = create_song_thing(song_id);
            if !songs.contains(&song) {
                songs.push(song);
            }
        }

        let now = Utc::now();
        let created: Option<PlaylistRecord> = db
            .create("playlist")
            .content(PlaylistRecord {
                id: None,
                name,
                description: req.description,
                cover: req.cover,
                user: create_user_thing(user_id),
                songs,
                visibility: req.visibility.unwrap_or_default(),
                is_featured: false,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        let playlist =
            created.ok_or_else(|| Error::DbError("Could not create playlist".into()))?;
        tracing::info!("User {} created playlist {}", user_id, opt_thing_to_id(&playlist.id));
        Self::to_view(db, playlist).await
    }

    /// Public playlists; admins may list by any visibility.
    pub async fn find_all(
        db: &Surreal<Any>,
        viewer: Option<&Ctx>,
        query: PlaylistListQuery,
    ) -> Result<Vec<PlaylistView>> {
        let visibility = match (viewer, query.visibility) {
            (Some(ctx), Some(v)) if ctx.is_admin() => v,
            _ => Visibility::Public,
        };
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        let playlists: Vec<PlaylistRecord> = db
            .query(
                "SELECT * FROM playlist WHERE visibility = $visibility \
                 ORDER BY created_at DESC LIMIT $limit",
            )
            .bind(("visibility", visibility))
            .bind(("limit", limit))
            .await?
            .take(0)?;
        Self::to_views(db, playlists).await
    }

    pub async fn find_featured(db: &Surreal<Any>) -> Result<Vec<PlaylistView>> {
        let playlists: Vec<PlaylistRecord> = db
            .query(
                "SELECT * FROM playlist WHERE is_featured = true AND visibility = 'PUBLIC' \
                 ORDER BY updated_at DESC",
            )
            .await?
            .take(0)?;
        Self::to_views(db, playlists).await
    }

    pub async fn find_all_for_admin(db: &Surreal<Any>) -> Result<Vec<PlaylistView>> {
        let playlists: Vec<PlaylistRecord> = db
            .query("SELECT * FROM playlist ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Self::to_views(db, playlists).await
    }

    /// Playlists owned by `owner_id`; private ones only for the owner.
    pub async fn find_user_playlists(
        db: &Surreal<Any>,
        owner_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<PlaylistView>> {
        let query = if viewer_id == Some(owner_id) {
            "SELECT * FROM playlist WHERE user = $user ORDER BY created_at DESC"
        } else {
            "SELECT * FROM playlist WHERE user = $user AND visibility = 'PUBLIC' ORDER BY created_at DESC"
        };

        let playlists: Vec<PlaylistRecord> = db
            .query(query)
            .bind(("user", create_user_thing(owner_id)))
            .await?
            .take(0)?;
        Self::to_views(db, playlists).await
    }

    /// Playlist with its songs in order and its follower count.
    pub async fn get_details(
        db: &Surreal<Any>,
        viewer: Option<&Ctx>,
        playlist_id: &str,
    ) -> Result<PlaylistDetails> {
        let playlist = Self::get_playlist(db, playlist_id).await?;
        let owner = playlist.owner_id();
        let can_manage = viewer.is_some_and(|ctx| ctx.can_manage(&owner));

        if playlist.visibility == Visibility::Private && !can_manage {
            return Err(Error::Forbidden {
                reason: "This playlist is private".to_string(),
            });
        }

        let songs: Vec<SongRecord> = if playlist.songs.is_empty() {
            Vec::new()
        } else {
            db.query("SELECT * OMIT lyrics_embedding FROM song WHERE id IN $songs")
                .bind(("songs", playlist.songs.clone()))
                .await?
                .take(0)?
        };
        let mut by_id: HashMap<String, SongRecord> = songs
            .into_iter()
            .filter(|s| can_manage || (!s.is_flagged && s.visibility == Visibility::Public))
            .map(|s| (opt_thing_to_id(&s.id), s))
            .collect();
        let ordered: Vec<SongRecord> = playlist
            .songs
            .iter()
            .filter_map(|t| by_id.remove(&thing_to_id(t)))
            .collect();

        let mut res = db
            .query("SELECT count() AS total FROM follow_playlist WHERE playlist = $playlist GROUP ALL")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .await?;
        let followers_count = take_count(&mut res, 0)?;

        Ok(PlaylistDetails {
            songs: SongService::populate(db, ordered).await?,
            playlist: Self::to_view(db, playlist).await?,
            followers_count,
        })
    }

    pub async fn update_playlist(
        db: &Surreal<Any>,
        ctx: &Ctx,
        playlist_id: &str,
        req: UpdatePlaylistRequest,
    ) -> Result<PlaylistView> {
        let mut playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;

        if let Some(name) = req.name {
            playlist.name = ensure_text("name", &name, MAX_NAME_LEN)?;
        }
        if let Some(description) = req.description {
            ensure_optional_max_len("description", Some(&description), MAX_DESCRIPTION_LEN)?;
            playlist.description = Some(description);
        }
        if let Some(cover) = req.cover {
            playlist.cover = Some(cover);
        }
        if let Some(visibility) = req.visibility {
            playlist.visibility = visibility;
        }

        let updated: Option<PlaylistRecord> = db
            .query(
                "UPDATE $playlist SET name = $name, description = $description, cover = $cover, \
                 visibility = $visibility, updated_at = time::now() RETURN AFTER",
            )
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("name", playlist.name))
            .bind(("description", playlist.description))
            .bind(("cover", playlist.cover))
            .bind(("visibility", playlist.visibility))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    /// New order must be a permutation of the current songs.
    pub async fn reorder_songs(
        db: &Surreal<Any>,
        ctx: &Ctx,
        playlist_id: &str,
        song_ids: Vec<String>,
    ) -> Result<PlaylistView> {
        let playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;
        let new_order: Vec<Thing> = song_ids.iter().map(|id| create_song_thing(id)).collect();
        check_permutation(&playlist.songs, &new_order)?;

        let updated: Option<PlaylistRecord> = db
            .query("UPDATE $playlist SET songs = $songs, updated_at = time::now() RETURN AFTER")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("songs", new_order))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    pub async fn add_song(
        db: &Surreal<Any>,
        ctx: &Ctx,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<PlaylistView> {
        let playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;
        if !song_exists(db, song_id).await? {
            return Err(Error::SongNotFound {
                id: song_id.to_string(),
            });
        }

        let song = create_song_thing(song_id);
        if playlist.songs.contains(&song) {
            return Err(Error::SongAlreadyExistsInPlaylist {
                song_id: song_id.to_string(),
                playlist_id: playlist_id.to_string(),
            });
        }

        let updated: Option<PlaylistRecord> = db
            .query("UPDATE $playlist SET songs += $song, updated_at = time::now() RETURN AFTER")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("song", song))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    pub async fn remove_song(
        db: &Surreal<Any>,
        ctx: &Ctx,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<PlaylistView> {
        let playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;
        let song = create_song_thing(song_id);
        if !playlist.songs.contains(&song) {
            return Err(Error::ResourceNotFound {
                message: "Song not found in playlist".to_string(),
            });
        }

        let updated: Option<PlaylistRecord> = db
            .query("UPDATE $playlist SET songs -= $song, updated_at = time::now() RETURN AFTER")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("song", song))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    pub async fn set_featured(
        db: &Surreal<Any>,
        playlist_id: &str,
        is_featured: bool,
    ) -> Result<PlaylistView> {
        let updated: Option<PlaylistRecord> = db
            .query("UPDATE $playlist SET is_featured = $featured, updated_at = time::now() RETURN AFTER")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("featured", is_featured))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    /// Points the playlist at a freshly stored cover, dropping the old file.
    pub async fn set_cover(
        db: &Surreal<Any>,
        storage: &StorageService,
        ctx: &Ctx,
        playlist_id: &str,
        cover_url: String,
    ) -> Result<PlaylistView> {
        let playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;
        if let Some(old) = playlist.cover.as_deref().filter(|old| *old != cover_url) {
            if let Err(e) = storage.delete(old).await {
                tracing::warn!("Could not delete old cover {}: {:?}", old, e);
            }
        }

        let updated: Option<PlaylistRecord> = db
            .query("UPDATE $playlist SET cover = $cover, updated_at = time::now() RETURN AFTER")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .bind(("cover", cover_url))
            .await?
            .take(0)?;
        Self::updated_view(db, playlist_id, updated).await
    }

    /// Deletes the playlist, its follow rows and its stored cover.
    pub async fn delete_playlist(
        db: &Surreal<Any>,
        storage: &StorageService,
        ctx: &Ctx,
        playlist_id: &str,
    ) -> Result<()> {
        let playlist = Self::get_managed_playlist(db, ctx, playlist_id).await?;
        if let Some(cover) = &playlist.cover {
            if let Err(e) = storage.delete(cover).await {
                tracing::warn!("Could not delete cover {}: {:?}", cover, e);
            }
        }

        db.query("DELETE follow_playlist WHERE playlist = $playlist")
            .query("DELETE $playlist")
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .await?
            .check()?;
        tracing::info!("Playlist {} deleted by {}", playlist_id, ctx.user_id);
        Ok(())
    }

    async fn updated_view(
        db: &Surreal<Any>,
        playlist_id: &str,
        updated: Option<PlaylistRecord>,
    ) -> Result<PlaylistView> {
        let playlist = updated.ok_or_else(|| Error::PlaylistNotFound {
            id: playlist_id.to_string(),
        })?;
        Self::to_view(db, playlist).await
    }

    pub async fn to_view(db: &Surreal<Any>, playlist: PlaylistRecord) -> Result<PlaylistView> {
        let id = opt_thing_to_id(&playlist.id);
        Self::to_views(db, vec![playlist])
            .await?
            .pop()
            .ok_or(Error::PlaylistNotFound { id })
    }

    pub async fn to_views(
        db: &Surreal<Any>,
        playlists: Vec<PlaylistRecord>,
    ) -> Result<Vec<PlaylistView>> {
        let users =
            fetch_user_summaries(db, playlists.iter().map(|p| p.user.clone()).collect()).await?;
        Ok(playlists
            .into_iter()
            .map(|p| {
                let owner = users.get(&p.owner_id()).cloned();
                PlaylistView::from_record(p, owner)
            })
            .collect())
    }
}

fn check_permutation(current: &[Thing], new_order: &[Thing]) -> Result<()> {
    let current_set: HashSet<&Thing> = current.iter().collect();
    if new_order.iter().any(|song| !current_set.contains(song)) {
        return Err(Error::InvalidInput {
            reason: "The new order contains songs that are not in the playlist".to_string(),
        });
    }

    let new_set: HashSet<&Thing> = new_order.iter().collect();
    if new_order.len() != current.len() || new_set.len() != current_set.len() {
        return Err(Error::InvalidInput {
            reason: "The new order must contain all songs from the playlist".to_string(),
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
    use crate::models::user::Role;

    fn ctx(user_id: &str) -> Ctx {
        Ctx {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            role: Role::User,
            username: user_id.to_string(),
        }
    }

    fn create_req(name: &str, visibility: Visibility, songs: Vec<String>) -> CreatePlaylistRequest {
        CreatePlaylistRequest {
            name: name.to_string(),
            description: None,
            cover: None,
            visibility: Some(visibility),
            songs,
        }
    }

    #[test]
    fn test_check_permutation() {
        let a = create_song_thing("a");
        let b = create_song_thing("b");
        let c = create_song_thing("c");
        let current = vec![a.clone(), b.clone()];

        assert!(check_permutation(&current, &[b.clone(), a.clone()]).is_ok());

        let err = check_permutation(&current, &[a.clone(), c]).unwrap_err();
        assert_eq!(
            err.client_message(),
            "The new order contains songs that are not in the playlist"
        );

        let err = check_permutation(&current, &[a.clone()]).unwrap_err();
        assert_eq!(
            err.client_message(),
            "The new order must contain all songs from the playlist"
        );
        assert!(check_permutation(&current, &[a.clone(), a]).is_err());
    }

    #[tokio::test]
    async fn test_create_add_reorder_remove() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "curator").await;
        let s1 = insert_test_song(&db, &owner, "One", Visibility::Public).await;
        let s2 = insert_test_song(&db, &owner, "Two", Visibility::Public).await;

        let playlist = PlaylistService::create_playlist(
            &db,
            &owner,
            create_req("Morning", Visibility::Public, vec![s1.clone()]),
        )
        .await
        .unwrap();
        assert_eq!(playlist.songs_count, 1);
        assert_eq!(playlist.user.as_ref().unwrap().username, "curator");

        let me = ctx(&owner);
        let added = PlaylistService::add_song(&db, &me, &playlist.id, &s2).await.unwrap();
        assert_eq!(added.song_ids, vec![s1.clone(), s2.clone()]);

        let dup = PlaylistService::add_song(&db, &me, &playlist.id, &s2).await;
        assert!(matches!(dup, Err(Error::SongAlreadyExistsInPlaylist { .. })));

        let reordered =
            PlaylistService::reorder_songs(&db, &me, &playlist.id, vec![s2.clone(), s1.clone()])
                .await
                .unwrap();
        assert_eq!(reordered.song_ids, vec![s2.clone(), s1.clone()]);

        let details = PlaylistService::get_details(&db, None, &playlist.id).await.unwrap();
        let titles: Vec<&str> = details.songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Two", "One"]);
        assert_eq!(details.followers_count, 0);

        let removed = PlaylistService::remove_song(&db, &me, &playlist.id, &s2).await.unwrap();
        assert_eq!(removed.song_ids, vec![s1]);

        let intruder = PlaylistService::add_song(&db, &ctx("someone"), &playlist.id, &s2).await;
        assert!(matches!(intruder, Err(Error::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_private_playlists_hidden_from_others() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "private").await;
        let other = insert_test_user(&db, "nosy").await;

        let hidden = PlaylistService::create_playlist(
            &db,
            &owner,
            create_req("Diary", Visibility::Private, vec![]),
        )
        .await
        .unwrap();
        PlaylistService::create_playlist(&db, &owner, create_req("Shared", Visibility::Public, vec![]))
            .await
            .unwrap();

        assert_eq!(
            PlaylistService::find_user_playlists(&db, &owner, Some(&owner)).await.unwrap().len(),
            2
        );
        assert_eq!(
            PlaylistService::find_user_playlists(&db, &owner, Some(&other)).await.unwrap().len(),
            1
        );
        assert_eq!(
            PlaylistService::find_all(&db, None, PlaylistListQuery::default()).await.unwrap().len(),
            1
        );
        assert!(matches!(
            PlaylistService::get_details(&db, Some(&ctx(&other)), &hidden.id).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(PlaylistService::get_details(&db, Some(&ctx(&owner)), &hidden.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_free_plan_playlist_limit() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "collector").await;
        for i in 0..5 {
            PlaylistService::create_playlist(
                &db,
                &owner,
                create_req(&format!("List {i}"), Visibility::Public, vec![]),
            )
            .await
            .unwrap();
        }

        let res = PlaylistService::create_playlist(
            &db,
            &owner,
            create_req("Sixth", Visibility::Public, vec![]),
        )
        .await;
        assert!(matches!(res, Err(Error::LimitExceeded { .. })));
    }

    #[tokio::test]
    async fn test_featured_and_delete() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "star").await;
        let fan = insert_test_user(&db, "fan").await;
        let playlist = PlaylistService::create_playlist(
            &db,
            &owner,
            create_req("Hits", Visibility::Public, vec![]),
        )
        .await
        .unwrap();

        PlaylistService::set_featured(&db, &playlist.id, true).await.unwrap();
        assert_eq!(PlaylistService::find_featured(&db).await.unwrap().len(), 1);

        db.query("CREATE follow_playlist SET user = $fan, playlist = $playlist, created_at = time::now()")
            .bind(("fan", create_user_thing(&fan)))
            .bind(("playlist", create_playlist_thing(&playlist.id)))
            .await
            .unwrap();

        let root = std::env::temp_dir().join(format!("playlists-{}", uuid::Uuid::new_v4()));
        let storage = crate::services::storage_service::test_storage(&root);
        PlaylistService::delete_playlist(&db, &storage, &ctx(&owner), &playlist.id)
            .await
            .unwrap();

        let mut res = db
            .query("SELECT count() AS total FROM follow_playlist GROUP ALL")
            .await
            .unwrap();
        assert_eq!(take_count(&mut res, 0).unwrap(), 0);
        assert!(matches!(
            PlaylistService::get_playlist(&db, &playlist.id).await,
            Err(Error::PlaylistNotFound { .. })
        ));
    }
}
