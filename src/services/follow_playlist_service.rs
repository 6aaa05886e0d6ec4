use std::collections::HashMap;

use chrono::Utc;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::thing_helpers::{
    create_playlist_thing, create_thing, create_user_thing, opt_thing_to_id, thing_to_id,
};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::middlewares::mw_auth::Ctx;
use crate::models::playlist::PlaylistRecord;
use crate::models::social::{
    FollowPlaylistRecord, FollowPlaylistStatus, FollowPlaylistView, FollowedPlaylist,
    PlaylistFollowers,
};
use crate::services::playlist_service::PlaylistService;

pub struct FollowPlaylistService;

impl FollowPlaylistService {
    async fn find_follow(
        db: &Surreal<Any>,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<FollowPlaylistRecord>> {
        let mut rows: Vec<FollowPlaylistRecord> = db
            .query("SELECT * FROM follow_playlist WHERE user = $user AND playlist = $playlist LIMIT 1")
            .bind(("user", create_user_thing(user_id)))
            .bind(("playlist", create_playlist_thing(playlist_id)))
            .await?
            .take(0)?;
        Ok(rows.pop())
    }

    pub async fn follow(
        db: &Surreal<Any>,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<FollowPlaylistView> {
        PlaylistService::get_playlist(db, playlist_id).await?;
        if Self::find_follow(db, user_id, playlist_id).await?.is_some() {
            return Err(Error::Conflict {
                message: "You are already following this playlist".to_string(),
            });
        }

        let created: Option<FollowPlaylistRecord> = db
            .create("follow_playlist")
            .content(FollowPlaylistRecord {
                id: None,
                user: create_user_thing(user_id),
                playlist: create_playlist_thing(playlist_id),
                created_at: Utc::now().into(),
            })
            .await?;
        created
            .map(FollowPlaylistView::from)
            .ok_or_else(|| Error::DbError("Could not follow playlist".into()))
    }

    pub async fn unfollow(db: &Surreal<Any>, user_id: &str, playlist_id: &str) -> Result<()> {
        let follow = Self::find_follow(db, user_id, playlist_id)
            .await?
            .ok_or_else(not_found)?;
        db.query("DELETE $follow")
            .bind(("follow", follow.id))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn status(
        db: &Surreal<Any>,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<FollowPlaylistStatus> {
        Ok(FollowPlaylistStatus {
            is_following: Self::find_follow(db, user_id, playlist_id).await?.is_some(),
        })
    }

    pub async fn followers(db: &Surreal<Any>, playlist_id: &str) -> Result<PlaylistFollowers> {
        let playlist = create_playlist_thing(playlist_id);
        let mut res = db
            .query("SELECT VALUE user FROM follow_playlist WHERE playlist = $playlist ORDER BY created_at DESC")
            .query("SELECT count() AS total FROM follow_playlist WHERE playlist = $playlist GROUP ALL")
            .bind(("playlist", playlist))
            .await?;
        let user_ids: Vec<Thing> = res.take(0)?;
        let count = take_count(&mut res, 1)?;

        let users = fetch_user_summaries(db, user_ids.clone()).await?;
        let followers = user_ids
            .iter()
            .filter_map(|u| users.get(&thing_to_id(u)).cloned())
            .collect();
        Ok(PlaylistFollowers { followers, count })
    }

    /// Playlists followed by the user, most recent follow first.
    pub async fn followed_by(db: &Surreal<Any>, user_id: &str) -> Result<Vec<FollowedPlaylist>> {
        let follows: Vec<FollowPlaylistRecord> = db
            .query("SELECT * FROM follow_playlist WHERE user = $user ORDER BY created_at DESC")
            .bind(("user", create_user_thing(user_id)))
            .await?
            .take(0)?;
        if follows.is_empty() {
            return Ok(Vec::new());
        }

        let playlist_ids: Vec<Thing> = follows.iter().map(|f| f.playlist.clone()).collect();
        let playlists: Vec<PlaylistRecord> = db
            .query("SELECT * FROM playlist WHERE id IN $ids")
            .bind(("ids", playlist_ids))
            .await?
            .take(0)?;
        let mut views: HashMap<String, _> = PlaylistService::to_views(db, playlists)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(follows
            .into_iter()
            .filter_map(|f| {
                views
                    .remove(&thing_to_id(&f.playlist))
                    .map(|playlist| FollowedPlaylist {
                        follow_id: opt_thing_to_id(&f.id),
                        followed_at: f.created_at,
                        playlist,
                    })
            })
            .collect())
    }

    pub async fn remove_by_id(db: &Surreal<Any>, ctx: &Ctx, follow_id: &str) -> Result<()> {
        let follow: Option<FollowPlaylistRecord> = db
            .query("SELECT * FROM $follow")
            .bind(("follow", create_thing("follow_playlist", follow_id)))
            .await?
            .take(0)?;
        let follow = follow.ok_or_else(not_found)?;
        if !ctx.can_manage(&thing_to_id(&follow.user)) {
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
}

fn not_found() -> Error {
    Error::ResourceNotFound {
        message: "Follow relationship not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::playlist::CreatePlaylistRequest;
    use crate::models::song::Visibility;

    async fn playlist(db: &Surreal<Any>, owner: &str, name: &str) -> String {
        PlaylistService::create_playlist(
            db,
            owner,
            CreatePlaylistRequest {
                name: name.to_string(),
                description: None,
                cover: None,
                visibility: Some(Visibility::Public),
                songs: vec![],
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_follow_unfollow_messages() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "owner").await;
        let fan = insert_test_user(&db, "fan").await;
        let list = playlist(&db, &owner, "Chill").await;

        FollowPlaylistService::follow(&db, &fan, &list).await.unwrap();
        match FollowPlaylistService::follow(&db, &fan, &list).await {
            Err(Error::Conflict { message }) => {
                assert_eq!(message, "You are already following this playlist")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(FollowPlaylistService::status(&db, &fan, &list).await.unwrap().is_following);

        let followers = FollowPlaylistService::followers(&db, &list).await.unwrap();
        assert_eq!(followers.count, 1);
        assert_eq!(followers.followers[0].username, "fan");

        let followed = FollowPlaylistService::followed_by(&db, &fan).await.unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].playlist.name, "Chill");

        FollowPlaylistService::unfollow(&db, &fan, &list).await.unwrap();
        match FollowPlaylistService::unfollow(&db, &fan, &list).await {
            Err(err) => assert_eq!(err.client_message(), "Follow relationship not found"),
            Ok(()) => panic!("second unfollow should fail"),
        }
    }

    #[tokio::test]
    async fn test_follow_missing_playlist() {
        let db = setup_test_db().await;
        let fan = insert_test_user(&db, "fan").await;
        assert!(matches!(
            FollowPlaylistService::follow(&db, &fan, "ghost").await,
            Err(Error::PlaylistNotFound { .. })
        ));
    }
}
