use chrono::Utc;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::song_helpers::get_song;
use crate::helpers::thing_helpers::{create_song_thing, create_thing, create_user_thing, thing_to_id};
use crate::middlewares::mw_auth::Ctx;
use crate::models::social::{LikeCheck, LikeRecord, LikeStatus, LikeToggleResult, LikeView};

pub struct LikeService;

impl LikeService {
    async fn find_like(
        db: &Surreal<Any>,
        user_id: &str,
        song_id: &str,
    ) -> Result<Option<LikeRecord>> {
        let mut likes: Vec<LikeRecord> = db
            .query("SELECT * FROM song_like WHERE user = $user AND song = $song LIMIT 1")
            .bind(("user", create_user_thing(user_id)))
            .bind(("song", create_song_thing(song_id)))
            .await?
            .take(0)?;
        Ok(likes.pop())
    }

    /// Likes a song. Liking twice keeps the first like and the counter untouched.
    pub async fn like(db: &Surreal<Any>, user_id: &str, song_id: &str) -> Result<LikeView> {
        get_song(db, song_id).await?;
        if let Some(existing) = Self::find_like(db, user_id, song_id).await? {
            return Ok(LikeView::from(existing));
        }

        let created: Option<LikeRecord> = db
            .create("song_like")
            .content(LikeRecord {
                id: None,
                user: create_user_thing(user_id),
                song: create_song_thing(song_id),
                created_at: Utc::now().into(),
            })
            .await?;
        let like = created.ok_or_else(|| Error::DbError("Could not create like".into()))?;

        db.query("UPDATE $song SET like_count += 1 RETURN NONE")
            .bind(("song", create_song_thing(song_id)))
            .await?
            .check()?;
        Ok(LikeView::from(like))
    }

    pub async fn like_song(
        db: &Surreal<Any>,
        user_id: &str,
        song_id: &str,
    ) -> Result<LikeToggleResult> {
        Self::like(db, user_id, song_id).await?;
        Ok(LikeToggleResult {
            liked: true,
            like_count: get_song(db, song_id).await?.like_count,
        })
    }

    /// Removes the caller's like, if any.
    pub async fn unlike_song(
        db: &Surreal<Any>,
        user_id: &str,
        song_id: &str,
    ) -> Result<LikeToggleResult> {
        get_song(db, song_id).await?;
        if let Some(existing) = Self::find_like(db, user_id, song_id).await? {
            Self::delete_like(db, &existing).await?;
        }
        Ok(LikeToggleResult {
            liked: false,
            like_count: get_song(db, song_id).await?.like_count,
        })
    }

    pub async fn get_status(
        db: &Surreal<Any>,
        viewer_id: Option<&str>,
        song_id: &str,
    ) -> Result<LikeStatus> {
        let song = get_song(db, song_id).await?;
        let like = match viewer_id {
            Some(user_id) => Self::find_like(db, user_id, song_id).await?,
            None => None,
        };
        Ok(LikeStatus {
            is_liked: like.is_some(),
            like_id: like.and_then(|l| l.id.as_ref().map(thing_to_id)),
            like_count: song.like_count,
        })
    }

    pub async fn count(db: &Surreal<Any>, song_id: &str) -> Result<u64> {
        let mut res = db
            .query("SELECT count() AS total FROM song_like WHERE song = $song GROUP ALL")
            .bind(("song", create_song_thing(song_id)))
            .await?;
        take_count(&mut res, 0)
    }

    pub async fn check(db: &Surreal<Any>, user_id: &str, song_id: &str) -> Result<LikeCheck> {
        let like = Self::find_like(db, user_id, song_id).await?;
        Ok(LikeCheck {
            liked: like.is_some(),
            like_id: like.and_then(|l| l.id.as_ref().map(thing_to_id)),
        })
    }

    pub async fn remove_by_id(db: &Surreal<Any>, ctx: &Ctx, like_id: &str) -> Result<()> {
        let like: Option<LikeRecord> = db
            .query("SELECT * FROM $like")
            .bind(("like", create_thing("song_like", like_id)))
            .await?
            .take(0)?;
        let like = like.ok_or_else(|| Error::ResourceNotFound {
            message: "Like not found".to_string(),
        })?;

        if !ctx.can_manage(&thing_to_id(&like.user)) {
            return Err(Error::Forbidden {
                reason: "You can only remove your own likes".to_string(),
            });
        }
        Self::delete_like(db, &like).await
    }

    async fn delete_like(db: &Surreal<Any>, like: &LikeRecord) -> Result<()> {
        db.query("DELETE $like")
            .query("UPDATE $song SET like_count = math::max([like_count - 1, 0]) RETURN NONE")
            .bind(("like", like.id.clone()))
            .bind(("song", like.song.clone()))
            .await?
            .check()?;
        Ok(())
    }
}
