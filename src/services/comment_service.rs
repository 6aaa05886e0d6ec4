use chrono::Utc;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::song_helpers::get_song;
use crate::helpers::thing_helpers::{create_song_thing, create_thing, create_user_thing, thing_to_id};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::middlewares::mw_auth::Ctx;
use crate::models::social::{CommentRecord, CommentView, CreateCommentRequest};
use crate::validators::text_validator::ensure_text;

const MAX_COMMENT_LEN: usize = 1000;

pub struct CommentService;

impl CommentService {
    async fn get_comment(db: &Surreal<Any>, comment_id: &str) -> Result<CommentRecord> {
        let comment: Option<CommentRecord> = db
            .query("SELECT * FROM $comment")
            .bind(("comment", create_thing("comment", comment_id)))
            .await?
            .take(0)?;
        comment.ok_or_else(|| Error::CommentNotFound {
            id: comment_id.to_string(),
        })
    }

    pub async fn create_comment(
        db: &Surreal<Any>,
        user_id: &str,
        req: CreateCommentRequest,
    ) -> Result<CommentView> {
        let content = ensure_text("content", &req.content, MAX_COMMENT_LEN)?;
        get_song(db, &req.song_id).await?;

        let now = Utc::now();
        let created: Option<CommentRecord> = db
            .create("comment")
            .content(CommentRecord {
                id: None,
                user: create_user_thing(user_id),
                song: create_song_thing(&req.song_id),
                content,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;
        let comment = created.ok_or_else(|| Error::DbError("Could not create comment".into()))?;

        db.query("UPDATE $song SET comment_count += 1 RETURN NONE")
            .bind(("song", create_song_thing(&req.song_id)))
            .await?
            .check()?;

        Self::populate_one(db, comment).await
    }

    pub async fn find_all(db: &Surreal<Any>) -> Result<Vec<CommentView>> {
        let comments: Vec<CommentRecord> = db
            .query("SELECT * FROM comment ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Self::populate(db, comments).await
    }

    /// Comments of a song, newest first, with their authors.
    pub async fn find_by_song(db: &Surreal<Any>, song_id: &str) -> Result<Vec<CommentView>> {
        let comments: Vec<CommentRecord> = db
            .query("SELECT * FROM comment WHERE song = $song ORDER BY created_at DESC")
            .bind(("song", create_song_thing(song_id)))
            .await?
            .take(0)?;
        Self::populate(db, comments).await
    }

    pub async fn find_one(db: &Surreal<Any>, comment_id: &str) -> Result<CommentView> {
        let comment = Self::get_comment(db, comment_id).await?;
        Self::populate_one(db, comment).await
    }

    /// Only the author may edit.
    pub async fn update_comment(
        db: &Surreal<Any>,
        ctx: &Ctx,
        comment_id: &str,
        content: &str,
    ) -> Result<CommentView> {
        let content = ensure_text("content", content, MAX_COMMENT_LEN)?;
        let comment = Self::get_comment(db, comment_id).await?;
        if thing_to_id(&comment.user) != ctx.user_id {
            return Err(Error::Forbidden {
                reason: "You can only edit your own comments".to_string(),
            });
        }

        let updated: Option<CommentRecord> = db
            .query("UPDATE $comment SET content = $content, updated_at = time::now() RETURN AFTER")
            .bind(("comment", create_thing("comment", comment_id)))
            .bind(("content", content))
            .await?
            .take(0)?;
        let comment = updated.ok_or_else(|| Error::CommentNotFound {
            id: comment_id.to_string(),
        })?;
        Self::populate_one(db, comment).await
    }

    /// Author or admin.
    pub async fn delete_comment(db: &Surreal<Any>, ctx: &Ctx, comment_id: &str) -> Result<()> {
        let comment = Self::get_comment(db, comment_id).await?;
        if !ctx.can_manage(&thing_to_id(&comment.user)) {
            return Err(Error::Forbidden {
                reason: "You can only delete your own comments".to_string(),
            });
        }

        db.query("DELETE $comment")
            .query("UPDATE $song SET comment_count = math::max([comment_count - 1, 0]) RETURN NONE")
            .bind(("comment", comment.id.clone()))
            .bind(("song", comment.song.clone()))
            .await?
            .check()?;
        Ok(())
    }

    async fn populate(db: &Surreal<Any>, comments: Vec<CommentRecord>) -> Result<Vec<CommentView>> {
        let users =
            fetch_user_summaries(db, comments.iter().map(|c| c.user.clone()).collect()).await?;
        Ok(comments
            .into_iter()
            .map(|c| {
                let author = users.get(&thing_to_id(&c.user)).cloned();
                CommentView::from_record(c, author)
            })
            .collect())
    }

    async fn populate_one(db: &Surreal<Any>, comment: CommentRecord) -> Result<CommentView> {
        let users = fetch_user_summaries(db, vec![comment.user.clone()]).await?;
        let author = users.get(&thing_to_id(&comment.user)).cloned();
        Ok(CommentView::from_record(comment, author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::song::Visibility;
    use crate::models::user::Role;

    fn ctx(user_id: &str, role: Role) -> Ctx {
        Ctx {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            role,
            username: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_comment_lifecycle_keeps_counter() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "composer").await;
        let critic = insert_test_user(&db, "critic").await;
        let song = insert_test_song(&db, &owner, "Opus", Visibility::Public).await;

        let comment = CommentService::create_comment(
            &db,
            &critic,
            CreateCommentRequest {
                song_id: song.clone(),
                content: "  Lovely bridge ".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(comment.content, "Lovely bridge");
        assert_eq!(comment.user.as_ref().unwrap().username, "critic");
        assert_eq!(get_song(&db, &song).await.unwrap().comment_count, 1);

        let denied =
            CommentService::update_comment(&db, &ctx(&owner, Role::User), &comment.id, "edit").await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let edited =
            CommentService::update_comment(&db, &ctx(&critic, Role::User), &comment.id, "Great bridge")
                .await
                .unwrap();
        assert_eq!(edited.content, "Great bridge");

        assert_eq!(CommentService::find_by_song(&db, &song).await.unwrap().len(), 1);

        CommentService::delete_comment(&db, &ctx("mod", Role::Admin), &comment.id)
            .await
            .unwrap();
        assert_eq!(get_song(&db, &song).await.unwrap().comment_count, 0);
        assert!(matches!(
            CommentService::find_one(&db, &comment.id).await,
            Err(Error::CommentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_comment_on_missing_song() {
        let db = setup_test_db().await;
        let user = insert_test_user(&db, "lost").await;
        let res = CommentService::create_comment(
            &db,
            &user,
            CreateCommentRequest {
                song_id: "ghost".to_string(),
                content: "hello?".to_string(),
            },
        )
        .await;
        assert!(matches!(res, Err(Error::SongNotFound { .. })));
    }
}
