use chrono::Utc;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::models::playback::{PlaybackSessionRecord, PlaybackSessionView, SavePlaybackRequest};

pub struct PlaybackService;

impl PlaybackService {
    async fn find_session(
        db: &Surreal<Any>,
        user_id: &str,
        track_id: &str,
    ) -> Result<Option<PlaybackSessionRecord>> {
        let mut sessions: Vec<PlaybackSessionRecord> = db
            .query("SELECT * FROM playback_session WHERE user_id = $user_id AND track_id = $track_id LIMIT 1")
            .bind(("user_id", user_id.to_string()))
            .bind(("track_id", track_id.to_string()))
            .await?
            .take(0)?;
        Ok(sessions.pop())
    }

    /// One session per user and track: later saves overwrite the position.
    pub async fn save_session(
        db: &Surreal<Any>,
        user_id: &str,
        req: SavePlaybackRequest,
    ) -> Result<PlaybackSessionView> {
        let track_id = req.track_id.trim().to_string();
        if track_id.is_empty() {
            return Err(Error::InvalidInput {
                reason: "trackId is required".to_string(),
            });
        }
        if !req.position.is_finite() || req.position < 0.0 || !req.duration.is_finite() || req.duration < 0.0 {
            return Err(Error::InvalidInput {
                reason: "position and duration must be non-negative numbers".to_string(),
            });
        }

        let saved: Option<PlaybackSessionRecord> = match Self::find_session(db, user_id, &track_id).await? {
            Some(existing) => db
                .query("UPDATE $session SET position = $position, duration = $duration, updated_at = time::now() RETURN AFTER")
                .bind(("session", existing.id))
                .bind(("position", req.position))
                .bind(("duration", req.duration))
                .await?
                .take(0)?,
            None => {
                let now = Utc::now();
                db.create("playback_session")
                    .content(PlaybackSessionRecord {
                        id: None,
                        user_id: user_id.to_string(),
                        track_id,
                        position: req.position,
                        duration: req.duration,
                        created_at: now.into(),
                        updated_at: now.into(),
                    })
                    .await?
            }
        };

        saved
            .map(PlaybackSessionView::from)
            .ok_or_else(|| Error::DbError("Could not save playback session".into()))
    }

    pub async fn get_session(
        db: &Surreal<Any>,
        user_id: &str,
        track_id: &str,
    ) -> Result<Option<PlaybackSessionView>> {
        Ok(Self::find_session(db, user_id, track_id)
            .await?
            .map(PlaybackSessionView::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;

    fn save(track: &str, position: f64) -> SavePlaybackRequest {
        SavePlaybackRequest {
            track_id: track.to_string(),
            position,
            duration: 200.0,
        }
    }

    #[tokio::test]
    async fn test_save_overwrites_position() {
        let db = setup_test_db().await;
        let first = PlaybackService::save_session(&db, "u1", save("t1", 12.5)).await.unwrap();
        let second = PlaybackService::save_session(&db, "u1", save("t1", 80.0)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.position, 80.0);

        PlaybackService::save_session(&db, "u2", save("t1", 5.0)).await.unwrap();
        let mine = PlaybackService::get_session(&db, "u1", "t1").await.unwrap().unwrap();
        assert_eq!(mine.position, 80.0);
        assert!(PlaybackService::get_session(&db, "u1", "t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let db = setup_test_db().await;
        assert!(matches!(
            PlaybackService::save_session(&db, "u1", save(" ", 1.0)).await,
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            PlaybackService::save_session(&db, "u1", save("t1", -3.0)).await,
            Err(Error::InvalidInput { .. })
        ));
    }
}
