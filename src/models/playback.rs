use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::opt_thing_to_id;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaybackSessionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user_id: String,
    pub track_id: String,
    /// Seconds into the track.
    pub position: f64,
    pub duration: f64,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSessionView {
    pub id: String,
    pub user_id: String,
    pub track_id: String,
    pub position: f64,
    pub duration: f64,
    pub updated_at: Datetime,
}

impl From<PlaybackSessionRecord> for PlaybackSessionView {
    fn from(session: PlaybackSessionRecord) -> Self {
        Self {
            id: opt_thing_to_id(&session.id),
            user_id: session.user_id,
            track_id: session.track_id,
            position: session.position,
            duration: session.duration,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePlaybackRequest {
    pub track_id: String,
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackQuery {
    pub track_id: String,
}
