use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

use crate::models::user::UserSummary;

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_users: u64,
    pub active_users: u64,
    pub total_songs: u64,
    pub public_songs: u64,
    pub private_songs: u64,
    pub total_playlists: u64,
    pub new_users: u64,
    pub new_songs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GrowthPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub song_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub counts: DashboardCounts,
    pub user_growth: Vec<GrowthPoint>,
    pub most_active_users: Vec<ActiveUser>,
}

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    UserRegistered,
    TrackUploaded,
    PlaylistCreated,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub message: String,
    pub timestamp: Datetime,
    pub user: Option<UserSummary>,
    pub target_id: Option<String>,
    pub target_type: Option<&'static str>,
    pub target_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActivityQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<ActivityType>,
}

#[derive(Debug, Serialize)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}
