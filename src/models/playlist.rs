use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::models::song::{SongView, Visibility};
use crate::models::user::UserSummary;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaylistRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub user: Thing,
    /// Ordered song references.
    pub songs: Vec<Thing>,
    pub visibility: Visibility,
    pub is_featured: bool,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl PlaylistRecord {
    pub fn owner_id(&self) -> String {
        thing_to_id(&self.user)
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub user_id: String,
    pub song_ids: Vec<String>,
    pub songs_count: usize,
    pub visibility: Visibility,
    pub is_featured: bool,
    pub user: Option<UserSummary>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl PlaylistView {
    pub fn from_record(playlist: PlaylistRecord, user: Option<UserSummary>) -> Self {
        let song_ids: Vec<String> = playlist.songs.iter().map(thing_to_id).collect();
        Self {
            id: opt_thing_to_id(&playlist.id),
            name: playlist.name,
            description: playlist.description,
            cover: playlist.cover,
            user_id: thing_to_id(&playlist.user),
            songs_count: song_ids.len(),
            song_ids,
            visibility: playlist.visibility,
            is_featured: playlist.is_featured,
            user,
            created_at: playlist.created_at,
            updated_at: playlist.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetails {
    #[serde(flatten)]
    pub playlist: PlaylistView,
    pub songs: Vec<SongView>,
    pub followers_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub songs: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPlaylistRequest {
    pub song_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePlaylistRequest {
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlaylistListQuery {
    pub visibility: Option<Visibility>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSongsAndPlaylists {
    pub songs: Vec<SongView>,
    pub playlists: Vec<PlaylistView>,
}
