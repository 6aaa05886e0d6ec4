use serde::{Deserialize, Deserializer, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::models::genre::GenreSummary;
use crate::models::user::UserSummary;

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SongRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub title: String,
    pub artist: Option<String>,
    /// Seconds.
    pub duration: f64,
    pub upload_date: Datetime,
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub lyrics: Option<String>,
    /// Only loaded by the vector search paths, every other query omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_embedding: Option<Vec<f32>>,
    pub audio_url: Option<String>,
    pub thumbnail: Option<String>,
    pub cover: Option<String>,
    pub visibility: Visibility,
    pub user: Thing,
    pub is_flagged: bool,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SongView {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub upload_date: Datetime,
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub lyrics: Option<String>,
    pub audio_url: Option<String>,
    pub thumbnail: Option<String>,
    pub cover: Option<String>,
    pub visibility: Visibility,
    pub is_flagged: bool,
    pub user_id: String,
    pub user: Option<UserSummary>,
    pub genres: Vec<GenreSummary>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

impl SongView {
    /// Artist falls back to the uploader's name, then username.
    pub fn from_record(
        song: SongRecord,
        user: Option<UserSummary>,
        genres: Vec<GenreSummary>,
    ) -> Self {
        let artist = song
            .artist
            .filter(|a| !a.trim().is_empty())
            .or_else(|| user.as_ref().and_then(|u| u.name.clone()))
            .or_else(|| user.as_ref().map(|u| u.username.clone()))
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Self {
            id: opt_thing_to_id(&song.id),
            title: song.title,
            artist,
            duration: song.duration,
            upload_date: song.upload_date,
            play_count: song.play_count,
            like_count: song.like_count,
            comment_count: song.comment_count,
            lyrics: song.lyrics,
            audio_url: song.audio_url,
            thumbnail: song.thumbnail,
            cover: song.cover,
            visibility: song.visibility,
            is_flagged: song.is_flagged,
            user_id: thing_to_id(&song.user),
            user,
            genres,
            created_at: song.created_at,
            updated_at: song.updated_at,
        }
    }
}

/// Admin listing row: signed URLs plus flattened genre names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSongView {
    #[serde(flatten)]
    pub song: SongView,
    pub genre: Option<String>,
    pub genre_names: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    pub title: String,
    pub artist: Option<String>,
    pub duration: Option<f64>,
    pub lyrics: Option<String>,
    pub audio_url: Option<String>,
    pub thumbnail: Option<String>,
    pub cover: Option<String>,
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<f64>,
    pub lyrics: Option<String>,
    pub thumbnail: Option<String>,
    pub cover: Option<String>,
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "deserialize_opt_id_list")]
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLyricsRequest {
    pub lyrics: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSongRequest {
    pub is_flagged: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignedUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUrlResponse {
    pub audio_url: String,
}

/// Query string of `GET /songs/search`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SongSearchQuery {
    pub query: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub sort_order: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub visibility: Option<Visibility>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SongSearchResponse {
    pub data: Vec<SongView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct LyricsSearchQuery {
    #[serde(alias = "query")]
    pub q: String,
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
}

#[derive(strum_macros::AsRefStr, Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LyricsSearchMethod {
    VectorIndex,
    CosineScan,
    TextMatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsMatch {
    #[serde(flatten)]
    pub song: SongView,
    pub score: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsSearchResponse {
    pub query: String,
    pub search_method: LyricsSearchMethod,
    pub results: Vec<LyricsMatch>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub processed: usize,
    pub embedded: usize,
    pub skipped: usize,
}

/// Multipart forms send genres either as a JSON array string or a single id.
fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_id_list(deserializer)?.unwrap_or_default())
}

fn deserialize_opt_id_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdList {
        Many(Vec<String>),
        One(String),
    }

    Ok(match Option::<IdList>::deserialize(deserializer)? {
        None => None,
        Some(IdList::Many(ids)) => Some(ids),
        Some(IdList::One(raw)) => Some(parse_id_list(&raw)),
    })
}

pub fn parse_id_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| vec![raw.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list_formats() {
        assert_eq!(parse_id_list(r#"["a","b"]"#), vec!["a", "b"]);
        assert_eq!(parse_id_list("rock"), vec!["rock"]);
        assert!(parse_id_list("  ").is_empty());
    }

    #[test]
    fn test_artist_fallback() {
        use crate::helpers::thing_helpers::create_user_thing;

        let now: Datetime = chrono::Utc::now().into();
        let record = SongRecord {
            id: Some(Thing::from(("song".to_string(), "s1".to_string()))),
            title: "Night Drive".to_string(),
            artist: Some("  ".to_string()),
            duration: 200.0,
            upload_date: now.clone(),
            play_count: 0,
            like_count: 0,
            comment_count: 0,
            lyrics: None,
            lyrics_embedding: None,
            audio_url: None,
            thumbnail: None,
            cover: None,
            visibility: Visibility::Public,
            user: create_user_thing("u1"),
            is_flagged: false,
            created_at: now.clone(),
            updated_at: now,
        };
        let uploader = UserSummary {
            id: "u1".to_string(),
            username: "nightowl".to_string(),
            name: None,
            profile_picture: None,
        };

        let view = SongView::from_record(record.clone(), Some(uploader), vec![]);
        assert_eq!(view.artist, "nightowl");
        assert_eq!(view.id, "s1");
        assert_eq!(view.user_id, "u1");

        let view = SongView::from_record(record, None, vec![]);
        assert_eq!(view.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_create_request_accepts_single_genre_string() {
        let req: CreateSongRequest =
            serde_json::from_str(r#"{"title":"Song","genres":"g1"}"#).unwrap();
        assert_eq!(req.genres, vec!["g1"]);

        let req: CreateSongRequest =
            serde_json::from_str(r#"{"title":"Song","genres":["g1","g2"]}"#).unwrap();
        assert_eq!(req.genres.len(), 2);

        let req: CreateSongRequest = serde_json::from_str(r#"{"title":"Song"}"#).unwrap();
        assert!(req.genres.is_empty());
        assert_eq!(req.visibility, None);
    }
}
