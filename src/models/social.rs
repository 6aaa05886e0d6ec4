use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::models::playlist::PlaylistView;
use crate::models::user::UserSummary;

// -- Likes

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LikeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub song: Thing,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LikeView {
    pub id: String,
    pub user_id: String,
    pub song_id: String,
    pub created_at: Datetime,
}

impl From<LikeRecord> for LikeView {
    fn from(like: LikeRecord) -> Self {
        Self {
            id: opt_thing_to_id(&like.id),
            user_id: thing_to_id(&like.user),
            song_id: thing_to_id(&like.song),
            created_at: like.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLikeRequest {
    pub song_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub is_liked: bool,
    pub like_id: Option<String>,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggleResult {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCheck {
    pub liked: bool,
    pub like_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LikeCount {
    pub count: u64,
}

// -- Comments

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub song: Thing,
    pub content: String,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub song_id: String,
    pub content: String,
    pub user: Option<UserSummary>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl CommentView {
    pub fn from_record(comment: CommentRecord, user: Option<UserSummary>) -> Self {
        Self {
            id: opt_thing_to_id(&comment.id),
            user_id: thing_to_id(&comment.user),
            song_id: thing_to_id(&comment.song),
            content: comment.content,
            user,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub song_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

// -- Followers

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FollowerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub follower: Thing,
    pub following: Thing,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowerView {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: Datetime,
}

impl From<FollowerRecord> for FollowerView {
    fn from(follow: FollowerRecord) -> Self {
        Self {
            id: opt_thing_to_id(&follow.id),
            follower_id: thing_to_id(&follow.follower),
            following_id: thing_to_id(&follow.following),
            created_at: follow.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFollowerRequest {
    pub following_id: String,
}

/// A user in a followers/following list, seen from the caller.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowListEntry {
    pub follow_id: String,
    #[serde(flatten)]
    pub user: UserSummary,
    pub is_following: bool,
    pub followed_at: Datetime,
}

// -- Follow playlist

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FollowPlaylistRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub playlist: Thing,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowPlaylistView {
    pub id: String,
    pub user_id: String,
    pub playlist_id: String,
    pub created_at: Datetime,
}

impl From<FollowPlaylistRecord> for FollowPlaylistView {
    fn from(follow: FollowPlaylistRecord) -> Self {
        Self {
            id: opt_thing_to_id(&follow.id),
            user_id: thing_to_id(&follow.user),
            playlist_id: thing_to_id(&follow.playlist),
            created_at: follow.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFollowPlaylistRequest {
    pub playlist_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowPlaylistStatus {
    pub is_following: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistFollowers {
    pub followers: Vec<UserSummary>,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowedPlaylist {
    pub follow_id: String,
    pub followed_at: Datetime,
    pub playlist: PlaylistView,
}
