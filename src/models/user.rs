use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::opt_thing_to_id;

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub account_type: String,
    pub role: Role,
    pub status: UserStatus,
    /// Email verified through the activation code.
    pub is_active: bool,
    pub code_id: Option<String>,
    pub code_expired: Option<Datetime>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// User as returned to clients: no password, no pending codes.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub account_type: String,
    pub role: Role,
    pub status: UserStatus,
    pub is_active: bool,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: opt_thing_to_id(&user.id),
            email: user.email,
            username: user.username,
            name: user.name,
            phone: user.phone,
            address: user.address,
            bio: user.bio,
            profile_picture: user.profile_picture,
            account_type: user.account_type,
            role: user.role,
            status: user.status,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Compact author block embedded in songs, comments and follow lists.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub profile_picture: Option<String>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: opt_thing_to_id(&user.id),
            username: user.username.clone(),
            name: user.name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileView {
    #[serde(flatten)]
    pub user: UserView,
    pub followers_count: u64,
    pub following_count: u64,
    pub songs_count: u64,
    pub playlists_count: u64,
    pub is_following: bool,
}

/// Entry of the discover / popular listings.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserWithFollowStats {
    #[serde(flatten)]
    pub user: UserSummary,
    pub bio: Option<String>,
    pub followers_count: u64,
    pub songs_count: u64,
    pub is_following: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub current_page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListPage {
    pub results: Vec<UserView>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
