use serde::{Deserialize, Serialize};

use crate::models::user::UserView;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
}

/// Login accepts either the email or the username as identifier.
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeActivatePayload {
    #[serde(alias = "_id")]
    pub id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailPayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordPayload {
    pub email: String,
    pub code: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
    pub username: String,
}
