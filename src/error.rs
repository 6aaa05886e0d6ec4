use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, Serialize, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
    LoginFail,
    AccountNotActivated,
    AccountBanned,

    // -- Auth errors.
    AuthFailTokenWrongFormat,
    AuthFailCtxNotInRequestExt,
    Forbidden { reason: String },

    // -- Input errors.
    InvalidInput { reason: String },
    InvalidCode,
    InvalidSignature,
    MultipartError(String),

    // -- Model errors.
    UserNotFound { id: String },
    SongNotFound { id: String },
    PlaylistNotFound { id: String },
    GenreNotFound { id: String },
    CommentNotFound { id: String },
    ResourceNotFound { message: String },
    UserAlreadyExists { field: String },
    SongAlreadyExistsInPlaylist { song_id: String, playlist_id: String },
    Conflict { message: String },

    // -- Subscription errors.
    LimitExceeded { reason: String },

    // -- Infrastructure errors.
    DbError(String),
    EnvVarError(String),
    HashError(String),
    StorageError(String),
    ExternalService { service: String, message: String },
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, client_error) = self.client_status_and_error();

        if status_code.is_server_error() {
            tracing::error!("{:?}", self);
        }

        let response_body = serde_json::json!({
            "success": false,
            "statusCode": status_code.as_u16(),
            "error": client_error.as_ref(),
            "message": self.client_message(),
        });

        (status_code, Json(response_body)).into_response()
    }
}

impl Error {
    pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
        match self {
            Self::LoginFail => (StatusCode::UNAUTHORIZED, ClientError::LOGIN_FAIL),
            Self::AccountNotActivated => (StatusCode::BAD_REQUEST, ClientError::ACCOUNT_INACTIVE),
            Self::AccountBanned => (StatusCode::FORBIDDEN, ClientError::ACCOUNT_INACTIVE),

            Self::AuthFailTokenWrongFormat
            | Self::AuthFailCtxNotInRequestExt => (StatusCode::UNAUTHORIZED, ClientError::NO_AUTH),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, ClientError::FORBIDDEN),

            Self::InvalidInput { .. } | Self::InvalidCode | Self::MultipartError(_) => {
                (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS)
            }
            Self::InvalidSignature => (StatusCode::BAD_REQUEST, ClientError::INVALID_SIGNATURE),

            Self::UserNotFound { .. }
            | Self::SongNotFound { .. }
            | Self::PlaylistNotFound { .. }
            | Self::GenreNotFound { .. }
            | Self::CommentNotFound { .. }
            | Self::ResourceNotFound { .. } => {
                (StatusCode::NOT_FOUND, ClientError::RESOURCE_NOT_FOUND)
            }

            Self::UserAlreadyExists { .. }
            | Self::SongAlreadyExistsInPlaylist { .. }
            | Self::Conflict { .. } => (StatusCode::CONFLICT, ClientError::CONFLICT),

            Self::LimitExceeded { .. } => (StatusCode::FORBIDDEN, ClientError::PLAN_LIMIT),

            Self::ExternalService { .. } => (StatusCode::BAD_GATEWAY, ClientError::UPSTREAM_ERROR),

            Self::DbError(_)
            | Self::EnvVarError(_)
            | Self::HashError(_)
            | Self::StorageError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ClientError::SERVICE_ERROR,
            ),
        }
    }

    /// Human readable text sent back in the `message` field.
    pub fn client_message(&self) -> String {
        match self {
            Self::LoginFail => "Invalid credentials".to_string(),
            Self::AccountNotActivated => "Account is not activated".to_string(),
            Self::AccountBanned => "Account has been banned".to_string(),
            Self::AuthFailCtxNotInRequestExt => "Unauthorized".to_string(),
            Self::AuthFailTokenWrongFormat => "Invalid or expired token".to_string(),
            Self::Forbidden { reason } => reason.clone(),
            Self::InvalidInput { reason } => reason.clone(),
            Self::InvalidCode => "Invalid or expired code".to_string(),
            Self::InvalidSignature => "Invalid signature".to_string(),
            Self::MultipartError(msg) => format!("Invalid multipart payload: {msg}"),
            Self::UserNotFound { .. } => "User not found".to_string(),
            Self::SongNotFound { .. } => "Song not found".to_string(),
            Self::PlaylistNotFound { .. } => "Playlist not found".to_string(),
            Self::GenreNotFound { .. } => "Genre not found".to_string(),
            Self::CommentNotFound { .. } => "Comment not found".to_string(),
            Self::ResourceNotFound { message } => message.clone(),
            Self::UserAlreadyExists { field } => format!("{field} already exists"),
            Self::SongAlreadyExistsInPlaylist { .. } => {
                "Song already exists in playlist".to_string()
            }
            Self::Conflict { message } => message.clone(),
            Self::LimitExceeded { reason } => reason.clone(),
            Self::ExternalService { service, .. } => format!("{service} request failed"),
            Self::DbError(_) | Self::EnvVarError(_) | Self::HashError(_) | Self::StorageError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

#[derive(Debug, strum_macros::AsRefStr)]
#[allow(non_camel_case_types)]
pub enum ClientError {
    LOGIN_FAIL,
    ACCOUNT_INACTIVE,
    NO_AUTH,
    FORBIDDEN,
    INVALID_PARAMS,
    INVALID_SIGNATURE,
    RESOURCE_NOT_FOUND,
    CONFLICT,
    PLAN_LIMIT,
    UPSTREAM_ERROR,
    SERVICE_ERROR,
}

impl From<surrealdb::Error> for Error {
    fn from(err: surrealdb::Error) -> Self {
        Error::DbError(err.to_string())
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::EnvVarError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        Error::AuthFailTokenWrongFormat
    }
}

impl From<bcrypt::BcryptError> for Error {
    fn from(err: bcrypt::BcryptError) -> Self {
        Error::HashError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "upstream".to_string());
        Error::ExternalService {
            service,
            message: err.to_string(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Error::MultipartError(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let (status, code) = Error::Conflict {
            message: "You are already following this playlist".into(),
        }
        .client_status_and_error();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code.as_ref(), "CONFLICT");

        let (status, _) = Error::SongNotFound { id: "x".into() }.client_status_and_error();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = Error::DbError("boom".into()).client_status_and_error();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = Error::DbError("connection refused at 10.0.0.3".into());
        assert_eq!(err.client_message(), "Internal server error");

        let err = Error::LimitExceeded {
            reason: "You've reached your song limit of 10.".into(),
        };
        assert_eq!(err.client_message(), "You've reached your song limit of 10.");
    }
}
