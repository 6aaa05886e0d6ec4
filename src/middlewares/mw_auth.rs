use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::auth::token_service::TokenService;
use crate::error::{Error, Result};
use crate::helpers::thing_helpers::create_user_thing;
use crate::models::user::{Role, UserRecord, UserStatus};
use crate::AppState;

/// Authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ctx {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub username: String,
}

impl Ctx {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the resource, or an admin.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

/// Caller with the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminCtx(pub Ctx);

/// Resolves the optional bearer token into a `Ctx` request extension.
/// Requests without a valid token pass through untouched; handlers decide
/// whether they need a caller through the `Ctx` / `AdminCtx` extractors.
pub async fn mw_ctx_resolver(
    State(app_state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|str| str.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        match resolve_ctx(&app_state, &token).await {
            Ok(ctx) => {
                req.extensions_mut().insert(ctx);
            }
            Err(err) => tracing::debug!("Bearer token rejected: {:?}", err),
        }
    }

    next.run(req).await
}

async fn resolve_ctx(app_state: &AppState, token: &str) -> Result<Ctx> {
    let claims = TokenService::validate_token(token, &app_state.config.auth)?;

    let user: Option<UserRecord> = app_state
        .db
        .query("SELECT * FROM $user_thing")
        .bind(("user_thing", create_user_thing(&claims.sub)))
        .await?
        .take(0)?;
    let user = user.ok_or(Error::UserNotFound {
        id: claims.sub.clone(),
    })?;

    if user.status == UserStatus::Banned {
        return Err(Error::AccountBanned);
    }

    Ok(Ctx {
        user_id: claims.sub,
        email: user.email,
        role: user.role,
        username: user.username,
    })
}

impl<S: Send + Sync> FromRequestParts<S> for Ctx {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthFailCtxNotInRequestExt)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Ctx {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> core::result::Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Ctx>().cloned())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AdminCtx {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let ctx = <Ctx as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !ctx.is_admin() {
            return Err(Error::Forbidden {
                reason: "Admin role required".to_string(),
            });
        }
        Ok(AdminCtx(ctx))
    }
}
