use chrono::{Duration, Utc};
use rand::Rng;
use surrealdb::sql::Datetime;
use surrealdb::{engine::any::Any, Surreal};

use crate::{
    auth::{
        models::{
            CodeActivatePayload, EmailPayload, LoginPayload, LoginResponse, RegisterPayload,
            RegisterResponse, ResetPasswordPayload,
        },
        password_service::{self, ensure_password_policy},
        token_service::{AuthConfig, TokenService, TokenSubject},
    },
    error::{Error, Result},
    helpers::{
        thing_helpers::{create_user_thing, opt_thing_to_id},
        user_helpers::get_user,
    },
    models::user::{Role, UserRecord, UserStatus, UserView},
    services::user_service::{NewUser, UserService},
    validators::user_validator::{ensure_email, ensure_username},
};

/// Lifetime of activation and reset codes.
const CODE_TTL_MINUTES: i64 = 5;

pub struct AuthService;

impl AuthService {
    /// Creates an inactive account and issues its activation code.
    pub async fn register_user(
        db: &Surreal<Any>,
        payload: RegisterPayload,
    ) -> Result<RegisterResponse> {
        let email = ensure_email(&payload.email)?;
        let username = ensure_username(&payload.username)?;
        ensure_password_policy(&payload.password)?;
        UserService::ensure_available(db, &email, &username).await?;

        let (code, expires) = new_code();
        let user = UserService::insert_user(
            db,
            NewUser {
                email,
                username,
                password: payload.password,
                name: payload.name,
                phone: None,
                address: None,
                role: Role::User,
                is_active: false,
                code_id: Some(code.clone()),
                code_expired: Some(expires),
            },
        )
        .await?;

        tracing::info!("Registered user {}", user.username);
        tracing::debug!("Activation code for {}: {}", user.email, code);
        Ok(RegisterResponse {
            id: opt_thing_to_id(&user.id),
            email: user.email,
            username: user.username,
        })
    }

    /// Login with email or username.
    pub async fn login_user(
        db: &Surreal<Any>,
        config: &AuthConfig,
        payload: LoginPayload,
    ) -> Result<LoginResponse> {
        let user = match (&payload.email, &payload.username) {
            (Some(email), _) if !email.trim().is_empty() => {
                Self::find_by_email(db, &email.trim().to_lowercase()).await?
            }
            (_, Some(username)) if !username.trim().is_empty() => {
                let sql = "SELECT * FROM user WHERE username = $username";
                let mut users: Vec<UserRecord> = db
                    .query(sql)
                    .bind(("username", username.trim().to_string()))
                    .await?
                    .take(0)?;
                users.pop()
            }
            _ => {
                return Err(Error::InvalidInput {
                    reason: "Email or username is required".to_string(),
                })
            }
        };

        let user = user.ok_or(Error::LoginFail)?;
        if !password_service::verify_password(&payload.password, &user.password)? {
            return Err(Error::LoginFail);
        }
        if user.status == UserStatus::Banned {
            return Err(Error::AccountBanned);
        }
        if !user.is_active {
            return Err(Error::AccountNotActivated);
        }

        let user_id = user.id.as_ref().ok_or(Error::LoginFail)?;
        let access_token = TokenService::create_token(
            TokenSubject {
                user_id: user_id.id.to_raw(),
                email: user.email.clone(),
                role: user.role.as_ref().to_string(),
                username: user.username.clone(),
            },
            config,
        )?;

        Ok(LoginResponse {
            access_token,
            user: UserView::from(user),
        })
    }

    pub async fn activate_account(db: &Surreal<Any>, payload: CodeActivatePayload) -> Result<()> {
        let user = get_user(db, &payload.id).await?;
        if user.is_active {
            return Err(Error::InvalidInput {
                reason: "Account is already activated".to_string(),
            });
        }
        ensure_code_valid(&user, &payload.code)?;

        db.query("UPDATE $user SET is_active = true, code_id = NONE, code_expired = NONE, updated_at = time::now()")
            .bind(("user", create_user_thing(&payload.id)))
            .await?
            .check()?;
        tracing::info!("Account {} activated", user.username);
        Ok(())
    }

    /// Issues a fresh activation code for an account still waiting for it.
    pub async fn resend_code(db: &Surreal<Any>, payload: EmailPayload) -> Result<RegisterResponse> {
        let user = Self::require_by_email(db, &payload.email).await?;
        if user.is_active {
            return Err(Error::InvalidInput {
                reason: "Account is already activated".to_string(),
            });
        }
        Self::store_code(db, &user).await?;
        Ok(RegisterResponse {
            id: opt_thing_to_id(&user.id),
            email: user.email,
            username: user.username,
        })
    }

    pub async fn forgot_password(db: &Surreal<Any>, payload: EmailPayload) -> Result<()> {
        let user = Self::require_by_email(db, &payload.email).await?;
        Self::store_code(db, &user).await
    }

    pub async fn reset_password(db: &Surreal<Any>, payload: ResetPasswordPayload) -> Result<()> {
        if payload.password != payload.confirm_password {
            return Err(Error::InvalidInput {
                reason: "Passwords do not match".to_string(),
            });
        }
        ensure_password_policy(&payload.password)?;

        let user = Self::require_by_email(db, &payload.email).await?;
        ensure_code_valid(&user, &payload.code)?;

        let hashed = password_service::hash_password(&payload.password)?;
        db.query("UPDATE $user SET password = $password, code_id = NONE, code_expired = NONE, updated_at = time::now()")
            .bind(("user", user.id.clone()))
            .bind(("password", hashed))
            .await?
            .check()?;
        tracing::info!("Password reset for {}", user.username);
        Ok(())
    }

    async fn find_by_email(db: &Surreal<Any>, email: &str) -> Result<Option<UserRecord>> {
        let mut users: Vec<UserRecord> = db
            .query("SELECT * FROM user WHERE email = $email")
            .bind(("email", email.to_string()))
            .await?
            .take(0)?;
        Ok(users.pop())
    }

    async fn require_by_email(db: &Surreal<Any>, email: &str) -> Result<UserRecord> {
        let email = ensure_email(email)?;
        Self::find_by_email(db, &email)
            .await?
            .ok_or(Error::UserNotFound { id: email })
    }

    async fn store_code(db: &Surreal<Any>, user: &UserRecord) -> Result<()> {
        let (code, expires) = new_code();
        db.query("UPDATE $user SET code_id = $code, code_expired = $expires, updated_at = time::now()")
            .bind(("user", user.id.clone()))
            .bind(("code", code.clone()))
            .bind(("expires", expires))
            .await?
            .check()?;
        tracing::debug!("Verification code for {}: {}", user.email, code);
        Ok(())
    }
}

/// Six digit code and its expiry.
fn new_code() -> (String, Datetime) {
    let code = rand::thread_rng().gen_range(100_000..1_000_000).to_string();
    let expires = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
    (code, expires.into())
}

fn ensure_code_valid(user: &UserRecord, code: &str) -> Result<()> {
    let matches = user.code_id.as_deref() == Some(code.trim());
    let fresh = user
        .code_expired
        .as_ref()
        .is_some_and(|expires| Utc::now() < expires.0);
    if matches && fresh {
        Ok(())
    } else {
        Err(Error::InvalidCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_service::test_auth_config;
    use crate::helpers::db_helpers::setup_test_db;

    fn register_payload() -> RegisterPayload {
        RegisterPayload {
            email: "Nia@Example.com".to_string(),
            username: "nia".to_string(),
            password: "secret42".to_string(),
            name: Some("Nia".to_string()),
        }
    }

    fn login_with_username(password: &str) -> LoginPayload {
        LoginPayload {
            email: None,
            username: Some("nia".to_string()),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_verify_login() {
        let db = setup_test_db().await;
        let config = test_auth_config();
        let registered = AuthService::register_user(&db, register_payload()).await.unwrap();
        assert_eq!(registered.email, "nia@example.com");

        let res = AuthService::login_user(&db, &config, login_with_username("secret42")).await;
        assert!(matches!(res, Err(Error::AccountNotActivated)));

        let wrong = AuthService::activate_account(
            &db,
            CodeActivatePayload {
                id: registered.id.clone(),
                code: "000000".to_string(),
            },
        )
        .await;
        assert!(matches!(wrong, Err(Error::InvalidCode)));

        let code = get_user(&db, &registered.id).await.unwrap().code_id.unwrap();
        assert_eq!(code.len(), 6);
        AuthService::activate_account(
            &db,
            CodeActivatePayload {
                id: registered.id.clone(),
                code,
            },
        )
        .await
        .unwrap();

        let login = AuthService::login_user(&db, &config, login_with_username("secret42"))
            .await
            .unwrap();
        let claims = TokenService::validate_token(&login.access_token, &config).unwrap();
        assert_eq!(claims.sub, registered.id);
        assert_eq!(claims.role, "USER");

        let bad = AuthService::login_user(&db, &config, login_with_username("nope-nope")).await;
        assert!(matches!(bad, Err(Error::LoginFail)));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let db = setup_test_db().await;
        AuthService::register_user(&db, register_payload()).await.unwrap();
        let res = AuthService::register_user(&db, register_payload()).await;
        assert!(matches!(res, Err(Error::UserAlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let db = setup_test_db().await;
        let registered = AuthService::register_user(&db, register_payload()).await.unwrap();
        db.query("UPDATE $user SET code_expired = time::now() - 1m")
            .bind(("user", create_user_thing(&registered.id)))
            .await
            .unwrap();

        let code = get_user(&db, &registered.id).await.unwrap().code_id.unwrap();
        let res = AuthService::activate_account(
            &db,
            CodeActivatePayload {
                id: registered.id,
                code,
            },
        )
        .await;
        assert!(matches!(res, Err(Error::InvalidCode)));
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let db = setup_test_db().await;
        let config = test_auth_config();
        let registered = AuthService::register_user(&db, register_payload()).await.unwrap();
        db.query("UPDATE $user SET is_active = true")
            .bind(("user", create_user_thing(&registered.id)))
            .await
            .unwrap();

        AuthService::forgot_password(
            &db,
            EmailPayload {
                email: "nia@example.com".to_string(),
            },
        )
        .await
        .unwrap();
        let code = get_user(&db, &registered.id).await.unwrap().code_id.unwrap();

        let mismatch = AuthService::reset_password(
            &db,
            ResetPasswordPayload {
                email: "nia@example.com".to_string(),
                code: code.clone(),
                password: "newpass1".to_string(),
                confirm_password: "newpass2".to_string(),
            },
        )
        .await;
        assert!(matches!(mismatch, Err(Error::InvalidInput { .. })));

        AuthService::reset_password(
            &db,
            ResetPasswordPayload {
                email: "nia@example.com".to_string(),
                code,
                password: "newpass1".to_string(),
                confirm_password: "newpass1".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(AuthService::login_user(&db, &config, login_with_username("newpass1"))
            .await
            .is_ok());
    }
}
