use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::models::{
        CodeActivatePayload, EmailPayload, LoginPayload, LoginResponse, RegisterPayload,
        RegisterResponse, ResetPasswordPayload,
    },
    middlewares::mw_auth::Ctx,
    models::database_helpers::ApiResponse,
    services::auth_service::AuthService,
    AppState, Result,
};

pub struct AuthController;

impl AuthController {
    pub async fn register(
        State(state): State<AppState>,
        Json(payload): Json<RegisterPayload>,
    ) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
        let user = AuthService::register_user(&state.db, payload).await?;
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message(
                "Registration successful, check your email for the activation code",
                user,
            )),
        ))
    }

    pub async fn login(
        State(state): State<AppState>,
        Json(payload): Json<LoginPayload>,
    ) -> Result<Json<ApiResponse<LoginResponse>>> {
        let res = AuthService::login_user(&state.db, &state.config.auth, payload).await?;
        Ok(Json(ApiResponse::ok(res)))
    }

    pub async fn verify(
        State(state): State<AppState>,
        Json(payload): Json<CodeActivatePayload>,
    ) -> Result<Json<ApiResponse<()>>> {
        AuthService::activate_account(&state.db, payload).await?;
        Ok(Json(ApiResponse::with_message("Account activated successfully", ())))
    }

    pub async fn resend_verify(
        State(state): State<AppState>,
        Json(payload): Json<EmailPayload>,
    ) -> Result<Json<ApiResponse<RegisterResponse>>> {
        let user = AuthService::resend_code(&state.db, payload).await?;
        Ok(Json(ApiResponse::with_message("Activation code sent", user)))
    }

    pub async fn forgot_password(
        State(state): State<AppState>,
        Json(payload): Json<EmailPayload>,
    ) -> Result<Json<ApiResponse<()>>> {
        AuthService::forgot_password(&state.db, payload).await?;
        Ok(Json(ApiResponse::with_message("Password reset code sent", ())))
    }

    pub async fn reset_password(
        State(state): State<AppState>,
        Json(payload): Json<ResetPasswordPayload>,
    ) -> Result<Json<ApiResponse<()>>> {
        AuthService::reset_password(&state.db, payload).await?;
        Ok(Json(ApiResponse::with_message("Password has been reset", ())))
    }

    pub async fn profile(ctx: Ctx) -> Json<ApiResponse<Ctx>> {
        Json(ApiResponse::ok(ctx))
    }
}
