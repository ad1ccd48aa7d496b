//! Authentication API Endpoints
//! Mission: Registration, login, profile and password management

use crate::{
    api::extract::ValidatedJson,
    auth::{
        middleware::auth_middleware,
        models::{
            Account, AuthContext, AuthResponse, ChangePasswordRequest, ForgotPasswordRequest,
            LoginRequest, MessageResponse, RegisterRequest, ResetPasswordRequest,
            UpdateProfileRequest, UpdateRoleRequest, UserResponse, VerifyResponse,
        },
        AuthState,
    },
    error::ApiError,
    middleware::rate_limit::{rate_limit_middleware, RateLimitLayer},
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use tracing::{info, warn};

const RESET_REQUESTED_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link";

/// Build the `/api/auth` router.
///
/// Credential endpoints that take no token sit behind `limiter`; the rest
/// require a valid bearer token.
pub fn router(state: AuthState, limiter: RateLimitLayer) -> Router {
    let public_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    let protected_routes = Router::new()
        .route("/me", get(get_current_user))
        .route("/verify", get(verify))
        .route("/update-profile", put(update_profile))
        .route("/update-role", put(update_role))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Register - POST /api/auth/register
pub async fn register(
    State(state): State<AuthState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let account = state
        .accounts
        .create(
            &payload.email,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
            payload.role.as_deref(),
        )
        .await?;

    let response = issue_session(&state, &account)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Some(account) = state.accounts.find_by_email(&payload.email).await? else {
        state.accounts.verify_decoy(&payload.password).await?;
        warn!("Failed login attempt: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !state
        .accounts
        .verify_password(&account, &payload.password)
        .await?
    {
        warn!("Failed login attempt for account {}", account.id);
        return Err(ApiError::InvalidCredentials);
    }

    info!("Login successful: {} ({})", account.id, account.role.as_str());
    Ok(Json(issue_session(&state, &account)?))
}

/// Current account - GET /api/auth/me
pub async fn get_current_user(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<UserResponse>, ApiError> {
    let account = load_account(&state, &ctx).await?;
    Ok(Json(UserResponse::from_account(&account)))
}

/// Verify session - GET /api/auth/verify
pub async fn verify(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let account = load_account(&state, &ctx).await?;
    Ok(Json(VerifyResponse {
        user: UserResponse::from_account(&account),
    }))
}

/// Update profile - PUT /api/auth/update-profile
pub async fn update_profile(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let account = state
        .accounts
        .update_profile(
            ctx.account_id,
            &payload.first_name,
            &payload.last_name,
            payload.phone_number.as_deref(),
            payload.avatar.as_deref(),
        )
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse::from_account(&account)))
}

/// Switch between guest and host - PUT /api/auth/update-role
pub async fn update_role(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role = payload.role()?;
    let account = state
        .accounts
        .update_role(ctx.account_id, role)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse::from_account(&account)))
}

/// Fresh token for the current account - POST /api/auth/refresh-token
pub async fn refresh_token(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<AuthResponse>, ApiError> {
    let account = load_account(&state, &ctx).await?;
    Ok(Json(issue_session(&state, &account)?))
}

/// Request a reset token - POST /api/auth/forgot-password
///
/// The response does not depend on whether the email is registered. The
/// token is only echoed back in dev mode (`expose_reset_token`).
pub async fn forgot_password(
    State(state): State<AuthState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = state
        .accounts
        .issue_password_reset_token(&payload.email)
        .await?;

    let mut response = MessageResponse::new(RESET_REQUESTED_MESSAGE);
    if state.expose_reset_token {
        response.reset_token = token;
    }
    Ok(Json(response))
}

/// Change password with the current one - POST /api/auth/change-password
///
/// Earlier tokens stop working; the response carries a fresh one.
pub async fn change_password(
    State(state): State<AuthState>,
    Extension(ctx): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account = load_account(&state, &ctx).await?;

    if !state
        .accounts
        .verify_password(&account, &payload.current_password)
        .await?
    {
        return Err(ApiError::InvalidCredentials);
    }

    let account = state
        .accounts
        .set_password(account.id, &payload.new_password)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let (token, _) = state.jwt_handler.issue(&account)?;

    let mut response = MessageResponse::new("Password has been changed successfully");
    response.token = Some(token);
    Ok(Json(response))
}

/// Complete a reset - POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AuthState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .consume_password_reset_token(&payload.token, &payload.password)
        .await?;

    Ok(Json(MessageResponse::new(
        "Password has been reset successfully",
    )))
}

async fn load_account(state: &AuthState, ctx: &AuthContext) -> Result<Account, ApiError> {
    state
        .accounts
        .find_by_id(ctx.account_id)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

fn issue_session(state: &AuthState, account: &Account) -> Result<AuthResponse, ApiError> {
    let (token, expires_in) = state.jwt_handler.issue(account)?;
    Ok(AuthResponse {
        token,
        expires_in,
        user: UserResponse::from_account(account),
    })
}
