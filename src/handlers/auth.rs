//! Registration, login and token handling.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, CurrentUser};
use crate::models::{
    ChangePasswordRequest, LoginRequest, MessageResponse, RefreshRequest, TokenResponse, User, UserCreate,
};
use crate::response::{success_one, success_one_ok, SuccessOne};
use crate::service::AccountService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

/// Self-service sign-up. The role is always `customer`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = UserCreate,
    responses(
        (status = 201, body = SuccessOne<User>),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<UserCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.role = None;
    let user = AccountService::create(&state.pool, body).await?;
    Ok(success_one(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses((status = 200, body = SuccessOne<TokenResponse>), (status = 401, body = ErrorBody))
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::authenticate(&state.pool, &body.email(), &body.password).await?;
    tracing::info!(user_id = user.id, "login");
    Ok(success_one_ok(AccountService::token_pair(&state.settings.auth, user)?))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses((status = 200, body = SuccessOne<TokenResponse>), (status = 401, body = ErrorBody))
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = AccountService::refresh(&state.pool, &state.settings.auth, &body.refresh_token).await?;
    Ok(success_one_ok(pair))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses((status = 200, body = SuccessOne<User>), (status = 401, body = ErrorBody))
)]
pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    success_one_ok(user)
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, body = SuccessOne<MessageResponse>),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    AccountService::change_password(&state.pool, &user, &body.current_password, &body.new_password).await?;
    Ok(success_one_ok(MessageResponse::new("password updated")))
}

/// Tokens are stateless; the client discards them.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses((status = 200, body = SuccessOne<MessageResponse>), (status = 401, body = ErrorBody))
)]
pub async fn logout(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    tracing::info!(user_id = user.id, "logout");
    success_one_ok(MessageResponse::new("logged out"))
}
