//! Resolve the signed-in user from `Authorization: Bearer <access token>`.

use crate::auth::{verify_token, TokenKind};
use crate::error::AppError;
use crate::models::User;
use crate::service::{AccountService, CrudService};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

/// The bearer token from the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// An active user holding a valid access token. Each use stamps `last_active_at`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| AppError::Unauthorized("not authenticated".into()))?;
        let user_id = verify_token(&state.settings.auth, token, TokenKind::Access)?;
        let user = CrudService::read::<User>(&state.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
        if !user.is_active {
            return Err(AppError::Unauthorized("user is inactive".into()));
        }
        let user = match AccountService::touch_last_active(&state.pool, user.id).await {
            Ok(touched) => touched,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "could not record activity");
                user
            }
        };
        Ok(CurrentUser(user))
    }
}

/// A signed-in admin or staff member.
#[derive(Clone, Debug)]
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AppError::Forbidden("administrator permissions required".into()));
        }
        Ok(StaffUser(user))
    }
}
