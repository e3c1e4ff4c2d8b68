//! User administration. Staff manage every account; other users only see and edit their own.

use super::ListQuery;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, StaffUser};
use crate::models::{page, User, UserCreate, UserUpdate};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::{AccountService, CrudService};
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

fn ensure_self_or_staff(caller: &User, id: i64) -> Result<(), AppError> {
    if caller.id == id || caller.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("not enough permissions".into()))
    }
}

/// All users by default; `active_only=true` hides deactivated accounts.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, body = SuccessMany<User>),
        (status = 401, body = ErrorBody),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let mut conditions = Vec::new();
    if q.active_only.unwrap_or(false) {
        conditions.push(Condition::Eq("is_active", true.into()));
    }
    let rows: Vec<User> = CrudService::list(&state.pool, &conditions, &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UserCreate,
    responses(
        (status = 201, body = SuccessOne<User>),
        (status = 403, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiJson(body): ApiJson<UserCreate>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::create(&state.pool, body).await?;
    tracing::info!(user_id = user.id, created_by = staff.id, "user created by staff");
    Ok(success_one(user))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses(
        (status = 200, body = SuccessOne<User>),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self_or_staff(&caller, id)?;
    Ok(success_one_ok(CrudService::get::<User>(&state.pool, id).await?))
}

/// Role and active flag can only be changed by staff.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    request_body = UserUpdate,
    responses(
        (status = 200, body = SuccessOne<User>),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UserUpdate>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self_or_staff(&caller, id)?;
    if patch.is_privileged() && !caller.role.is_staff() {
        return Err(AppError::Forbidden("only staff can change role or active status".into()));
    }
    Ok(success_one_ok(AccountService::update(&state.pool, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses((status = 204), (status = 403, body = ErrorBody), (status = 404, body = ErrorBody))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<User>(&state.pool, id).await?;
    tracing::info!(user_id = id, deactivated_by = staff.id, "user deactivated");
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/users/email/{email}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("email" = String, Path)),
    responses((status = 200, body = SuccessOne<User>), (status = 404, body = ErrorBody))
)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(email): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::not_found("user", &email))?;
    Ok(success_one_ok(user))
}
