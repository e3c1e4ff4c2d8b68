//! The signed-in user's wishlist.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::models::{Book, WishlistAdd, WishlistCheck, WishlistItem};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::CrudService;
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

fn entry(user_id: i64, book_id: i64) -> [Condition; 2] {
    [
        Condition::Eq("user_id", user_id.into()),
        Condition::Eq("book_id", book_id.into()),
    ]
}

#[utoipa::path(
    get,
    path = "/api/reviews/wishlist",
    tag = "wishlist",
    security(("bearer_auth" = [])),
    responses((status = 200, body = SuccessMany<WishlistItem>), (status = 401, body = ErrorBody))
)]
pub async fn list_wishlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let items: Vec<WishlistItem> = CrudService::list(
        &state.pool,
        &[Condition::Eq("user_id", user.id.into())],
        &[OrderBy::desc("added_at"), OrderBy::desc("id")],
        None,
    )
    .await?;
    Ok(success_many(items))
}

#[utoipa::path(
    post,
    path = "/api/reviews/wishlist",
    tag = "wishlist",
    security(("bearer_auth" = [])),
    request_body = WishlistAdd,
    responses(
        (status = 201, body = SuccessOne<WishlistItem>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<WishlistAdd>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::ensure_exists::<Book>(&state.pool, body.book_id).await?;
    if CrudService::exists::<WishlistItem>(&state.pool, &entry(user.id, body.book_id)).await? {
        return Err(AppError::Conflict("book is already in your wishlist".into()));
    }
    let item: WishlistItem = CrudService::create(
        &state.pool,
        &[("user_id", user.id.into()), ("book_id", body.book_id.into())],
    )
    .await?;
    Ok(success_one(item))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/wishlist/{book_id}",
    tag = "wishlist",
    security(("bearer_auth" = [])),
    params(("book_id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let removed = CrudService::delete_where::<WishlistItem>(&state.pool, &entry(user.id, book_id)).await?;
    if removed.is_empty() {
        return Err(AppError::NotFound(format!("book {} is not in your wishlist", book_id)));
    }
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/reviews/wishlist/check/{book_id}",
    tag = "wishlist",
    security(("bearer_auth" = [])),
    params(("book_id" = i64, Path)),
    responses((status = 200, body = SuccessOne<WishlistCheck>), (status = 401, body = ErrorBody))
)]
pub async fn check_wishlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let in_wishlist = CrudService::exists::<WishlistItem>(&state.pool, &entry(user.id, book_id)).await?;
    Ok(success_one_ok(WishlistCheck { book_id, in_wishlist }))
}
