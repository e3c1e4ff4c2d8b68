//! Publisher handlers. Names are unique.

use super::{ListQuery, PageQuery};
use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::models::{page, Book, Publisher, PublisherCreate, PublisherUpdate};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::CrudService;
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use sqlx::PgPool;

async fn ensure_name_free(pool: &PgPool, name: &str, except: Option<i64>) -> Result<(), AppError> {
    let mut conditions = vec![Condition::Eq("name", name.trim().into())];
    if let Some(id) = except {
        conditions.push(Condition::Ne("id", id.into()));
    }
    if CrudService::exists::<Publisher>(pool, &conditions).await? {
        return Err(AppError::Conflict(format!("a publisher named '{}' already exists", name.trim())));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/publishers",
    tag = "publishers",
    params(ListQuery),
    responses((status = 200, body = SuccessMany<Publisher>), (status = 422, body = ErrorBody))
)]
pub async fn list_publishers(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let mut conditions = Vec::new();
    if q.active_only.unwrap_or(true) {
        conditions.push(Condition::Eq("is_active", true.into()));
    }
    let rows: Vec<Publisher> = CrudService::list(&state.pool, &conditions, &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/publishers/{id}",
    tag = "publishers",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Publisher>), (status = 404, body = ErrorBody))
)]
pub async fn get_publisher(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CrudService::get::<Publisher>(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/publishers",
    tag = "publishers",
    request_body = PublisherCreate,
    responses(
        (status = 201, body = SuccessOne<Publisher>),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_publisher(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PublisherCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    ensure_name_free(&state.pool, &body.name, None).await?;
    let publisher: Publisher = CrudService::create(&state.pool, &body.into_fields()).await?;
    tracing::info!(publisher_id = publisher.id, "publisher created");
    Ok(success_one(publisher))
}

#[utoipa::path(
    patch,
    path = "/api/publishers/{id}",
    tag = "publishers",
    params(("id" = i64, Path)),
    request_body = PublisherUpdate,
    responses(
        (status = 200, body = SuccessOne<Publisher>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn update_publisher(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<PublisherUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    CrudService::ensure_exists::<Publisher>(&state.pool, id).await?;
    if let Some(name) = patch.name.as_deref() {
        ensure_name_free(&state.pool, name, Some(id)).await?;
    }
    let publisher = CrudService::update::<Publisher>(&state.pool, id, &patch.into_fields()).await?;
    Ok(success_one_ok(publisher))
}

#[utoipa::path(
    delete,
    path = "/api/publishers/{id}",
    tag = "publishers",
    params(("id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_publisher(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<Publisher>(&state.pool, id).await?;
    tracing::info!(publisher_id = id, "publisher deactivated");
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/publishers/{id}/books",
    tag = "publishers",
    params(("id" = i64, Path), PageQuery),
    responses((status = 200, body = SuccessMany<Book>), (status = 404, body = ErrorBody))
)]
pub async fn publisher_books(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    CrudService::ensure_exists::<Publisher>(&state.pool, id).await?;
    let books: Vec<Book> = CrudService::list(
        &state.pool,
        &[
            Condition::Eq("is_active", true.into()),
            Condition::Eq("publisher_id", id.into()),
        ],
        &[OrderBy::asc("id")],
        Some(page),
    )
    .await?;
    Ok(success_many(books))
}
