//! Author handlers: list, read, create, update, deactivate, and the author's books.

use super::{ListQuery, PageQuery};
use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::models::{page, Author, AuthorCreate, AuthorUpdate, Book};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::CrudService;
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

#[utoipa::path(
    get,
    path = "/api/authors",
    tag = "authors",
    params(ListQuery),
    responses(
        (status = 200, body = SuccessMany<Author>),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let mut conditions = Vec::new();
    if q.active_only.unwrap_or(true) {
        conditions.push(Condition::Eq("is_active", true.into()));
    }
    let rows: Vec<Author> = CrudService::list(&state.pool, &conditions, &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Author>), (status = 404, body = ErrorBody))
)]
pub async fn get_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author = CrudService::get::<Author>(&state.pool, id).await?;
    Ok(success_one_ok(author))
}

#[utoipa::path(
    post,
    path = "/api/authors",
    tag = "authors",
    request_body = AuthorCreate,
    responses((status = 201, body = SuccessOne<Author>), (status = 422, body = ErrorBody))
)]
pub async fn create_author(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AuthorCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    let author: Author = CrudService::create(&state.pool, &body.into_fields()).await?;
    tracing::info!(author_id = author.id, "author created");
    Ok(success_one(author))
}

#[utoipa::path(
    patch,
    path = "/api/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path)),
    request_body = AuthorUpdate,
    responses(
        (status = 200, body = SuccessOne<Author>),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<AuthorUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    let author = CrudService::update::<Author>(&state.pool, id, &patch.into_fields()).await?;
    Ok(success_one_ok(author))
}

/// Soft delete: the author is deactivated.
#[utoipa::path(
    delete,
    path = "/api/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<Author>(&state.pool, id).await?;
    tracing::info!(author_id = id, "author deactivated");
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/authors/{id}/books",
    tag = "authors",
    params(("id" = i64, Path), PageQuery),
    responses((status = 200, body = SuccessMany<Book>), (status = 404, body = ErrorBody))
)]
pub async fn author_books(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    CrudService::ensure_exists::<Author>(&state.pool, id).await?;
    let books: Vec<Book> = CrudService::list(
        &state.pool,
        &[
            Condition::Eq("is_active", true.into()),
            Condition::InLinked {
                column: "id",
                table: "book_authors",
                select_column: "book_id",
                where_column: "author_id",
                value: id.into(),
            },
        ],
        &[OrderBy::asc("id")],
        Some(page),
    )
    .await?;
    Ok(success_many(books))
}
