//! Category handlers. Categories nest through `parent_id`; names are unique.

use super::PageQuery;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::models::{page, Book, Category, CategoryCreate, CategoryUpdate};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::CrudService;
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashSet;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub active_only: Option<bool>,
    /// Only direct children of this category.
    pub parent_id: Option<i64>,
}

const CATEGORY_ORDER: [OrderBy; 2] = [OrderBy::asc("display_order"), OrderBy::asc("name")];

async fn ensure_name_free(pool: &PgPool, name: &str, except: Option<i64>) -> Result<(), AppError> {
    let mut conditions = vec![Condition::Eq("name", name.trim().into())];
    if let Some(id) = except {
        conditions.push(Condition::Ne("id", id.into()));
    }
    if CrudService::exists::<Category>(pool, &conditions).await? {
        return Err(AppError::Conflict(format!("a category named '{}' already exists", name.trim())));
    }
    Ok(())
}

/// The parent must exist, and for an existing category it must not be the
/// category itself or one of its descendants.
async fn ensure_valid_parent(pool: &PgPool, parent_id: i64, category_id: Option<i64>) -> Result<(), AppError> {
    if category_id == Some(parent_id) {
        return Err(AppError::BadRequest("a category cannot be its own parent".into()));
    }
    let mut seen = HashSet::new();
    let mut cursor = Some(parent_id);
    while let Some(id) = cursor {
        if !seen.insert(id) {
            break;
        }
        let Some(ancestor) = CrudService::read::<Category>(pool, id).await? else {
            if id == parent_id {
                return Err(AppError::BadRequest(format!("parent category {} does not exist", parent_id)));
            }
            break;
        };
        if category_id.is_some() && ancestor.parent_id == category_id {
            return Err(AppError::BadRequest(
                "a category cannot be moved under one of its own subcategories".into(),
            ));
        }
        cursor = ancestor.parent_id;
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    params(CategoryListQuery),
    responses((status = 200, body = SuccessMany<Category>), (status = 422, body = ErrorBody))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CategoryListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let mut conditions = Vec::new();
    if q.active_only.unwrap_or(true) {
        conditions.push(Condition::Eq("is_active", true.into()));
    }
    if let Some(parent_id) = q.parent_id {
        conditions.push(Condition::Eq("parent_id", parent_id.into()));
    }
    let rows: Vec<Category> = CrudService::list(&state.pool, &conditions, &CATEGORY_ORDER, Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Category>), (status = 404, body = ErrorBody))
)]
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CrudService::get::<Category>(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = CategoryCreate,
    responses(
        (status = 201, body = SuccessOne<Category>),
        (status = 400, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CategoryCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    ensure_name_free(&state.pool, &body.name, None).await?;
    if let Some(parent_id) = body.parent_id {
        ensure_valid_parent(&state.pool, parent_id, None).await?;
    }
    let category: Category = CrudService::create(&state.pool, &body.into_fields()).await?;
    tracing::info!(category_id = category.id, "category created");
    Ok(success_one(category))
}

#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path)),
    request_body = CategoryUpdate,
    responses(
        (status = 200, body = SuccessOne<Category>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CategoryUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    CrudService::ensure_exists::<Category>(&state.pool, id).await?;
    if let Some(name) = patch.name.as_deref() {
        ensure_name_free(&state.pool, name, Some(id)).await?;
    }
    if let Some(parent_id) = patch.parent_id {
        ensure_valid_parent(&state.pool, parent_id, Some(id)).await?;
    }
    let category = CrudService::update::<Category>(&state.pool, id, &patch.into_fields()).await?;
    Ok(success_one_ok(category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<Category>(&state.pool, id).await?;
    tracing::info!(category_id = id, "category deactivated");
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/books",
    tag = "categories",
    params(("id" = i64, Path), PageQuery),
    responses((status = 200, body = SuccessMany<Book>), (status = 404, body = ErrorBody))
)]
pub async fn category_books(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    CrudService::ensure_exists::<Category>(&state.pool, id).await?;
    let books: Vec<Book> = CrudService::list(
        &state.pool,
        &[
            Condition::Eq("is_active", true.into()),
            Condition::InLinked {
                column: "id",
                table: "book_categories",
                select_column: "book_id",
                where_column: "category_id",
                value: id.into(),
            },
        ],
        &[OrderBy::asc("id")],
        Some(page),
    )
    .await?;
    Ok(success_many(books))
}
