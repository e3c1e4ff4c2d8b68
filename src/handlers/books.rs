//! Book handlers, including the author and category links of a book.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    page, Book, BookAuthor, BookAuthorLink, BookCategoryLink, BookCreate, BookUpdate, Category, Publisher,
};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::{CrudService, LinkService};
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::IntoParams;

const SEARCH_COLUMNS: &[&str] = &["title", "isbn", "description"];

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Only active books (default true).
    pub active_only: Option<bool>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub publisher_id: Option<i64>,
    pub featured: Option<bool>,
    pub bestseller: Option<bool>,
    pub new_books: Option<bool>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    /// true: stock > 0; false: stock = 0.
    pub in_stock: Option<bool>,
    /// Case-insensitive match on title, ISBN or description.
    pub search: Option<String>,
}

impl BookListQuery {
    fn conditions(&self) -> Result<Vec<Condition>, AppError> {
        for (name, value) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(AppError::Validation(format!("{} must not be negative", name)));
            }
        }
        let mut c = Vec::new();
        if self.active_only.unwrap_or(true) {
            c.push(Condition::Eq("is_active", true.into()));
        }
        if let Some(id) = self.category_id {
            c.push(Condition::InLinked {
                column: "id",
                table: "book_categories",
                select_column: "book_id",
                where_column: "category_id",
                value: id.into(),
            });
        }
        if let Some(id) = self.author_id {
            c.push(Condition::InLinked {
                column: "id",
                table: "book_authors",
                select_column: "book_id",
                where_column: "author_id",
                value: id.into(),
            });
        }
        if let Some(id) = self.publisher_id {
            c.push(Condition::Eq("publisher_id", id.into()));
        }
        if let Some(v) = self.featured {
            c.push(Condition::Eq("is_featured", v.into()));
        }
        if let Some(v) = self.bestseller {
            c.push(Condition::Eq("is_bestseller", v.into()));
        }
        if let Some(v) = self.new_books {
            c.push(Condition::Eq("is_new", v.into()));
        }
        if let Some(v) = self.min_price {
            c.push(Condition::Gte("price", v.into()));
        }
        if let Some(v) = self.max_price {
            c.push(Condition::Lte("price", v.into()));
        }
        match self.in_stock {
            Some(true) => c.push(Condition::Gt("stock", 0i32.into())),
            Some(false) => c.push(Condition::Eq("stock", 0i32.into())),
            None => {}
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            c.push(Condition::Search(SEARCH_COLUMNS, term.to_string()));
        }
        Ok(c)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PositionQuery {
    /// Place in the byline, starting at 1 (default 1).
    pub position: Option<i32>,
}

async fn ensure_publisher(pool: &PgPool, publisher_id: Option<i64>) -> Result<(), AppError> {
    let Some(id) = publisher_id else {
        return Ok(());
    };
    if CrudService::exists::<Publisher>(pool, &[Condition::Eq("id", id.into())]).await? {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("publisher {} does not exist", id)))
    }
}

#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    params(BookListQuery),
    responses((status = 200, body = SuccessMany<Book>), (status = 422, body = ErrorBody))
)]
pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<BookListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let conditions = q.conditions()?;
    let rows: Vec<Book> = CrudService::list(&state.pool, &conditions, &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Book>), (status = 404, body = ErrorBody))
)]
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CrudService::get::<Book>(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = BookCreate,
    responses(
        (status = 201, body = SuccessOne<Book>),
        (status = 400, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BookCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    ensure_publisher(&state.pool, body.publisher_id).await?;
    let book: Book = CrudService::create(&state.pool, &body.into_fields()).await?;
    tracing::info!(book_id = book.id, title = %book.title, "book created");
    Ok(success_one(book))
}

#[utoipa::path(
    patch,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = i64, Path)),
    request_body = BookUpdate,
    responses(
        (status = 200, body = SuccessOne<Book>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<BookUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    CrudService::ensure_exists::<Book>(&state.pool, id).await?;
    ensure_publisher(&state.pool, patch.publisher_id).await?;
    let book = CrudService::update::<Book>(&state.pool, id, &patch.into_fields()).await?;
    Ok(success_one_ok(book))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<Book>(&state.pool, id).await?;
    tracing::info!(book_id = id, "book deactivated");
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/books/{id}/authors",
    tag = "books",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessMany<BookAuthor>), (status = 404, body = ErrorBody))
)]
pub async fn book_authors(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(LinkService::authors_of(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/books/{id}/authors/{author_id}",
    tag = "books",
    params(("id" = i64, Path), ("author_id" = i64, Path), PositionQuery),
    responses(
        (status = 201, body = SuccessOne<BookAuthorLink>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn add_book_author(
    State(state): State<AppState>,
    ApiPath((id, author_id)): ApiPath<(i64, i64)>,
    ApiQuery(q): ApiQuery<PositionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let link = LinkService::link_author(&state.pool, id, author_id, q.position.unwrap_or(1)).await?;
    tracing::info!(book_id = id, author_id, position = link.position, "author linked");
    Ok(success_one(link))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}/authors/{author_id}",
    tag = "books",
    params(("id" = i64, Path), ("author_id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn remove_book_author(
    State(state): State<AppState>,
    ApiPath((id, author_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    LinkService::unlink_author(&state.pool, id, author_id).await?;
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/books/{id}/categories",
    tag = "books",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessMany<Category>), (status = 404, body = ErrorBody))
)]
pub async fn book_categories(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(LinkService::categories_of(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/books/{id}/categories/{category_id}",
    tag = "books",
    params(("id" = i64, Path), ("category_id" = i64, Path)),
    responses(
        (status = 201, body = SuccessOne<BookCategoryLink>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn add_book_category(
    State(state): State<AppState>,
    ApiPath((id, category_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let link = LinkService::link_category(&state.pool, id, category_id).await?;
    tracing::info!(book_id = id, category_id, "category linked");
    Ok(success_one(link))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}/categories/{category_id}",
    tag = "books",
    params(("id" = i64, Path), ("category_id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn remove_book_category(
    State(state): State<AppState>,
    ApiPath((id, category_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    LinkService::unlink_category(&state.pool, id, category_id).await?;
    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_lists_active_books_only() {
        let c = BookListQuery::default().conditions().unwrap();
        assert_eq!(c.len(), 1);
        assert!(matches!(&c[0], Condition::Eq("is_active", _)));
    }

    #[test]
    fn out_of_stock_filter_matches_zero_stock() {
        let q = BookListQuery {
            active_only: Some(false),
            in_stock: Some(false),
            ..Default::default()
        };
        let c = q.conditions().unwrap();
        assert!(matches!(&c[..], [Condition::Eq("stock", _)]));
    }

    #[test]
    fn blank_search_is_ignored_and_negative_price_rejected() {
        let q = BookListQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.conditions().unwrap().len(), 1);

        let q = BookListQuery {
            min_price: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(matches!(q.conditions(), Err(AppError::Validation(_))));
    }

    #[test]
    fn link_filters_use_link_tables() {
        let q = BookListQuery {
            author_id: Some(3),
            category_id: Some(4),
            ..Default::default()
        };
        let c = q.conditions().unwrap();
        assert!(c.iter().any(|c| matches!(c, Condition::InLinked { table: "book_authors", .. })));
        assert!(c.iter().any(|c| matches!(c, Condition::InLinked { table: "book_categories", .. })));
    }
}
