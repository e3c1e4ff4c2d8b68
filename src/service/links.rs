//! Book-author and book-category links.

use crate::error::AppError;
use crate::models::{Author, Book, BookAuthor, BookAuthorLink, BookCategoryLink, Category};
use crate::service::CrudService;
use crate::sql::{Condition, OrderBy};
use sqlx::PgPool;

pub struct LinkService;

impl LinkService {
    /// Attach an author to a book at `position` (1-based byline order).
    pub async fn link_author(pool: &PgPool, book_id: i64, author_id: i64, position: i32) -> Result<BookAuthorLink, AppError> {
        if position < 1 {
            return Err(AppError::Validation("position must be at least 1".into()));
        }
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        CrudService::ensure_exists::<Author>(pool, author_id).await?;
        let key = [
            Condition::Eq("book_id", book_id.into()),
            Condition::Eq("author_id", author_id.into()),
        ];
        if CrudService::exists::<BookAuthorLink>(pool, &key).await? {
            return Err(AppError::Conflict(format!("author {} is already linked to book {}", author_id, book_id)));
        }
        CrudService::create(
            pool,
            &[
                ("book_id", book_id.into()),
                ("author_id", author_id.into()),
                ("position", position.into()),
            ],
        )
        .await
    }

    pub async fn unlink_author(pool: &PgPool, book_id: i64, author_id: i64) -> Result<(), AppError> {
        let removed = CrudService::delete_where::<BookAuthorLink>(
            pool,
            &[
                Condition::Eq("book_id", book_id.into()),
                Condition::Eq("author_id", author_id.into()),
            ],
        )
        .await?;
        if removed.is_empty() {
            return Err(AppError::NotFound(format!("author {} is not linked to book {}", author_id, book_id)));
        }
        Ok(())
    }

    /// Authors of a book in byline order.
    pub async fn authors_of(pool: &PgPool, book_id: i64) -> Result<Vec<BookAuthor>, AppError> {
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        let sql = "SELECT a.*, ba.\"position\" FROM \"authors\" a \
                   JOIN \"book_authors\" ba ON ba.\"author_id\" = a.\"id\" \
                   WHERE ba.\"book_id\" = $1 ORDER BY ba.\"position\", a.\"id\"";
        tracing::debug!(sql = %sql, book_id, "query");
        Ok(sqlx::query_as::<_, BookAuthor>(sql).bind(book_id).fetch_all(pool).await?)
    }

    pub async fn link_category(pool: &PgPool, book_id: i64, category_id: i64) -> Result<BookCategoryLink, AppError> {
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        CrudService::ensure_exists::<Category>(pool, category_id).await?;
        let key = [
            Condition::Eq("book_id", book_id.into()),
            Condition::Eq("category_id", category_id.into()),
        ];
        if CrudService::exists::<BookCategoryLink>(pool, &key).await? {
            return Err(AppError::Conflict(format!(
                "category {} is already linked to book {}",
                category_id, book_id
            )));
        }
        CrudService::create(pool, &[("book_id", book_id.into()), ("category_id", category_id.into())]).await
    }

    pub async fn unlink_category(pool: &PgPool, book_id: i64, category_id: i64) -> Result<(), AppError> {
        let removed = CrudService::delete_where::<BookCategoryLink>(
            pool,
            &[
                Condition::Eq("book_id", book_id.into()),
                Condition::Eq("category_id", category_id.into()),
            ],
        )
        .await?;
        if removed.is_empty() {
            return Err(AppError::NotFound(format!(
                "category {} is not linked to book {}",
                category_id, book_id
            )));
        }
        Ok(())
    }

    pub async fn categories_of(pool: &PgPool, book_id: i64) -> Result<Vec<Category>, AppError> {
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        CrudService::list(
            pool,
            &[Condition::InLinked {
                column: "id",
                table: "book_categories",
                select_column: "category_id",
                where_column: "book_id",
                value: book_id.into(),
            }],
            &[OrderBy::asc("display_order"), OrderBy::asc("name")],
            None,
        )
        .await
    }
}
