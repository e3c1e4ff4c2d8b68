//! Rows of the book_authors and book_categories link tables.

use super::{Author, Entity};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookAuthorLink {
    pub book_id: i64,
    pub author_id: i64,
    pub position: i32,
}

impl Entity for BookAuthorLink {
    const TABLE: &'static str = "book_authors";
    const LABEL: &'static str = "book author link";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookCategoryLink {
    pub book_id: i64,
    pub category_id: i64,
}

impl Entity for BookCategoryLink {
    const TABLE: &'static str = "book_categories";
    const LABEL: &'static str = "book category link";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

/// An author of a book together with its place in the byline.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub author: Author,
    pub position: i32,
}
