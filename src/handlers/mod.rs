//! HTTP handlers, one module per resource.

pub mod auth;
pub mod authors;
pub mod books;
pub mod categories;
pub mod orders;
pub mod promotions;
pub mod publishers;
pub mod reviews;
pub mod users;
pub mod wishlist;

use serde::Deserialize;
use utoipa::IntoParams;

/// `skip` / `limit` / `active_only`, shared by the simple list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Rows to skip (>= 0).
    pub skip: Option<i64>,
    /// Page size, 1 to 100 (default 100).
    pub limit: Option<i64>,
    /// Only active rows.
    pub active_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}
