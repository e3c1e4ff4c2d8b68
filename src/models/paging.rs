use crate::error::AppError;
use crate::sql::Page;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 100;

/// `skip` >= 0, `limit` in 1..=100 (default 100).
pub fn page(skip: Option<i64>, limit: Option<i64>) -> Result<Page, AppError> {
    let offset = skip.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::Validation("skip must be greater than or equal to 0".into()));
    }
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!("limit must be between 1 and {}", MAX_LIMIT)));
    }
    Ok(Page { offset, limit })
}
