//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(label: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {}", label, id))
    }

    /// Status code and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => db_status(e),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Constraint violations are client errors; everything else from the driver is ours.
fn db_status(e: &sqlx::Error) -> (StatusCode, &'static str) {
    if let sqlx::Error::RowNotFound = e {
        return (StatusCode::NOT_FOUND, "not_found");
    }
    e.as_database_error()
        .and_then(|db| db.code())
        .and_then(|code| sqlstate_status(&code))
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "database_error"))
}

/// SQLSTATE codes caused by the request's data rather than by the server.
fn sqlstate_status(code: &str) -> Option<(StatusCode, &'static str)> {
    match code {
        "23505" => Some((StatusCode::CONFLICT, "conflict")),
        "23503" => Some((StatusCode::BAD_REQUEST, "foreign_key_violation")),
        "23514" => Some((StatusCode::BAD_REQUEST, "check_violation")),
        // string too long, numeric overflow, bad text representation, bad or overflowing datetime
        "22001" | "22003" | "22P02" | "22007" | "22008" => Some((StatusCode::BAD_REQUEST, "invalid_value")),
        _ => None,
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status() {
        assert_eq!(
            AppError::not_found("book", 3).status_and_code(),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            AppError::Validation("x".into()).status_and_code().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Conflict("x".into()).status_and_code().0, StatusCode::CONFLICT);
        assert_eq!(
            AppError::Unauthorized("x".into()).status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("x".into()).status_and_code().0, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Db(sqlx::Error::RowNotFound).status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Db(sqlx::Error::PoolTimedOut).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
        );
    }

    #[test]
    fn data_errors_from_postgres_are_client_errors() {
        for code in ["22001", "22003", "22P02"] {
            assert_eq!(sqlstate_status(code), Some((StatusCode::BAD_REQUEST, "invalid_value")), "{}", code);
        }
        assert_eq!(sqlstate_status("23505"), Some((StatusCode::CONFLICT, "conflict")));
        assert_eq!(sqlstate_status("40P01"), None);
    }

    #[test]
    fn not_found_message_names_the_resource() {
        assert_eq!(AppError::not_found("author", 42).to_string(), "not found: author 42");
    }
}
