//! Common routes: welcome, health, readiness, version, table check.

use crate::error::AppError;
use crate::migration::list_tables;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct TablesBody {
    tables: Vec<String>,
    count: usize,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the bookstore API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs"
    }))
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
    })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    match sqlx::query("SELECT 1").fetch_optional(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyBody {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyBody {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn check_tables(State(state): State<AppState>) -> Result<Json<TablesBody>, AppError> {
    let tables = list_tables(&state.pool).await?;
    Ok(Json(TablesBody {
        count: tables.len(),
        tables,
    }))
}

/// GET /, /health, /ready, /version, /check-tables.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .route("/check-tables", get(check_tables))
        .with_state(state)
}
