//! Router assembly: common routes at `/` and `/api`, resources under `/api`, docs, and middleware.

mod api;
mod common;
mod docs;

pub use api::{
    api_routes, auth_routes, author_routes, book_routes, category_routes, publisher_routes, review_routes,
    user_routes,
};
pub use common::common_routes;
pub use docs::{docs_routes, ApiDoc, OPENAPI_PATH};

use crate::config::CorsOrigins;
use crate::state::AppState;
use axum::body::Body;
use axum::http::{HeaderValue, Response};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(values)
        }
    }
}

/// The complete application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api", common_routes(state.clone()).merge(api_routes(state)))
        .merge(docs_routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .map_response(|res: Response<_>| res.map(Body::new))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origins_are_skipped() {
        let origins = CorsOrigins::List(vec!["http://localhost:3000".into(), "bad\norigin".into()]);
        // Builds without panicking; the bad entry is dropped.
        let _ = cors_layer(&origins);
    }
}
