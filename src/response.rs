//! Success envelopes: `{"data": ...}` for one resource, `{"data": [...], "meta": {"count": n}}` for lists.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

/// Number of items in this page, not the total matching rows.
#[derive(Serialize, ToSchema)]
pub struct MetaCount {
    pub count: u64,
}

fn one<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (status, Json(SuccessOne { data }))
}

/// 201 Created.
pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    one(StatusCode::CREATED, data)
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    one(StatusCode::OK, data)
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount {
        count: data.len() as u64,
    };
    (StatusCode::OK, Json(SuccessMany { data, meta }))
}

/// 204 with an empty body, for deletes.
pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_envelope_counts_items() {
        let (status, Json(body)) = success_many(vec![1, 2, 3]);
        assert_eq!(status, StatusCode::OK);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["meta"]["count"], 3);
        assert_eq!(v["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn one_envelope_wraps_data_only() {
        let (status, Json(body)) = success_one(serde_json::json!({"id": 1}));
        assert_eq!(status, StatusCode::CREATED);
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("meta").is_none());
        assert_eq!(v["data"]["id"], 1);
    }
}
