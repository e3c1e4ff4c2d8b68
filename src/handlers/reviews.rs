//! Book reviews, helpful votes and per-book rating statistics.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::models::{page, HelpfulVotes, Review, ReviewCreate, ReviewStats, ReviewUpdate, MAX_RATING, MIN_RATING};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::{CrudService, ReviewService};
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub book_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Lowest rating to include, 1 to 5.
    pub min_rating: Option<i32>,
    pub verified_only: Option<bool>,
}

impl ReviewListQuery {
    fn conditions(&self) -> Result<Vec<Condition>, AppError> {
        let mut c = Vec::new();
        if let Some(id) = self.book_id {
            c.push(Condition::Eq("book_id", id.into()));
        }
        if let Some(id) = self.user_id {
            c.push(Condition::Eq("user_id", id.into()));
        }
        if let Some(min) = self.min_rating {
            if !(MIN_RATING..=MAX_RATING).contains(&min) {
                return Err(AppError::Validation(format!(
                    "min_rating must be between {} and {}",
                    MIN_RATING, MAX_RATING
                )));
            }
            c.push(Condition::Gte("rating", min.into()));
        }
        if self.verified_only.unwrap_or(false) {
            c.push(Condition::Eq("is_verified", true.into()));
        }
        Ok(c)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HelpfulQuery {
    /// true counts a helpful vote, false a not-helpful one (default true).
    pub helpful: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "reviews",
    params(ReviewListQuery),
    responses((status = 200, body = SuccessMany<Review>), (status = 422, body = ErrorBody))
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ReviewListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let conditions = q.conditions()?;
    let rows: Vec<Review> = CrudService::list(
        &state.pool,
        &conditions,
        &[OrderBy::desc("created_at"), OrderBy::desc("id")],
        Some(page),
    )
    .await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    tag = "reviews",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Review>), (status = 404, body = ErrorBody))
)]
pub async fn get_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CrudService::get::<Review>(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    request_body = ReviewCreate,
    responses(
        (status = 201, body = SuccessOne<Review>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<ReviewCreate>,
) -> Result<impl IntoResponse, AppError> {
    let review = ReviewService::create(&state.pool, &user, body).await?;
    tracing::info!(review_id = review.id, book_id = review.book_id, user_id = user.id, "review created");
    Ok(success_one(review))
}

#[utoipa::path(
    patch,
    path = "/api/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    request_body = ReviewUpdate,
    responses(
        (status = 200, body = SuccessOne<Review>),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn update_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ReviewUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    let review = CrudService::get::<Review>(&state.pool, id).await?;
    ReviewService::ensure_can_modify(&user, &review)?;
    let review = CrudService::update::<Review>(&state.pool, id, &patch.into_fields()).await?;
    Ok(success_one_ok(review))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses((status = 204), (status = 403, body = ErrorBody), (status = 404, body = ErrorBody))
)]
pub async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let review = CrudService::get::<Review>(&state.pool, id).await?;
    ReviewService::ensure_can_modify(&user, &review)?;
    CrudService::delete::<Review>(&state.pool, id).await?;
    tracing::info!(review_id = id, user_id = user.id, "review deleted");
    Ok(no_content())
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/helpful",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), HelpfulQuery),
    responses(
        (status = 200, body = SuccessOne<HelpfulVotes>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn vote_helpful(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<HelpfulQuery>,
) -> Result<impl IntoResponse, AppError> {
    let votes = ReviewService::vote(&state.pool, id, &user, q.helpful.unwrap_or(true)).await?;
    Ok(success_one_ok(votes))
}

#[utoipa::path(
    get,
    path = "/api/reviews/book/{book_id}/stats",
    tag = "reviews",
    params(("book_id" = i64, Path)),
    responses((status = 200, body = SuccessOne<ReviewStats>), (status = 404, body = ErrorBody))
)]
pub async fn book_review_stats(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(ReviewService::stats(&state.pool, book_id).await?))
}
