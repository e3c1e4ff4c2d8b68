//! Promotions, their book and category scope, coupons and discount quotes.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, StaffUser};
use crate::models::{
    page, Coupon, CouponCheck, CouponCreate, CouponUpdate, CouponUse, DiscountQuote, DiscountRequest, Promotion,
    PromotionBookLink, PromotionCategoryLink, PromotionCreate, PromotionUpdate,
};
use crate::response::{no_content, success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::{CrudService, PromotionService};
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PromotionListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Only promotions that are active and running now (default true).
    pub active_only: Option<bool>,
}

impl PromotionListQuery {
    fn conditions(&self) -> Vec<Condition> {
        if !self.active_only.unwrap_or(true) {
            return Vec::new();
        }
        let now = Utc::now();
        vec![
            Condition::Eq("is_active", true.into()),
            Condition::Lte("starts_at", now.into()),
            Condition::GteOrNull("ends_at", now.into()),
        ]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CouponListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub promotion_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "promotions",
    params(PromotionListQuery),
    responses((status = 200, body = SuccessMany<Promotion>), (status = 422, body = ErrorBody))
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PromotionListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let rows: Vec<Promotion> =
        CrudService::list(&state.pool, &q.conditions(), &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/promotions/{id}",
    tag = "promotions",
    params(("id" = i64, Path)),
    responses((status = 200, body = SuccessOne<Promotion>), (status = 404, body = ErrorBody))
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CrudService::get::<Promotion>(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "promotions",
    security(("bearer_auth" = [])),
    request_body = PromotionCreate,
    responses(
        (status = 201, body = SuccessOne<Promotion>),
        (status = 403, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiJson(body): ApiJson<PromotionCreate>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    let promotion: Promotion = CrudService::create(&state.pool, &body.into_fields()).await?;
    tracing::info!(promotion_id = promotion.id, created_by = staff.id, "promotion created");
    Ok(success_one(promotion))
}

#[utoipa::path(
    patch,
    path = "/api/promotions/{id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    request_body = PromotionUpdate,
    responses(
        (status = 200, body = SuccessOne<Promotion>),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<PromotionUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let current = CrudService::get::<Promotion>(&state.pool, id).await?;
    patch.validate(current.discount_type)?;
    let fields = patch.into_fields();
    if fields.is_empty() {
        return Ok(success_one_ok(current));
    }
    Ok(success_one_ok(CrudService::update::<Promotion>(&state.pool, id, &fields).await?))
}

/// Deactivates the promotion; its coupons stop validating.
#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    CrudService::delete::<Promotion>(&state.pool, id).await?;
    Ok(no_content())
}

#[utoipa::path(
    post,
    path = "/api/promotions/{id}/books/{book_id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), ("book_id" = i64, Path)),
    responses(
        (status = 201, body = SuccessOne<PromotionBookLink>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn add_promotion_book(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath((id, book_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(PromotionService::link_book(&state.pool, id, book_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}/books/{book_id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), ("book_id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn remove_promotion_book(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath((id, book_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    PromotionService::unlink_book(&state.pool, id, book_id).await?;
    Ok(no_content())
}

#[utoipa::path(
    post,
    path = "/api/promotions/{id}/categories/{category_id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), ("category_id" = i64, Path)),
    responses(
        (status = 201, body = SuccessOne<PromotionCategoryLink>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
pub async fn add_promotion_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath((id, category_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(PromotionService::link_category(&state.pool, id, category_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}/categories/{category_id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), ("category_id" = i64, Path)),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn remove_promotion_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath((id, category_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    PromotionService::unlink_category(&state.pool, id, category_id).await?;
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/promotions/coupons",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(CouponListQuery),
    responses((status = 200, body = SuccessMany<Coupon>), (status = 403, body = ErrorBody))
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiQuery(q): ApiQuery<CouponListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let conditions: Vec<Condition> = q
        .promotion_id
        .map(|id| Condition::Eq("promotion_id", id.into()))
        .into_iter()
        .collect();
    let rows: Vec<Coupon> = CrudService::list(&state.pool, &conditions, &[OrderBy::asc("id")], Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    post,
    path = "/api/promotions/coupons",
    tag = "promotions",
    security(("bearer_auth" = [])),
    request_body = CouponCreate,
    responses(
        (status = 201, body = SuccessOne<Coupon>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiJson(body): ApiJson<CouponCreate>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = PromotionService::create_coupon(&state.pool, body).await?;
    tracing::info!(code = %coupon.code, promotion_id = coupon.promotion_id, created_by = staff.id, "coupon created");
    Ok(success_one(coupon))
}

#[utoipa::path(
    patch,
    path = "/api/promotions/coupons/{id}",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Coupon id")),
    request_body = CouponUpdate,
    responses(
        (status = 200, body = SuccessOne<Coupon>),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CouponUpdate>,
) -> Result<impl IntoResponse, AppError> {
    patch.validate()?;
    let fields = patch.into_fields();
    if fields.is_empty() {
        return Ok(success_one_ok(CrudService::get::<Coupon>(&state.pool, id).await?));
    }
    Ok(success_one_ok(CrudService::update::<Coupon>(&state.pool, id, &fields).await?))
}

/// Whether the signed-in user could use the code now. An unusable coupon is still 200 with `valid: false`.
#[utoipa::path(
    get,
    path = "/api/promotions/coupons/{code}/validate",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("code" = String, Path)),
    responses((status = 200, body = SuccessOne<CouponCheck>), (status = 404, body = ErrorBody))
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(code): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(PromotionService::check(&state.pool, &user, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/promotions/coupons/{code}/use",
    tag = "promotions",
    security(("bearer_auth" = [])),
    params(("code" = String, Path)),
    responses(
        (status = 200, body = SuccessOne<CouponUse>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn use_coupon(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(code): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(PromotionService::use_coupon(&state.pool, &user, &code).await?))
}

/// Prices the cart and applies the coupon without placing an order or using the coupon.
#[utoipa::path(
    post,
    path = "/api/promotions/calculate-discount",
    tag = "promotions",
    security(("bearer_auth" = [])),
    request_body = DiscountRequest,
    responses(
        (status = 200, body = SuccessOne<DiscountQuote>),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn calculate_discount(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<DiscountRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(PromotionService::quote(&state.pool, &user, body).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_promotions_by_default() {
        let c = PromotionListQuery::default().conditions();
        assert!(matches!(
            &c[..],
            [Condition::Eq("is_active", _), Condition::Lte("starts_at", _), Condition::GteOrNull("ends_at", _)]
        ));
        let all = PromotionListQuery {
            active_only: Some(false),
            ..Default::default()
        };
        assert!(all.conditions().is_empty());
    }
}
