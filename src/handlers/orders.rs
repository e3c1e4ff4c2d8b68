//! Orders: placement, lookup, staff status changes and sales summary.

use super::PageQuery;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, StaffUser};
use crate::models::{
    page, Order, OrderCreate, OrderItem, OrderStats, OrderStatus, OrderUpdate, OrderWithItems, StatusChange, User,
};
use crate::response::{success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::service::{CrudService, OrderService};
use crate::sql::{Condition, OrderBy};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::IntoParams;

const USER_ORDERS_LIMIT: i64 = 50;
const NEWEST_FIRST: [OrderBy; 2] = [OrderBy::desc("placed_at"), OrderBy::desc("id")];

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    #[param(value_type = Option<String>)]
    pub status: Option<OrderStatus>,
    /// Staff only; customers always get their own orders.
    pub user_id: Option<i64>,
}

impl OrderListQuery {
    fn conditions(&self, caller: &User) -> Vec<Condition> {
        let mut c = Vec::new();
        let owner = if caller.role.is_staff() { self.user_id } else { Some(caller.id) };
        if let Some(id) = owner {
            c.push(Condition::Eq("user_id", id.into()));
        }
        if let Some(status) = self.status {
            c.push(Condition::Eq("status", status.into()));
        }
        c
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    #[param(value_type = String)]
    pub status: OrderStatus,
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(OrderListQuery),
    responses((status = 200, body = SuccessMany<Order>), (status = 401, body = ErrorBody))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = page(q.skip, q.limit)?;
    let rows: Vec<Order> = CrudService::list(&state.pool, &q.conditions(&user), &NEWEST_FIRST, Some(page)).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses(
        (status = 200, body = SuccessOne<OrderWithItems>),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let order = CrudService::get::<Order>(&state.pool, id).await?;
    OrderService::ensure_can_view(&user, &order)?;
    Ok(success_one_ok(OrderService::with_items(&state.pool, order).await?))
}

/// Prices are taken from the catalog and stock is reserved in the same transaction.
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "orders",
    security(("bearer_auth" = [])),
    request_body = OrderCreate,
    responses(
        (status = 201, body = SuccessOne<OrderWithItems>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
        (status = 422, body = ErrorBody),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<OrderCreate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(OrderService::place(&state.pool, &user, body).await?))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    request_body = OrderUpdate,
    responses(
        (status = 200, body = SuccessOne<Order>),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<OrderUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(OrderService::modify(&state.pool, id, patch).await?))
}

/// Delivered and cancelled orders are closed. Cancelling returns the stock.
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path), StatusQuery),
    responses(
        (status = 200, body = SuccessOne<StatusChange>),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let change = OrderService::change_status(&state.pool, id, q.status).await?;
    tracing::debug!(order_id = id, staff_id = staff.id, status = %change.status, "status request handled");
    Ok(success_one_ok(change))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/details",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path)),
    responses(
        (status = 200, body = SuccessMany<OrderItem>),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn order_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let order = CrudService::get::<Order>(&state.pool, id).await?;
    OrderService::ensure_can_view(&user, &order)?;
    Ok(success_many(OrderService::items(&state.pool, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/user/{id}/orders",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id"), PageQuery),
    responses((status = 200, body = SuccessMany<Order>), (status = 403, body = ErrorBody))
)]
pub async fn user_orders(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    if caller.id != user_id && !caller.role.is_staff() {
        return Err(AppError::Forbidden("you can only view your own orders".into()));
    }
    let page = page(q.skip, Some(q.limit.unwrap_or(USER_ORDERS_LIMIT)))?;
    let rows: Vec<Order> = CrudService::list(
        &state.pool,
        &[Condition::Eq("user_id", user_id.into())],
        &NEWEST_FIRST,
        Some(page),
    )
    .await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats/summary",
    tag = "orders",
    security(("bearer_auth" = [])),
    responses((status = 200, body = SuccessOne<OrderStats>), (status = 403, body = ErrorBody))
)]
pub async fn order_stats(State(state): State<AppState>, _staff: StaffUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(OrderService::stats(&state.pool).await?))
}
