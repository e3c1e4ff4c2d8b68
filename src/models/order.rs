use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;

pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

text_enum!(OrderStatus {
    PendingPayment => "pending_payment",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Delivered and cancelled orders never change status again.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// `Ok(false)` when nothing changes, an error when the order is already closed.
    pub fn check_transition(self, to: OrderStatus) -> Result<bool, AppError> {
        if self == to {
            return Ok(false);
        }
        if self.is_final() {
            return Err(AppError::BadRequest(format!("order is already {}", self)));
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Order {
    pub id: i64,
    pub order_number: Option<String>,
    pub user_id: i64,
    pub placed_at: DateTime<Utc>,
    #[schema(value_type = String, example = "30.00")]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount_total: Decimal,
    #[schema(value_type = String)]
    pub shipping_cost: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub status: OrderStatus,
    /// JSON-encoded shipping address.
    pub shipping_address: Option<String>,
    pub payment_gateway: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub payment_status: String,
    pub tracking_code: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub coupon_code: Option<String>,
    #[schema(value_type = String)]
    pub coupon_discount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    const TABLE: &'static str = "orders";
    const LABEL: &'static str = "order";
    const ACTIVE_COLUMN: Option<&'static str> = None;
}

/// One line of an order, with the book as it was when the order was placed.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub book_id: i64,
    pub quantity: i32,
    #[schema(value_type = String, example = "15.00")]
    pub unit_price: Decimal,
    pub book_title: String,
    pub book_sku: Option<String>,
    pub book_isbn: Option<String>,
}

impl Entity for OrderItem {
    const TABLE: &'static str = "order_items";
    const LABEL: &'static str = "order item";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLine {
    pub book_id: i64,
    pub quantity: i32,
}

/// Prices come from the catalog; the client only says what and how many.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderCreate {
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Non-empty, each book once, quantities in 1..=MAX_LINE_QUANTITY.
pub(crate) fn validate_lines(v: &mut RequestValidator, lines: &[OrderLine]) {
    if lines.is_empty() {
        v.push("items must not be empty");
    }
    let mut seen = HashSet::new();
    for line in lines {
        v.range("quantity", Some(line.quantity), 1, MAX_LINE_QUANTITY);
        if !seen.insert(line.book_id) {
            v.push(format!("book {} appears more than once", line.book_id));
        }
    }
}

impl OrderCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = RequestValidator::new();
        validate_lines(&mut v, &self.items);
        v.money("shipping_cost", self.shipping_cost)
            .money("tax", self.tax)
            .json("shipping_address", self.shipping_address.as_deref())
            .max_length("coupon_code", self.coupon_code.as_deref(), 50)
            .finish()
    }

    /// Lines sorted by book id, so concurrent orders lock books in the same order.
    pub fn sorted_lines(&self) -> Vec<OrderLine> {
        let mut lines = self.items.clone();
        lines.sort_by_key(|l| l.book_id);
        lines
    }
}

/// Staff changes to an order. A `status` here follows the same rules as the status endpoint.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<String>,
    pub tracking_code: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl OrderUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .max_length("payment_status", self.payment_status.as_deref(), 50)
            .max_length("tracking_code", self.tracking_code.as_deref(), 100)
            .finish()
    }

    /// Every column except `status`, which goes through the transition rules.
    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "payment_status", self.payment_status);
        set(&mut f, "tracking_code", self.tracking_code);
        set(&mut f, "shipped_at", self.shipped_at);
        set(&mut f, "estimated_delivery_at", self.estimated_delivery_at);
        set(&mut f, "delivered_at", self.delivered_at);
        set(&mut f, "notes", self.notes);
        f
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusChange {
    pub order_id: i64,
    pub order_number: Option<String>,
    pub previous_status: OrderStatus,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    /// Every status, zero when no order has it.
    pub orders_by_status: BTreeMap<String, i64>,
    /// Sum of totals over orders that were not cancelled.
    #[schema(value_type = String)]
    pub total_sales: Decimal,
    pub orders_this_month: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(json: &str) -> OrderCreate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_text_matches_serde() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn closed_orders_do_not_move() {
        assert!(OrderStatus::Paid.check_transition(OrderStatus::Shipped).unwrap());
        assert!(!OrderStatus::Paid.check_transition(OrderStatus::Paid).unwrap());
        assert!(OrderStatus::PendingPayment.check_transition(OrderStatus::Cancelled).unwrap());
        let err = OrderStatus::Cancelled.check_transition(OrderStatus::Paid).unwrap_err();
        assert_eq!(err.to_string(), "bad request: order is already cancelled");
        assert!(OrderStatus::Delivered.check_transition(OrderStatus::Shipped).is_err());
    }

    #[test]
    fn order_needs_lines_with_sane_quantities() {
        assert!(create(r#"{"items":[]}"#).validate().is_err());
        assert!(create(r#"{"items":[{"book_id":1,"quantity":0}]}"#).validate().is_err());
        assert!(create(r#"{"items":[{"book_id":1,"quantity":1},{"book_id":1,"quantity":2}]}"#)
            .validate()
            .is_err());
        assert!(create(r#"{"items":[{"book_id":1,"quantity":2}],"shipping_cost":"4.50"}"#)
            .validate()
            .is_ok());
        assert!(create(r#"{"items":[{"book_id":1,"quantity":1}],"tax":"-1"}"#).validate().is_err());
    }

    #[test]
    fn lines_lock_in_book_order() {
        let body = create(r#"{"items":[{"book_id":9,"quantity":1},{"book_id":2,"quantity":3}]}"#);
        let ids: Vec<i64> = body.sorted_lines().iter().map(|l| l.book_id).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn status_is_left_out_of_plain_fields() {
        let patch: OrderUpdate = serde_json::from_str(r#"{"status":"shipped","tracking_code":"TRK1"}"#).unwrap();
        assert_eq!(patch.status, Some(OrderStatus::Shipped));
        let fields = patch.into_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "tracking_code");
    }
}
