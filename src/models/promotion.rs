use super::order::{validate_lines, OrderLine};
use super::{set, Book, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the eligible amount.
    Percentage,
    /// `value` is taken off the eligible amount, never below zero.
    FixedAmount,
}

text_enum!(DiscountType {
    Percentage => "percentage",
    FixedAmount => "fixed_amount",
});

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[schema(value_type = String, example = "10.00")]
    pub value: Decimal,
    #[schema(value_type = String)]
    pub min_purchase: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Promotion {
    const TABLE: &'static str = "promotions";
    const LABEL: &'static str = "promotion";
}

fn validate_value(v: &mut RequestValidator, discount_type: DiscountType, value: Option<Decimal>) {
    v.money("value", value);
    if discount_type == DiscountType::Percentage && value.is_some_and(|pct| pct > Decimal::ONE_HUNDRED) {
        v.push("value must be at most 100 for a percentage discount");
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PromotionCreate {
    pub name: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub value: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub min_purchase: Option<Decimal>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_uses: Option<i32>,
}

impl PromotionCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = RequestValidator::new();
        v.required("name", &self.name, 255);
        validate_value(&mut v, self.discount_type, Some(self.value));
        v.money("min_purchase", self.min_purchase).positive("max_uses", self.max_uses);
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end < start {
                v.push("ends_at must not be before starts_at");
            }
        }
        v.finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![
            ("name", self.name.trim().to_string().into()),
            ("discount_type", self.discount_type.into()),
            ("value", self.value.into()),
        ];
        set(&mut f, "description", self.description);
        set(&mut f, "min_purchase", self.min_purchase);
        set(&mut f, "starts_at", self.starts_at);
        set(&mut f, "ends_at", self.ends_at);
        set(&mut f, "max_uses", self.max_uses);
        f
    }
}

/// The discount type is fixed at creation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct PromotionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub value: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min_purchase: Option<Decimal>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub is_active: Option<bool>,
}

impl PromotionUpdate {
    pub fn validate(&self, current: DiscountType) -> Result<(), AppError> {
        let mut v = RequestValidator::new();
        v.not_blank("name", self.name.as_deref(), 255);
        validate_value(&mut v, current, self.value);
        v.money("min_purchase", self.min_purchase)
            .positive("max_uses", self.max_uses)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "name", self.name.map(|n| n.trim().to_string()));
        set(&mut f, "description", self.description);
        set(&mut f, "value", self.value);
        set(&mut f, "min_purchase", self.min_purchase);
        set(&mut f, "ends_at", self.ends_at);
        set(&mut f, "max_uses", self.max_uses);
        set(&mut f, "is_active", self.is_active);
        f
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub promotion_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
    pub first_purchase_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Coupon {
    const TABLE: &'static str = "coupons";
    const LABEL: &'static str = "coupon";
}

impl Coupon {
    pub fn remaining_uses(&self) -> Option<i32> {
        self.usage_limit.map(|limit| (limit - self.times_used).max(0))
    }
}

/// Coupon codes are stored upper-case without surrounding spaces.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CouponCreate {
    pub code: String,
    pub promotion_id: i64,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub first_purchase_only: Option<bool>,
}

impl CouponCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("code", &self.code, 50)
            .positive("usage_limit", self.usage_limit)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![
            ("code", normalize_code(&self.code).into()),
            ("promotion_id", self.promotion_id.into()),
        ];
        set(&mut f, "expires_at", self.expires_at);
        set(&mut f, "usage_limit", self.usage_limit);
        set(&mut f, "first_purchase_only", self.first_purchase_only);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CouponUpdate {
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub first_purchase_only: Option<bool>,
}

impl CouponUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new().positive("usage_limit", self.usage_limit).finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "expires_at", self.expires_at);
        set(&mut f, "usage_limit", self.usage_limit);
        set(&mut f, "is_active", self.is_active);
        set(&mut f, "first_purchase_only", self.first_purchase_only);
        f
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PromotionBookLink {
    pub promotion_id: i64,
    pub book_id: i64,
}

impl Entity for PromotionBookLink {
    const TABLE: &'static str = "promotion_books";
    const LABEL: &'static str = "promotion book link";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PromotionCategoryLink {
    pub promotion_id: i64,
    pub category_id: i64,
}

impl Entity for PromotionCategoryLink {
    const TABLE: &'static str = "promotion_categories";
    const LABEL: &'static str = "promotion category link";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

/// Result of checking a coupon code for the signed-in user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub coupon: Coupon,
    pub promotion: Promotion,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponUse {
    pub code: String,
    pub times_used: i32,
    pub remaining_uses: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DiscountRequest {
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl DiscountRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = RequestValidator::new();
        validate_lines(&mut v, &self.items);
        v.max_length("coupon_code", self.coupon_code.as_deref(), 50).finish()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedLine {
    pub book_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
    /// Whether the applied promotion covers this line.
    pub discounted: bool,
}

impl PricedLine {
    /// The line at the book's current catalog price, not yet covered by any promotion.
    pub fn new(book: &Book, quantity: i32) -> Self {
        PricedLine {
            book_id: book.id,
            quantity,
            unit_price: book.price,
            line_total: book.price * Decimal::from(quantity),
            discounted: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedPromotion {
    pub promotion_id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub value: Decimal,
    pub coupon_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiscountQuote {
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub applied_promotion: Option<AppliedPromotion>,
    /// Why the coupon did not apply, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_error: Option<String>,
    pub items: Vec<PricedLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    fn create(json: &str) -> PromotionCreate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn percentage_cannot_exceed_one_hundred() {
        assert!(create(r#"{"name":"Spring","discount_type":"percentage","value":"15"}"#).validate().is_ok());
        let msg = create(r#"{"name":"Spring","discount_type":"percentage","value":"150"}"#)
            .validate()
            .unwrap_err()
            .to_string();
        assert!(msg.contains("value must be at most 100"));
        assert!(create(r#"{"name":"Gift","discount_type":"fixed_amount","value":"150"}"#).validate().is_ok());
        let patch = PromotionUpdate {
            value: Some(Decimal::from(101)),
            ..Default::default()
        };
        assert!(patch.validate(DiscountType::Percentage).is_err());
        assert!(patch.validate(DiscountType::FixedAmount).is_ok());
    }

    #[test]
    fn window_must_not_end_before_it_starts() {
        let body = create(
            r#"{"name":"Spring","discount_type":"percentage","value":"10",
                "starts_at":"2026-03-01T00:00:00Z","ends_at":"2026-02-01T00:00:00Z"}"#,
        );
        assert!(body.validate().unwrap_err().to_string().contains("ends_at must not be before starts_at"));
    }

    #[test]
    fn coupon_codes_are_normalized() {
        assert_eq!(normalize_code("  spring10 "), "SPRING10");
        let body: CouponCreate = serde_json::from_str(r#"{"code":"spring10","promotion_id":3}"#).unwrap();
        body.validate().unwrap();
        assert_eq!(body.into_fields()[0].1, PgBindValue::from("SPRING10"));
    }

    #[test]
    fn remaining_uses_never_go_negative() {
        let mut coupon = Coupon {
            id: 1,
            code: "SPRING10".into(),
            promotion_id: 1,
            expires_at: None,
            usage_limit: Some(2),
            times_used: 1,
            is_active: true,
            first_purchase_only: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(coupon.remaining_uses(), Some(1));
        coupon.times_used = 5;
        assert_eq!(coupon.remaining_uses(), Some(0));
        coupon.usage_limit = None;
        assert_eq!(coupon.remaining_uses(), None);
    }
}
