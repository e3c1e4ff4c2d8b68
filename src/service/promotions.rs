//! Promotion scoping, coupon checks, discount arithmetic and quotes.

use crate::error::AppError;
use crate::models::{
    normalize_code, AppliedPromotion, Book, Category, Coupon, CouponCheck, CouponCreate, CouponUse, DiscountQuote,
    DiscountRequest, DiscountType, Order, OrderStatus, PricedLine, Promotion, PromotionBookLink,
    PromotionCategoryLink, User,
};
use crate::service::{CrudService, OrderService};
use crate::sql::Condition;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;

/// Two decimal places, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Why the coupon cannot be used at `now`, if anything.
pub fn coupon_problem(coupon: &Coupon, promotion: &Promotion, now: DateTime<Utc>) -> Option<&'static str> {
    if !coupon.is_active {
        return Some("coupon is inactive");
    }
    if coupon.expires_at.is_some_and(|at| at < now) {
        return Some("coupon has expired");
    }
    if coupon.remaining_uses() == Some(0) {
        return Some("coupon has no uses left");
    }
    if !promotion.is_active {
        return Some("promotion is inactive");
    }
    if promotion.starts_at > now {
        return Some("promotion has not started yet");
    }
    if promotion.ends_at.is_some_and(|at| at < now) {
        return Some("promotion has ended");
    }
    if promotion.max_uses.is_some_and(|max| promotion.current_uses >= max) {
        return Some("promotion has no uses left");
    }
    None
}

/// Discount on the lines marked `discounted`. The minimum purchase is checked against the whole cart.
pub fn discount_for(promotion: &Promotion, lines: &[PricedLine]) -> Result<Decimal, &'static str> {
    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    if subtotal < promotion.min_purchase {
        return Err("cart does not reach the promotion's minimum purchase");
    }
    let base: Decimal = lines.iter().filter(|l| l.discounted).map(|l| l.line_total).sum();
    if base.is_zero() {
        return Err("promotion does not apply to any item in the cart");
    }
    let amount = match promotion.discount_type {
        DiscountType::Percentage => base * promotion.value / Decimal::ONE_HUNDRED,
        DiscountType::FixedAmount => promotion.value.min(base),
    };
    Ok(round_money(amount))
}

/// A coupon that passed every check, with the discount it grants.
#[derive(Debug, Clone)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub promotion: Promotion,
    pub discount: Decimal,
}

impl AppliedCoupon {
    pub fn summary(&self) -> AppliedPromotion {
        AppliedPromotion {
            promotion_id: self.promotion.id,
            name: self.promotion.name.clone(),
            discount_type: self.promotion.discount_type,
            value: self.promotion.value,
            coupon_code: self.coupon.code.clone(),
        }
    }
}

pub struct PromotionService;

impl PromotionService {
    /// The coupon, its promotion, and why it cannot be used by `user_id` right now (if so).
    async fn resolve(
        conn: &mut PgConnection,
        user_id: i64,
        code: &str,
    ) -> Result<(Coupon, Promotion, Option<&'static str>), AppError> {
        let code = normalize_code(code);
        let coupon: Coupon = CrudService::find_one_in(conn, &[Condition::Eq("code", code.clone().into())])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("coupon {} does not exist", code)))?;
        let promotion: Promotion =
            CrudService::find_one_in(conn, &[Condition::Eq("id", coupon.promotion_id.into())])
                .await?
                .ok_or_else(|| AppError::not_found("promotion", coupon.promotion_id))?;
        let mut problem = coupon_problem(&coupon, &promotion, Utc::now());
        if problem.is_none() && coupon.first_purchase_only && Self::has_ordered(conn, user_id).await? {
            problem = Some("coupon is only valid on a first purchase");
        }
        Ok((coupon, promotion, problem))
    }

    async fn has_ordered(conn: &mut PgConnection, user_id: i64) -> Result<bool, AppError> {
        CrudService::exists_in::<Order>(
            conn,
            &[
                Condition::Eq("user_id", user_id.into()),
                Condition::Ne("status", OrderStatus::Cancelled.into()),
            ],
        )
        .await
    }

    /// Books the promotion is limited to; `None` when it covers the whole catalog.
    async fn eligible_books(conn: &mut PgConnection, promotion_id: i64) -> Result<Option<HashSet<i64>>, AppError> {
        let scoped: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM \"promotion_books\" WHERE \"promotion_id\" = $1) \
             OR EXISTS(SELECT 1 FROM \"promotion_categories\" WHERE \"promotion_id\" = $1)",
        )
        .bind(promotion_id)
        .fetch_one(&mut *conn)
        .await?;
        if !scoped {
            return Ok(None);
        }
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT \"book_id\" FROM \"promotion_books\" WHERE \"promotion_id\" = $1 \
             UNION \
             SELECT bc.\"book_id\" FROM \"book_categories\" bc \
             JOIN \"promotion_categories\" pc ON pc.\"category_id\" = bc.\"category_id\" \
             WHERE pc.\"promotion_id\" = $1",
        )
        .bind(promotion_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(Some(ids.into_iter().collect()))
    }

    /// Check the coupon for `user_id`, mark the lines it covers and compute the discount.
    /// Unknown codes are 404; any other reason the coupon does not apply is 400.
    pub async fn apply_coupon(
        conn: &mut PgConnection,
        user_id: i64,
        code: &str,
        lines: &mut [PricedLine],
    ) -> Result<AppliedCoupon, AppError> {
        let (coupon, promotion, problem) = Self::resolve(conn, user_id, code).await?;
        if let Some(reason) = problem {
            return Err(AppError::BadRequest(reason.into()));
        }
        let eligible = Self::eligible_books(conn, promotion.id).await?;
        for line in lines.iter_mut() {
            line.discounted = eligible.as_ref().map_or(true, |ids| ids.contains(&line.book_id));
        }
        let discount = discount_for(&promotion, lines).map_err(|reason| AppError::BadRequest(reason.into()))?;
        Ok(AppliedCoupon {
            coupon,
            promotion,
            discount,
        })
    }

    /// Count one use of the coupon and its promotion. Limits are enforced by the UPDATEs themselves.
    pub async fn redeem(conn: &mut PgConnection, coupon: &Coupon) -> Result<Coupon, AppError> {
        let used: Option<Coupon> = sqlx::query_as(
            "UPDATE \"coupons\" SET \"times_used\" = \"times_used\" + 1, \"updated_at\" = NOW() \
             WHERE \"id\" = $1 AND (\"usage_limit\" IS NULL OR \"times_used\" < \"usage_limit\") RETURNING *",
        )
        .bind(coupon.id)
        .fetch_optional(&mut *conn)
        .await?;
        let used = used.ok_or_else(|| AppError::BadRequest("coupon has no uses left".into()))?;
        let counted = sqlx::query(
            "UPDATE \"promotions\" SET \"current_uses\" = \"current_uses\" + 1, \"updated_at\" = NOW() \
             WHERE \"id\" = $1 AND (\"max_uses\" IS NULL OR \"current_uses\" < \"max_uses\")",
        )
        .bind(coupon.promotion_id)
        .execute(&mut *conn)
        .await?;
        if counted.rows_affected() == 0 {
            return Err(AppError::BadRequest("promotion has no uses left".into()));
        }
        Ok(used)
    }

    pub async fn create_coupon(pool: &PgPool, body: CouponCreate) -> Result<Coupon, AppError> {
        body.validate()?;
        CrudService::ensure_exists::<Promotion>(pool, body.promotion_id).await?;
        let code = normalize_code(&body.code);
        if CrudService::exists::<Coupon>(pool, &[Condition::Eq("code", code.clone().into())]).await? {
            return Err(AppError::Conflict(format!("coupon {} already exists", code)));
        }
        CrudService::create(pool, &body.into_fields()).await
    }

    pub async fn link_book(pool: &PgPool, promotion_id: i64, book_id: i64) -> Result<PromotionBookLink, AppError> {
        CrudService::ensure_exists::<Promotion>(pool, promotion_id).await?;
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        let key = [
            Condition::Eq("promotion_id", promotion_id.into()),
            Condition::Eq("book_id", book_id.into()),
        ];
        if CrudService::exists::<PromotionBookLink>(pool, &key).await? {
            return Err(AppError::Conflict(format!(
                "book {} is already in promotion {}",
                book_id, promotion_id
            )));
        }
        CrudService::create(pool, &[("promotion_id", promotion_id.into()), ("book_id", book_id.into())]).await
    }

    pub async fn unlink_book(pool: &PgPool, promotion_id: i64, book_id: i64) -> Result<(), AppError> {
        let removed = CrudService::delete_where::<PromotionBookLink>(
            pool,
            &[
                Condition::Eq("promotion_id", promotion_id.into()),
                Condition::Eq("book_id", book_id.into()),
            ],
        )
        .await?;
        if removed.is_empty() {
            return Err(AppError::NotFound(format!("book {} is not in promotion {}", book_id, promotion_id)));
        }
        Ok(())
    }

    pub async fn link_category(
        pool: &PgPool,
        promotion_id: i64,
        category_id: i64,
    ) -> Result<PromotionCategoryLink, AppError> {
        CrudService::ensure_exists::<Promotion>(pool, promotion_id).await?;
        CrudService::ensure_exists::<Category>(pool, category_id).await?;
        let key = [
            Condition::Eq("promotion_id", promotion_id.into()),
            Condition::Eq("category_id", category_id.into()),
        ];
        if CrudService::exists::<PromotionCategoryLink>(pool, &key).await? {
            return Err(AppError::Conflict(format!(
                "category {} is already in promotion {}",
                category_id, promotion_id
            )));
        }
        CrudService::create(
            pool,
            &[("promotion_id", promotion_id.into()), ("category_id", category_id.into())],
        )
        .await
    }

    pub async fn unlink_category(pool: &PgPool, promotion_id: i64, category_id: i64) -> Result<(), AppError> {
        let removed = CrudService::delete_where::<PromotionCategoryLink>(
            pool,
            &[
                Condition::Eq("promotion_id", promotion_id.into()),
                Condition::Eq("category_id", category_id.into()),
            ],
        )
        .await?;
        if removed.is_empty() {
            return Err(AppError::NotFound(format!(
                "category {} is not in promotion {}",
                category_id, promotion_id
            )));
        }
        Ok(())
    }

    pub async fn check(pool: &PgPool, user: &User, code: &str) -> Result<CouponCheck, AppError> {
        let mut conn = pool.acquire().await?;
        let (coupon, promotion, problem) = Self::resolve(&mut conn, user.id, code).await?;
        Ok(CouponCheck {
            valid: problem.is_none(),
            reason: problem.map(str::to_string),
            coupon,
            promotion,
        })
    }

    /// Redeem a coupon outside of an order.
    pub async fn use_coupon(pool: &PgPool, user: &User, code: &str) -> Result<CouponUse, AppError> {
        let mut tx = pool.begin().await?;
        let (coupon, _, problem) = Self::resolve(&mut tx, user.id, code).await?;
        if let Some(reason) = problem {
            return Err(AppError::BadRequest(reason.into()));
        }
        let used = Self::redeem(&mut tx, &coupon).await?;
        tx.commit().await?;
        tracing::info!(code = %used.code, user_id = user.id, times_used = used.times_used, "coupon used");
        Ok(CouponUse {
            remaining_uses: used.remaining_uses(),
            code: used.code,
            times_used: used.times_used,
        })
    }

    /// Price a cart at catalog prices and show what a coupon would take off. Nothing is stored.
    pub async fn quote(pool: &PgPool, user: &User, body: DiscountRequest) -> Result<DiscountQuote, AppError> {
        body.validate()?;
        let mut lines = Vec::with_capacity(body.items.len());
        for item in &body.items {
            let book = CrudService::get::<Book>(pool, item.book_id).await?;
            OrderService::ensure_can_sell(&book, item.quantity)?;
            lines.push(PricedLine::new(&book, item.quantity));
        }
        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();

        let mut applied = None;
        let mut coupon_error = None;
        if let Some(code) = body.coupon_code.as_deref() {
            let mut conn = pool.acquire().await?;
            match Self::apply_coupon(&mut conn, user.id, code, &mut lines).await {
                Ok(a) => applied = Some(a),
                Err(AppError::BadRequest(reason)) | Err(AppError::NotFound(reason)) => coupon_error = Some(reason),
                Err(e) => return Err(e),
            }
        }
        if applied.is_none() {
            for line in lines.iter_mut() {
                line.discounted = false;
            }
        }
        let discount = applied.as_ref().map_or(Decimal::ZERO, |a| a.discount);
        Ok(DiscountQuote {
            subtotal: round_money(subtotal),
            discount: round_money(discount),
            total: round_money(subtotal - discount),
            applied_promotion: applied.as_ref().map(AppliedCoupon::summary),
            coupon_error,
            items: lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promotion(discount_type: DiscountType, value: i64) -> Promotion {
        Promotion {
            id: 1,
            name: "Spring".into(),
            description: None,
            discount_type,
            value: Decimal::from(value),
            min_purchase: Decimal::ZERO,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: None,
            is_active: true,
            max_uses: None,
            current_uses: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn coupon() -> Coupon {
        Coupon {
            id: 1,
            code: "SPRING10".into(),
            promotion_id: 1,
            expires_at: None,
            usage_limit: None,
            times_used: 0,
            is_active: true,
            first_purchase_only: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(book_id: i64, total: &str, discounted: bool) -> PricedLine {
        PricedLine {
            book_id,
            quantity: 1,
            unit_price: total.parse().unwrap(),
            line_total: total.parse().unwrap(),
            discounted,
        }
    }

    #[test]
    fn money_has_two_places() {
        assert_eq!(round_money(Decimal::new(3, 0)).to_string(), "3.00");
        assert_eq!(round_money(Decimal::new(12345, 3)).to_string(), "12.35");
    }

    #[test]
    fn percentage_applies_to_covered_lines_only() {
        let lines = [line(1, "30.00", true), line(2, "20.00", false)];
        let d = discount_for(&promotion(DiscountType::Percentage, 10), &lines).unwrap();
        assert_eq!(d.to_string(), "3.00");
    }

    #[test]
    fn fixed_amount_never_exceeds_the_base() {
        let lines = [line(1, "12.50", true)];
        assert_eq!(discount_for(&promotion(DiscountType::FixedAmount, 20), &lines).unwrap().to_string(), "12.50");
        assert_eq!(discount_for(&promotion(DiscountType::FixedAmount, 5), &lines).unwrap().to_string(), "5.00");
    }

    #[test]
    fn minimum_purchase_and_coverage_are_enforced() {
        let mut p = promotion(DiscountType::Percentage, 10);
        p.min_purchase = Decimal::from(100);
        assert!(discount_for(&p, &[line(1, "30.00", true)]).is_err());
        let p = promotion(DiscountType::Percentage, 10);
        assert!(discount_for(&p, &[line(1, "30.00", false)]).is_err());
    }

    #[test]
    fn coupon_problems_in_order() {
        let now = Utc::now();
        let p = promotion(DiscountType::Percentage, 10);
        assert_eq!(coupon_problem(&coupon(), &p, now), None);

        let mut c = coupon();
        c.usage_limit = Some(1);
        c.times_used = 1;
        assert_eq!(coupon_problem(&c, &p, now), Some("coupon has no uses left"));

        let mut c = coupon();
        c.expires_at = Some(now - Duration::hours(1));
        assert_eq!(coupon_problem(&c, &p, now), Some("coupon has expired"));

        let mut later = promotion(DiscountType::Percentage, 10);
        later.starts_at = now + Duration::days(2);
        assert_eq!(coupon_problem(&coupon(), &later, now), Some("promotion has not started yet"));

        let mut spent = promotion(DiscountType::Percentage, 10);
        spent.max_uses = Some(3);
        spent.current_uses = 3;
        assert_eq!(coupon_problem(&coupon(), &spent, now), Some("promotion has no uses left"));
    }
}
