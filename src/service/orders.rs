//! Order placement, status changes and sales figures.
//!
//! Placing an order and cancelling one both run in a single transaction with the
//! affected book rows locked, so stock never goes negative and a cancelled order
//! gives back exactly what it took.

use crate::error::AppError;
use crate::models::{
    Book, Fields, Order, OrderCreate, OrderItem, OrderStats, OrderStatus, OrderUpdate, OrderWithItems,
    PricedLine, StatusChange, User,
};
use crate::service::{round_money, CrudService, PromotionService};
use crate::sql::{Condition, OrderBy};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;

/// `BK-YYYYMMDD-000042`.
pub fn order_number(placed_at: DateTime<Utc>, id: i64) -> String {
    format!("BK-{}-{:06}", placed_at.format("%Y%m%d"), id)
}

pub fn order_total(subtotal: Decimal, discount: Decimal, shipping: Decimal, tax: Decimal) -> Decimal {
    round_money(subtotal - discount + shipping + tax)
}

pub struct OrderService;

impl OrderService {
    /// The book must be active and have `quantity` copies in stock.
    pub fn ensure_can_sell(book: &Book, quantity: i32) -> Result<(), AppError> {
        if !book.is_active {
            return Err(AppError::BadRequest(format!("book {} is not available", book.id)));
        }
        if book.stock < quantity {
            return Err(AppError::Conflict(format!(
                "only {} copies of book {} in stock",
                book.stock, book.id
            )));
        }
        Ok(())
    }

    /// Customers see their own orders; staff see every order.
    pub fn ensure_can_view(user: &User, order: &Order) -> Result<(), AppError> {
        if order.user_id == user.id || user.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("you can only view your own orders".into()))
        }
    }

    /// Price the cart from the catalog, apply the coupon, take the stock and record the order.
    pub async fn place(pool: &PgPool, buyer: &User, body: OrderCreate) -> Result<OrderWithItems, AppError> {
        body.validate()?;
        let lines = body.sorted_lines();
        let mut tx = pool.begin().await?;

        let mut books = Vec::with_capacity(lines.len());
        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            let book = Self::lock_book(&mut tx, line.book_id).await?;
            Self::ensure_can_sell(&book, line.quantity)?;
            priced.push(PricedLine::new(&book, line.quantity));
            books.push(book);
        }

        let applied = match body.coupon_code.as_deref() {
            Some(code) => Some(PromotionService::apply_coupon(&mut tx, buyer.id, code, &mut priced).await?),
            None => None,
        };
        if let Some(a) = &applied {
            PromotionService::redeem(&mut tx, &a.coupon).await?;
        }

        let subtotal = round_money(priced.iter().map(|l| l.line_total).sum());
        let discount = applied.as_ref().map_or(Decimal::ZERO, |a| a.discount);
        let shipping = round_money(body.shipping_cost.unwrap_or_default());
        let tax = round_money(body.tax.unwrap_or_default());
        let mut fields: Fields = vec![
            ("user_id", buyer.id.into()),
            ("subtotal", subtotal.into()),
            ("discount_total", discount.into()),
            ("coupon_discount", discount.into()),
            ("shipping_cost", shipping.into()),
            ("tax", tax.into()),
            ("total", order_total(subtotal, discount, shipping, tax).into()),
        ];
        if let Some(a) = &applied {
            fields.push(("coupon_code", a.coupon.code.clone().into()));
        }
        if let Some(address) = body.shipping_address {
            fields.push(("shipping_address", address.into()));
        }
        if let Some(notes) = body.notes {
            fields.push(("notes", notes.into()));
        }
        let order: Order = CrudService::create_in(&mut tx, &fields).await?;
        let number = order_number(order.placed_at, order.id);
        let order: Order = CrudService::update_in(&mut tx, order.id, &[("order_number", number.into())]).await?;

        let mut items = Vec::with_capacity(books.len());
        for (book, line) in books.iter().zip(&priced) {
            sqlx::query(
                "UPDATE \"books\" SET \"stock\" = \"stock\" - $2, \"total_sales\" = \"total_sales\" + $2, \
                 \"updated_at\" = NOW() WHERE \"id\" = $1",
            )
            .bind(book.id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
            let mut item: Fields = vec![
                ("order_id", order.id.into()),
                ("book_id", book.id.into()),
                ("quantity", line.quantity.into()),
                ("unit_price", line.unit_price.into()),
                ("book_title", book.title.clone().into()),
            ];
            if let Some(sku) = &book.sku {
                item.push(("book_sku", sku.clone().into()));
            }
            if let Some(isbn) = &book.isbn {
                item.push(("book_isbn", isbn.clone().into()));
            }
            items.push(CrudService::create_in::<OrderItem>(&mut tx, &item).await?);
        }
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            order_number = ?order.order_number,
            user_id = buyer.id,
            total = %order.total,
            "order placed"
        );
        Ok(OrderWithItems { order, items })
    }

    pub async fn items(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItem>, AppError> {
        CrudService::list(pool, &[Condition::Eq("order_id", order_id.into())], &[OrderBy::asc("id")], None).await
    }

    pub async fn with_items(pool: &PgPool, order: Order) -> Result<OrderWithItems, AppError> {
        let items = Self::items(pool, order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Staff edit. A status in the patch goes through the same rules as `change_status`.
    pub async fn modify(pool: &PgPool, id: i64, patch: OrderUpdate) -> Result<Order, AppError> {
        patch.validate()?;
        let (order, _) = Self::apply(pool, id, patch).await?;
        Ok(order)
    }

    pub async fn change_status(pool: &PgPool, id: i64, status: OrderStatus) -> Result<StatusChange, AppError> {
        let patch = OrderUpdate {
            status: Some(status),
            ..Default::default()
        };
        let (order, previous_status) = Self::apply(pool, id, patch).await?;
        Ok(StatusChange {
            order_id: order.id,
            order_number: order.order_number,
            previous_status,
            status: order.status,
        })
    }

    /// Returns the order after the change and the status it had before.
    async fn apply(pool: &PgPool, id: i64, patch: OrderUpdate) -> Result<(Order, OrderStatus), AppError> {
        let to = patch.status;
        let stamps_shipped = patch.shipped_at.is_some();
        let stamps_delivered = patch.delivered_at.is_some();
        let sets_payment = patch.payment_status.is_some();
        let mut fields = patch.into_fields();

        let mut tx = pool.begin().await?;
        let current = Self::lock_order(&mut tx, id).await?;
        let previous = current.status;
        if let Some(to) = to {
            if previous.check_transition(to)? {
                fields.push(("status", to.into()));
                match to {
                    OrderStatus::Paid if !sets_payment => fields.push(("payment_status", "paid".into())),
                    OrderStatus::Shipped if !stamps_shipped => fields.push(("shipped_at", Utc::now().into())),
                    OrderStatus::Delivered if !stamps_delivered => fields.push(("delivered_at", Utc::now().into())),
                    OrderStatus::Cancelled => Self::restock(&mut tx, id).await?,
                    _ => {}
                }
            }
        }
        let order = if fields.is_empty() {
            current
        } else {
            CrudService::update_in(&mut tx, id, &fields).await?
        };
        tx.commit().await?;

        if order.status != previous {
            tracing::info!(order_id = id, from = %previous, to = %order.status, "order status changed");
        }
        Ok((order, previous))
    }

    /// Give a cancelled order's copies back to the shelf.
    async fn restock(conn: &mut PgConnection, order_id: i64) -> Result<(), AppError> {
        let restored = sqlx::query(
            "UPDATE \"books\" b SET \"stock\" = b.\"stock\" + oi.\"quantity\", \
             \"total_sales\" = GREATEST(b.\"total_sales\" - oi.\"quantity\", 0), \"updated_at\" = NOW() \
             FROM \"order_items\" oi WHERE oi.\"order_id\" = $1 AND oi.\"book_id\" = b.\"id\"",
        )
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
        tracing::debug!(order_id, books = restored.rows_affected(), "restocked");
        Ok(())
    }

    async fn lock_book(conn: &mut PgConnection, id: i64) -> Result<Book, AppError> {
        sqlx::query_as("SELECT * FROM \"books\" WHERE \"id\" = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("book", id))
    }

    async fn lock_order(conn: &mut PgConnection, id: i64) -> Result<Order, AppError> {
        sqlx::query_as("SELECT * FROM \"orders\" WHERE \"id\" = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("order", id))
    }

    pub async fn stats(pool: &PgPool) -> Result<OrderStats, AppError> {
        let (total_orders, total_sales, orders_this_month): (i64, Decimal, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COALESCE(SUM(\"total\") FILTER (WHERE \"status\" <> 'cancelled'), 0), \
             COUNT(*) FILTER (WHERE \"placed_at\" >= date_trunc('month', NOW())) \
             FROM \"orders\"",
        )
        .fetch_one(pool)
        .await?;
        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT \"status\", COUNT(*) FROM \"orders\" GROUP BY \"status\"")
                .fetch_all(pool)
                .await?;
        Ok(OrderStats {
            total_orders,
            orders_by_status: by_status(counts),
            total_sales: round_money(total_sales),
            orders_this_month,
        })
    }
}

/// Every known status, zero-filled.
fn by_status(counts: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = OrderStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, n) in counts {
        map.insert(status, n);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::TimeZone;

    fn book(stock: i32, is_active: bool) -> Book {
        Book {
            id: 7,
            sku: None,
            title: "Rayuela".into(),
            isbn: None,
            description: None,
            price: Decimal::new(1500, 2),
            original_price: None,
            stock,
            min_stock: 0,
            cover_url: None,
            extra_images: None,
            publisher_id: None,
            publication_date: None,
            page_count: None,
            language: "es".into(),
            weight_kg: None,
            dimensions: None,
            format: None,
            is_active,
            is_featured: false,
            is_new: false,
            is_bestseller: false,
            views: 0,
            total_sales: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            first_name: "Lectora".into(),
            last_name: "Uno".into(),
            email: format!("u{}@example.com", id),
            password_hash: String::new(),
            phone: None,
            role,
            accepts_marketing: false,
            last_active_at: None,
            is_active: true,
            email_verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(user_id: i64) -> Order {
        Order {
            id: 42,
            order_number: None,
            user_id,
            placed_at: Utc::now(),
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::PendingPayment,
            shipping_address: None,
            payment_gateway: None,
            gateway_payment_id: None,
            payment_status: "pending".into(),
            tracking_code: None,
            shipped_at: None,
            estimated_delivery_at: None,
            delivered_at: None,
            coupon_code: None,
            coupon_discount: Decimal::ZERO,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn selling_needs_an_active_book_with_enough_stock() {
        assert!(OrderService::ensure_can_sell(&book(5, true), 5).is_ok());
        let err = OrderService::ensure_can_sell(&book(5, true), 6).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "conflict: only 5 copies of book 7 in stock");
        let err = OrderService::ensure_can_sell(&book(5, false), 1).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn only_owner_and_staff_see_an_order() {
        assert!(OrderService::ensure_can_view(&user(1, UserRole::Customer), &order(1)).is_ok());
        assert!(OrderService::ensure_can_view(&user(9, UserRole::Staff), &order(1)).is_ok());
        let err = OrderService::ensure_can_view(&user(2, UserRole::Customer), &order(1)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn order_numbers_carry_the_day_and_padded_id() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(order_number(at, 42), "BK-20260309-000042");
    }

    #[test]
    fn totals_add_shipping_and_tax_after_the_discount() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(order_total(d("30.00"), d("3.00"), d("4.50"), d("2.10")).to_string(), "33.60");
        assert_eq!(order_total(d("15"), d("1.5"), d("0"), d("0")).to_string(), "13.50");
    }

    #[test]
    fn stats_list_every_status() {
        let map = by_status(vec![("paid".into(), 3), ("cancelled".into(), 1)]);
        assert_eq!(map.len(), OrderStatus::ALL.len());
        assert_eq!(map["paid"], 3);
        assert_eq!(map["cancelled"], 1);
        assert_eq!(map["shipped"], 0);
    }
}
