//! End-to-end flow against a real PostgreSQL. Runs only when TEST_DATABASE_URL is set;
//! the schema in that database is dropped and recreated.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bookstore_api::{app, apply_migrations, AppState, Settings};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::util::ServiceExt;

struct Client {
    app: Router,
    token: Option<String>,
}

impl Client {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn catalog_accounts_reviews_and_orders_flow() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let settings = Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some(url.clone()),
        "SECRET_KEY" => Some("integration-secret".into()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    apply_migrations(&pool, true).await.unwrap();
    let mut client = Client {
        app: app(AppState::new(pool.clone(), settings)),
        token: None,
    };

    // Catalog
    let (status, publisher) = client.call("POST", "/api/publishers", Some(json!({"name": "Editorial Sur"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let publisher_id = publisher["data"]["id"].as_i64().unwrap();
    let (status, _) = client.call("POST", "/api/publishers", Some(json!({"name": "Editorial Sur"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, author) = client.call("POST", "/api/authors", Some(json!({"name": "Jorge Luis Borges"}))).await;
    let author_id = author["data"]["id"].as_i64().unwrap();
    let (_, category) = client.call("POST", "/api/categories", Some(json!({"name": "Fiction"}))).await;
    let category_id = category["data"]["id"].as_i64().unwrap();
    let (status, _) = client
        .call("PATCH", &format!("/api/categories/{}", category_id), Some(json!({"parent_id": category_id})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, book) = client
        .call(
            "POST",
            "/api/books",
            Some(json!({
                "title": "Ficciones",
                "price": "12.50",
                "stock": 3,
                "isbn": "9780802130303",
                "publisher_id": publisher_id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = book["data"]["id"].as_i64().unwrap();
    assert_eq!(book["data"]["price"], "12.50");

    let (status, _) = client
        .call("POST", "/api/books", Some(json!({"title": "Orphan", "price": 1, "publisher_id": 999_999})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client
        .call("POST", &format!("/api/books/{}/authors/{}?position=1", book_id, author_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = client
        .call("POST", &format!("/api/books/{}/authors/{}", book_id, author_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    client
        .call("POST", &format!("/api/books/{}/categories/{}", book_id, category_id), None)
        .await;

    let (_, authors) = client.call("GET", &format!("/api/books/{}/authors", book_id), None).await;
    assert_eq!(authors["data"][0]["name"], "Jorge Luis Borges");
    assert_eq!(authors["data"][0]["position"], 1);

    let (_, found) = client.call("GET", "/api/books?search=ficc&in_stock=true&max_price=20", None).await;
    assert_eq!(found["meta"]["count"], 1);
    let (_, found) = client.call("GET", &format!("/api/books?author_id={}", author_id), None).await;
    assert_eq!(found["meta"]["count"], 1);
    let (_, found) = client.call("GET", &format!("/api/categories/{}/books", category_id), None).await;
    assert_eq!(found["meta"]["count"], 1);
    let (_, found) = client.call("GET", "/api/books?in_stock=false", None).await;
    assert_eq!(found["meta"]["count"], 0);

    // Unlinking removes the link once; the second attempt is a 404.
    let (_, other_author) = client.call("POST", "/api/authors", Some(json!({"name": "Adolfo Bioy Casares"}))).await;
    let other_author_id = other_author["data"]["id"].as_i64().unwrap();
    let (status, _) = client
        .call("POST", &format!("/api/books/{}/authors/{}?position=2", book_id, other_author_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, authors) = client.call("GET", &format!("/api/books/{}/authors", book_id), None).await;
    assert_eq!(authors["meta"]["count"], 2);
    let (status, _) = client
        .call("DELETE", &format!("/api/books/{}/authors/{}", book_id, other_author_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = client
        .call("DELETE", &format!("/api/books/{}/authors/{}", book_id, other_author_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, authors) = client.call("GET", &format!("/api/books/{}/authors", book_id), None).await;
    assert_eq!(authors["meta"]["count"], 1);
    assert_eq!(authors["data"][0]["id"], author_id);

    let (_, other_category) = client
        .call("POST", "/api/categories", Some(json!({"name": "Short stories", "parent_id": category_id})))
        .await;
    let other_category_id = other_category["data"]["id"].as_i64().unwrap();
    client
        .call("POST", &format!("/api/books/{}/categories/{}", book_id, other_category_id), None)
        .await;
    let (status, _) = client
        .call("DELETE", &format!("/api/books/{}/categories/{}", book_id, other_category_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = client
        .call("DELETE", &format!("/api/books/{}/categories/{}", book_id, other_category_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, categories) = client.call("GET", &format!("/api/books/{}/categories", book_id), None).await;
    assert_eq!(categories["meta"]["count"], 1);
    assert_eq!(categories["data"][0]["id"], category_id);

    // Two categories pointing at each other would form a cycle.
    let (status, body) = client
        .call("PATCH", &format!("/api/categories/{}", category_id), Some(json!({"parent_id": other_category_id})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    // PATCH changes persist.
    let (status, _) = client
        .call("PATCH", &format!("/api/books/{}", book_id), Some(json!({"price": "15.00", "stock": 5})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["price"], "15.00");
    assert_eq!(fetched["data"]["stock"], 5);
    assert_eq!(fetched["data"]["title"], "Ficciones");
    client
        .call("PATCH", &format!("/api/authors/{}", author_id), Some(json!({"nationality": "Argentine"})))
        .await;
    let (_, fetched) = client.call("GET", &format!("/api/authors/{}", author_id), None).await;
    assert_eq!(fetched["data"]["nationality"], "Argentine");
    assert_eq!(fetched["data"]["name"], "Jorge Luis Borges");
    client
        .call("PATCH", &format!("/api/publishers/{}", publisher_id), Some(json!({"country": "Argentina"})))
        .await;
    let (_, fetched) = client.call("GET", &format!("/api/publishers/{}", publisher_id), None).await;
    assert_eq!(fetched["data"]["country"], "Argentina");

    // Values too large for their columns are refused before reaching the database.
    let (status, _) = client
        .call("POST", "/api/books", Some(json!({"title": "Too dear", "price": "123456789.00"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = client
        .call("POST", "/api/books", Some(json!({"title": "Bad gallery", "price": "1.00", "extra_images": "[oops"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A hard delete of a book takes its link rows with it.
    let (_, scratch) = client.call("POST", "/api/books", Some(json!({"title": "Scratch", "price": "1.00"}))).await;
    let scratch_id = scratch["data"]["id"].as_i64().unwrap();
    client
        .call("POST", &format!("/api/books/{}/authors/{}", scratch_id, author_id), None)
        .await;
    client
        .call("POST", &format!("/api/books/{}/categories/{}", scratch_id, category_id), None)
        .await;
    sqlx::query("DELETE FROM \"books\" WHERE \"id\" = $1")
        .bind(scratch_id)
        .execute(&pool)
        .await
        .unwrap();
    for table in ["book_authors", "book_categories"] {
        let left: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\" WHERE \"book_id\" = $1", table))
            .bind(scratch_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0, "{}", table);
    }

    // Accounts
    let (status, user) = client
        .call(
            "POST",
            "/api/auth/register",
            Some(json!({
                "first_name": "Ana",
                "last_name": "Reader",
                "email": "Ana@Example.com",
                "password": "correct horse",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["data"]["role"], "customer");
    assert_eq!(user["data"]["email"], "ana@example.com");
    assert!(user["data"].get("password_hash").is_none());

    let (status, _) = client
        .call("POST", "/api/auth/login", Some(json!({"email": "ana@example.com", "password": "wrong pass"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, tokens) = client
        .call("POST", "/api/auth/login", Some(json!({"email": "ana@example.com", "password": "correct horse"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["data"]["token_type"], "bearer");
    let refresh_token = tokens["data"]["refresh_token"].as_str().unwrap().to_string();
    client.token = Some(tokens["data"]["access_token"].as_str().unwrap().to_string());

    let (status, me) = client.call("GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(me["data"]["last_active_at"].is_string());
    let (status, _) = client.call("GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let user_id = me["data"]["id"].as_i64().unwrap();
    let (status, _) = client
        .call("PATCH", &format!("/api/users/{}", user_id), Some(json!({"role": "admin"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = client
        .call("POST", "/api/auth/refresh", Some(json!({"refresh_token": refresh_token})))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Reviews and wishlist
    let (status, review) = client
        .call("POST", "/api/reviews", Some(json!({"book_id": book_id, "rating": 5, "title": "Dazzling"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = review["data"]["id"].as_i64().unwrap();
    let (status, _) = client
        .call("POST", "/api/reviews", Some(json!({"book_id": book_id, "rating": 4})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = client
        .call("POST", &format!("/api/reviews/{}/helpful?helpful=true", review_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stats) = client.call("GET", &format!("/api/reviews/book/{}/stats", book_id), None).await;
    assert_eq!(stats["data"]["total_reviews"], 1);
    assert_eq!(stats["data"]["average_rating"], 5.0);
    assert_eq!(stats["data"]["rating_distribution"]["5"], 1);

    let (status, _) = client.call("POST", "/api/reviews/wishlist", Some(json!({"book_id": book_id}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = client.call("POST", "/api/reviews/wishlist", Some(json!({"book_id": book_id}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, check) = client.call("GET", &format!("/api/reviews/wishlist/check/{}", book_id), None).await;
    assert_eq!(check["data"]["in_wishlist"], true);
    let (status, _) = client.call("DELETE", &format!("/api/reviews/wishlist/{}", book_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = client.call("DELETE", &format!("/api/reviews/wishlist/{}", book_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Orders and promotions
    let customer_token = client.token.clone();
    client.token = None;
    client
        .call(
            "POST",
            "/api/auth/register",
            Some(json!({
                "first_name": "Sam",
                "last_name": "Clerk",
                "email": "staff@example.com",
                "password": "counter top"
            })),
        )
        .await;
    sqlx::query("UPDATE \"users\" SET \"role\" = 'admin' WHERE \"email\" = 'staff@example.com'")
        .execute(&pool)
        .await
        .unwrap();
    let (_, tokens) = client
        .call("POST", "/api/auth/login", Some(json!({"email": "staff@example.com", "password": "counter top"})))
        .await;
    let admin_token = Some(tokens["data"]["access_token"].as_str().unwrap().to_string());

    client.token = customer_token.clone();
    let (status, first) = client
        .call("POST", "/api/orders", Some(json!({"items": [{"book_id": book_id, "quantity": 2}]})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["data"]["id"].as_i64().unwrap();
    assert_eq!(first["data"]["status"], "pending_payment");
    assert_eq!(first["data"]["total"], "30.00");
    assert_eq!(first["data"]["items"][0]["unit_price"], "15.00");
    assert_eq!(first["data"]["items"][0]["book_title"], "Ficciones");
    assert!(first["data"]["order_number"].as_str().unwrap().starts_with("BK-"));
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["stock"], 3);
    assert_eq!(fetched["data"]["total_sales"], 2);

    let (status, _) = client
        .call("POST", "/api/orders", Some(json!({"items": [{"book_id": book_id, "quantity": 10}]})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["stock"], 3);

    let (status, _) = client
        .call("POST", "/api/promotions", Some(json!({"name": "Spring", "discount_type": "percentage", "value": "10"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    client.token = admin_token.clone();
    let (status, promotion) = client
        .call("POST", "/api/promotions", Some(json!({"name": "Spring", "discount_type": "percentage", "value": "10"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let promotion_id = promotion["data"]["id"].as_i64().unwrap();
    let (status, _) = client
        .call("POST", &format!("/api/promotions/{}/categories/{}", promotion_id, category_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = client
        .call("POST", &format!("/api/promotions/{}/categories/{}", promotion_id, category_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, coupon) = client
        .call(
            "POST",
            "/api/promotions/coupons",
            Some(json!({"code": "spring10", "promotion_id": promotion_id, "usage_limit": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(coupon["data"]["code"], "SPRING10");
    let (status, _) = client
        .call("POST", "/api/promotions/coupons", Some(json!({"code": "SPRING10", "promotion_id": promotion_id})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, running) = client.call("GET", "/api/promotions", None).await;
    assert_eq!(running["meta"]["count"], 1);

    client.token = customer_token.clone();
    let (status, check) = client.call("GET", "/api/promotions/coupons/spring10/validate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["data"]["valid"], true);
    let (status, quote) = client
        .call(
            "POST",
            "/api/promotions/calculate-discount",
            Some(json!({"items": [{"book_id": book_id, "quantity": 2}], "coupon_code": "SPRING10"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["data"]["subtotal"], "30.00");
    assert_eq!(quote["data"]["discount"], "3.00");
    assert_eq!(quote["data"]["total"], "27.00");
    assert_eq!(quote["data"]["items"][0]["discounted"], true);

    let (status, second) = client
        .call(
            "POST",
            "/api/orders",
            Some(json!({"items": [{"book_id": book_id, "quantity": 1}], "coupon_code": "spring10"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second["data"]["id"].as_i64().unwrap();
    assert_eq!(second["data"]["total"], "13.50");
    assert_eq!(second["data"]["coupon_code"], "SPRING10");
    let (_, check) = client.call("GET", "/api/promotions/coupons/SPRING10/validate", None).await;
    assert_eq!(check["data"]["valid"], false);
    assert_eq!(check["data"]["reason"], "coupon has no uses left");
    let (status, _) = client
        .call(
            "POST",
            "/api/orders",
            Some(json!({"items": [{"book_id": book_id, "quantity": 1}], "coupon_code": "SPRING10"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["stock"], 2);

    let (status, _) = client
        .call("PATCH", &format!("/api/orders/{}/status?status=cancelled", first_id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client.call("GET", "/api/orders/stats/summary", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, details) = client.call("GET", &format!("/api/orders/{}/details", second_id), None).await;
    assert_eq!(details["meta"]["count"], 1);

    // Cancelling gives the stock back; a cancelled order stays cancelled.
    client.token = admin_token.clone();
    let (status, change) = client
        .call("PATCH", &format!("/api/orders/{}/status?status=cancelled", first_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["data"]["previous_status"], "pending_payment");
    assert_eq!(change["data"]["status"], "cancelled");
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["stock"], 4);
    assert_eq!(fetched["data"]["total_sales"], 1);
    let (status, _) = client
        .call("PATCH", &format!("/api/orders/{}/status?status=paid", first_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, shipped) = client
        .call("PATCH", &format!("/api/orders/{}", second_id), Some(json!({"status": "shipped", "tracking_code": "TRK1"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["data"]["status"], "shipped");
    assert_eq!(shipped["data"]["tracking_code"], "TRK1");
    assert!(shipped["data"]["shipped_at"].is_string());

    let (status, own) = client
        .call("POST", "/api/orders", Some(json!({"items": [{"book_id": book_id, "quantity": 1}]})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let own_id = own["data"]["id"].as_i64().unwrap();
    let (_, all) = client.call("GET", "/api/orders", None).await;
    assert_eq!(all["meta"]["count"], 3);
    let (_, summary) = client.call("GET", "/api/orders/stats/summary", None).await;
    assert_eq!(summary["data"]["total_orders"], 3);
    assert_eq!(summary["data"]["total_sales"], "28.50");
    assert_eq!(summary["data"]["orders_this_month"], 3);
    assert_eq!(summary["data"]["orders_by_status"]["cancelled"], 1);
    assert_eq!(summary["data"]["orders_by_status"]["shipped"], 1);
    assert_eq!(summary["data"]["orders_by_status"]["pending_payment"], 1);
    assert_eq!(summary["data"]["orders_by_status"]["delivered"], 0);

    client.token = customer_token;
    let (_, mine) = client.call("GET", "/api/orders", None).await;
    assert_eq!(mine["meta"]["count"], 2);
    let (_, mine) = client.call("GET", &format!("/api/orders/user/{}/orders", user_id), None).await;
    assert_eq!(mine["meta"]["count"], 2);
    let (status, _) = client.call("GET", &format!("/api/orders/{}", own_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Soft delete keeps the row but hides it from the default listing.
    let (status, _) = client.call("DELETE", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, listed) = client.call("GET", "/api/books", None).await;
    assert_eq!(listed["meta"]["count"], 0);
    let (_, fetched) = client.call("GET", &format!("/api/books/{}", book_id), None).await;
    assert_eq!(fetched["data"]["is_active"], false);

    pool.close().await;
}
