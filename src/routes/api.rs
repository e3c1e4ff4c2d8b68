//! Resource routes, mounted under /api.
//! Collection paths answer with and without a trailing slash.

use crate::handlers::{auth, authors, books, categories, orders, promotions, publishers, reviews, users, wishlist};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post, MethodRouter},
    Router,
};

fn collection(router: Router<AppState>, path: &str, methods: MethodRouter<AppState>) -> Router<AppState> {
    router
        .route(path, methods.clone())
        .route(&format!("{}/", path), methods)
}

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/logout", post(auth::logout))
        .with_state(state)
}

pub fn user_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/users",
        get(users::list_users).post(users::create_user),
    )
    .route("/users/email/:email", get(users::get_user_by_email))
    .route(
        "/users/:id",
        get(users::get_user).patch(users::update_user).delete(users::delete_user),
    )
    .with_state(state)
}

pub fn author_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/authors",
        get(authors::list_authors).post(authors::create_author),
    )
    .route(
        "/authors/:id",
        get(authors::get_author)
            .patch(authors::update_author)
            .delete(authors::delete_author),
    )
    .route("/authors/:id/books", get(authors::author_books))
    .with_state(state)
}

pub fn publisher_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/publishers",
        get(publishers::list_publishers).post(publishers::create_publisher),
    )
    .route(
        "/publishers/:id",
        get(publishers::get_publisher)
            .patch(publishers::update_publisher)
            .delete(publishers::delete_publisher),
    )
    .route("/publishers/:id/books", get(publishers::publisher_books))
    .with_state(state)
}

pub fn category_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/categories",
        get(categories::list_categories).post(categories::create_category),
    )
    .route(
        "/categories/:id",
        get(categories::get_category)
            .patch(categories::update_category)
            .delete(categories::delete_category),
    )
    .route("/categories/:id/books", get(categories::category_books))
    .with_state(state)
}

pub fn book_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/books",
        get(books::list_books).post(books::create_book),
    )
    .route(
        "/books/:id",
        get(books::get_book).patch(books::update_book).delete(books::delete_book),
    )
    .route("/books/:id/authors", get(books::book_authors))
    .route(
        "/books/:id/authors/:author_id",
        post(books::add_book_author).delete(books::remove_book_author),
    )
    .route("/books/:id/categories", get(books::book_categories))
    .route(
        "/books/:id/categories/:category_id",
        post(books::add_book_category).delete(books::remove_book_category),
    )
    .with_state(state)
}

/// Reviews and the wishlist share the /reviews prefix; static segments win over `:id`.
pub fn review_routes(state: AppState) -> Router {
    let router = collection(
        Router::new(),
        "/reviews",
        get(reviews::list_reviews).post(reviews::create_review),
    );
    collection(
        router,
        "/reviews/wishlist",
        get(wishlist::list_wishlist).post(wishlist::add_to_wishlist),
    )
    .route("/reviews/wishlist/check/:book_id", get(wishlist::check_wishlist))
    .route("/reviews/wishlist/:book_id", axum::routing::delete(wishlist::remove_from_wishlist))
    .route("/reviews/book/:book_id/stats", get(reviews::book_review_stats))
    .route(
        "/reviews/:id",
        get(reviews::get_review)
            .patch(reviews::update_review)
            .delete(reviews::delete_review),
    )
    .route("/reviews/:id/helpful", post(reviews::vote_helpful))
    .with_state(state)
}

/// `/orders/:id` and `/orders/user/:id/orders` share the param name the router requires.
pub fn order_routes(state: AppState) -> Router {
    collection(
        Router::new(),
        "/orders",
        get(orders::list_orders).post(orders::create_order),
    )
    .route("/orders/stats/summary", get(orders::order_stats))
    .route("/orders/user/:id/orders", get(orders::user_orders))
    .route("/orders/:id", get(orders::get_order).patch(orders::update_order))
    .route("/orders/:id/status", patch(orders::update_order_status))
    .route("/orders/:id/details", get(orders::order_details))
    .with_state(state)
}

/// Coupon ids (PATCH) and codes (validate, use) share the `:coupon` segment.
pub fn promotion_routes(state: AppState) -> Router {
    let router = collection(
        Router::new(),
        "/promotions",
        get(promotions::list_promotions).post(promotions::create_promotion),
    );
    collection(
        router,
        "/promotions/coupons",
        get(promotions::list_coupons).post(promotions::create_coupon),
    )
    .route("/promotions/coupons/:coupon", patch(promotions::update_coupon))
    .route("/promotions/coupons/:coupon/validate", get(promotions::validate_coupon))
    .route("/promotions/coupons/:coupon/use", post(promotions::use_coupon))
    .route("/promotions/calculate-discount", post(promotions::calculate_discount))
    .route(
        "/promotions/:id",
        get(promotions::get_promotion)
            .patch(promotions::update_promotion)
            .delete(promotions::delete_promotion),
    )
    .route(
        "/promotions/:id/books/:book_id",
        post(promotions::add_promotion_book).delete(promotions::remove_promotion_book),
    )
    .route(
        "/promotions/:id/categories/:category_id",
        post(promotions::add_promotion_category).delete(promotions::remove_promotion_category),
    )
    .with_state(state)
}

/// Every resource router, merged.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(author_routes(state.clone()))
        .merge(publisher_routes(state.clone()))
        .merge(category_routes(state.clone()))
        .merge(book_routes(state.clone()))
        .merge(review_routes(state.clone()))
        .merge(order_routes(state.clone()))
        .merge(promotion_routes(state))
}
