//! OpenAPI document and the interactive viewers.

use crate::error::{ErrorBody, ErrorDetail};
use crate::handlers::{auth, authors, books, categories, orders, promotions, publishers, reviews, users, wishlist};
use crate::models::{
    AppliedPromotion, Author, AuthorCreate, AuthorUpdate, Book, BookAuthor, BookAuthorLink, BookCategoryLink,
    BookCreate, BookUpdate, Category, CategoryCreate, CategoryUpdate, ChangePasswordRequest, Coupon, CouponCheck,
    CouponCreate, CouponUpdate, CouponUse, DiscountQuote, DiscountRequest, DiscountType, HelpfulVotes, LoginRequest,
    MessageResponse, Order, OrderCreate, OrderItem, OrderLine, OrderStats, OrderStatus, OrderUpdate, OrderWithItems,
    PricedLine, Promotion, PromotionBookLink, PromotionCategoryLink, PromotionCreate, PromotionUpdate, Publisher,
    PublisherCreate, PublisherUpdate, RatingDistribution, RefreshRequest, Review, ReviewCreate, ReviewStats,
    ReviewUpdate, StatusChange, TokenResponse, User, UserCreate, UserRole, UserUpdate, WishlistAdd, WishlistCheck,
    WishlistItem,
};
use crate::response::MetaCount;
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Bookstore API", description = "Catalog, accounts, reviews, orders and promotions for an online bookstore"),
    modifiers(&BearerAuth),
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::me,
        auth::change_password,
        auth::logout,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::get_user_by_email,
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        authors::author_books,
        publishers::list_publishers,
        publishers::get_publisher,
        publishers::create_publisher,
        publishers::update_publisher,
        publishers::delete_publisher,
        publishers::publisher_books,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::category_books,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::book_authors,
        books::add_book_author,
        books::remove_book_author,
        books::book_categories,
        books::add_book_category,
        books::remove_book_category,
        reviews::list_reviews,
        reviews::get_review,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        reviews::vote_helpful,
        reviews::book_review_stats,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::check_wishlist,
        orders::list_orders,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::update_order_status,
        orders::order_details,
        orders::user_orders,
        orders::order_stats,
        promotions::list_promotions,
        promotions::get_promotion,
        promotions::create_promotion,
        promotions::update_promotion,
        promotions::delete_promotion,
        promotions::add_promotion_book,
        promotions::remove_promotion_book,
        promotions::add_promotion_category,
        promotions::remove_promotion_category,
        promotions::list_coupons,
        promotions::create_coupon,
        promotions::update_coupon,
        promotions::validate_coupon,
        promotions::use_coupon,
        promotions::calculate_discount,
    ),
    components(schemas(
        ErrorBody, ErrorDetail, MetaCount,
        Author, AuthorCreate, AuthorUpdate,
        Publisher, PublisherCreate, PublisherUpdate,
        Category, CategoryCreate, CategoryUpdate,
        Book, BookCreate, BookUpdate, BookAuthor, BookAuthorLink, BookCategoryLink,
        User, UserRole, UserCreate, UserUpdate, LoginRequest, RefreshRequest, ChangePasswordRequest,
        TokenResponse, MessageResponse,
        Review, ReviewCreate, ReviewUpdate, HelpfulVotes, ReviewStats, RatingDistribution,
        WishlistItem, WishlistAdd, WishlistCheck,
        Order, OrderStatus, OrderItem, OrderWithItems, OrderLine, OrderCreate, OrderUpdate, StatusChange, OrderStats,
        Promotion, DiscountType, PromotionCreate, PromotionUpdate, PromotionBookLink, PromotionCategoryLink,
        Coupon, CouponCreate, CouponUpdate, CouponCheck, CouponUse,
        DiscountRequest, PricedLine, AppliedPromotion, DiscountQuote,
    )),
    tags(
        (name = "auth", description = "Registration, login and tokens"),
        (name = "users", description = "User accounts"),
        (name = "authors"),
        (name = "publishers"),
        (name = "categories"),
        (name = "books"),
        (name = "reviews"),
        (name = "wishlist"),
        (name = "orders", description = "Orders, stock reservation and sales summary"),
        (name = "promotions", description = "Promotions, coupons and discount quotes"),
    )
)]
pub struct ApiDoc;

/// RapiDoc at /docs (serving the JSON document) and ReDoc at /redoc.
pub fn docs_routes() -> Router {
    Router::new()
        .merge(RapiDoc::with_openapi(OPENAPI_PATH, ApiDoc::openapi()).path("/docs"))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_catalog_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/books"));
        assert!(doc.paths.paths.contains_key("/api/reviews/wishlist/check/{book_id}"));
        assert!(doc.paths.paths.contains_key("/api/orders/{id}/status"));
        assert!(doc.paths.paths.contains_key("/api/promotions/calculate-discount"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
