use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_verified: bool,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Review {
    const TABLE: &'static str = "reviews";
    const LABEL: &'static str = "review";
    const ACTIVE_COLUMN: Option<&'static str> = None;
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReviewCreate {
    pub book_id: i64,
    pub rating: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .range("rating", Some(self.rating), MIN_RATING, MAX_RATING)
            .max_length("title", self.title.as_deref(), 255)
            .finish()
    }

    /// The author comes from the token, never from the body.
    pub fn into_fields(self, user_id: i64) -> Fields {
        let mut f: Fields = vec![
            ("book_id", self.book_id.into()),
            ("user_id", user_id.into()),
            ("rating", self.rating.into()),
        ];
        set(&mut f, "title", self.title);
        set(&mut f, "comment", self.comment);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ReviewUpdate {
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .range("rating", self.rating, MIN_RATING, MAX_RATING)
            .max_length("title", self.title.as_deref(), 255)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "rating", self.rating);
        set(&mut f, "title", self.title);
        set(&mut f, "comment", self.comment);
        f
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HelpfulVotes {
    pub review_id: i64,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
}

/// Count of reviews per star, 1 through 5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RatingDistribution {
    #[serde(rename = "1")]
    pub one: i64,
    #[serde(rename = "2")]
    pub two: i64,
    #[serde(rename = "3")]
    pub three: i64,
    #[serde(rename = "4")]
    pub four: i64,
    #[serde(rename = "5")]
    pub five: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReviewStats {
    pub book_id: i64,
    pub total_reviews: i64,
    /// Mean rating rounded to two decimals; 0 when the book has no reviews.
    pub average_rating: f64,
    pub rating_distribution: RatingDistribution,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WishlistItem {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub added_at: DateTime<Utc>,
}

impl Entity for WishlistItem {
    const TABLE: &'static str = "wishlist_items";
    const LABEL: &'static str = "wishlist item";
    const ACTIVE_COLUMN: Option<&'static str> = None;
    const TOUCHES_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WishlistAdd {
    pub book_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WishlistCheck {
    pub book_id: i64,
    pub in_wishlist: bool,
}
