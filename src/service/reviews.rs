//! Review rules that go beyond plain CRUD: one review per reader per book, helpful votes, rating stats.

use crate::error::AppError;
use crate::models::{Book, HelpfulVotes, RatingDistribution, Review, ReviewCreate, ReviewStats, User};
use crate::service::CrudService;
use crate::sql::Condition;
use sqlx::PgPool;

pub struct ReviewService;

impl ReviewService {
    pub async fn create(pool: &PgPool, author: &User, body: ReviewCreate) -> Result<Review, AppError> {
        body.validate()?;
        CrudService::ensure_exists::<Book>(pool, body.book_id).await?;
        let already = CrudService::exists::<Review>(
            pool,
            &[
                Condition::Eq("book_id", body.book_id.into()),
                Condition::Eq("user_id", author.id.into()),
            ],
        )
        .await?;
        if already {
            return Err(AppError::Conflict("you have already reviewed this book".into()));
        }
        CrudService::create(pool, &body.into_fields(author.id)).await
    }

    /// The review's author or staff may change or remove it.
    pub fn ensure_can_modify(user: &User, review: &Review) -> Result<(), AppError> {
        if review.user_id == user.id || user.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("you can only modify your own reviews".into()))
        }
    }

    /// Count a helpful / not-helpful vote. Authors cannot vote on their own review.
    pub async fn vote(pool: &PgPool, review_id: i64, voter: &User, helpful: bool) -> Result<HelpfulVotes, AppError> {
        let review = CrudService::get::<Review>(pool, review_id).await?;
        if review.user_id == voter.id {
            return Err(AppError::BadRequest("you cannot vote on your own review".into()));
        }
        let column = if helpful { "helpful_count" } else { "not_helpful_count" };
        let sql = format!(
            "UPDATE \"reviews\" SET \"{0}\" = \"{0}\" + 1 WHERE \"id\" = $1 \
             RETURNING \"id\", \"helpful_count\", \"not_helpful_count\"",
            column
        );
        let (id, helpful_count, not_helpful_count): (i64, i32, i32) = sqlx::query_as(&sql)
            .bind(review_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::not_found("review", review_id))?;
        Ok(HelpfulVotes {
            review_id: id,
            helpful_count,
            not_helpful_count,
        })
    }

    pub async fn stats(pool: &PgPool, book_id: i64) -> Result<ReviewStats, AppError> {
        CrudService::ensure_exists::<Book>(pool, book_id).await?;
        let row: (i64, f64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(AVG(\"rating\")::float8, 0), \
             COUNT(*) FILTER (WHERE \"rating\" = 1), \
             COUNT(*) FILTER (WHERE \"rating\" = 2), \
             COUNT(*) FILTER (WHERE \"rating\" = 3), \
             COUNT(*) FILTER (WHERE \"rating\" = 4), \
             COUNT(*) FILTER (WHERE \"rating\" = 5) \
             FROM \"reviews\" WHERE \"book_id\" = $1",
        )
        .bind(book_id)
        .fetch_one(pool)
        .await?;
        let (total, average, one, two, three, four, five) = row;
        Ok(ReviewStats {
            book_id,
            total_reviews: total,
            average_rating: round2(average),
            rating_distribution: RatingDistribution {
                one,
                two,
                three,
                four,
                five,
            },
        })
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;

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

    fn review(user_id: i64) -> Review {
        Review {
            id: 10,
            book_id: 1,
            user_id,
            rating: 4,
            title: None,
            comment: None,
            is_verified: false,
            helpful_count: 0,
            not_helpful_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_and_staff_may_modify() {
        assert!(ReviewService::ensure_can_modify(&user(1, UserRole::Customer), &review(1)).is_ok());
        assert!(ReviewService::ensure_can_modify(&user(2, UserRole::Staff), &review(1)).is_ok());
        assert!(ReviewService::ensure_can_modify(&user(3, UserRole::Admin), &review(1)).is_ok());
        let err = ReviewService::ensure_can_modify(&user(2, UserRole::Customer), &review(1)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn averages_round_to_two_places() {
        assert_eq!(round2(4.0 / 3.0), 1.33);
        assert_eq!(round2(0.0), 0.0);
    }
}
