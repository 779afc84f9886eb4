//! Review repository.

use sqlx::PgPool;

use paw_core::{ProductId, Rating, ReviewId, ReviewStatus, UserId};

use super::RepositoryError;
use crate::models::review::{AdminReview, PublicReview, Review};

const REVIEW_COLUMNS: &str =
    "r.id, r.product_id, r.user_id, r.rating, r.comment, r.status, r.created_at, r.updated_at";

/// Sum and count of approved ratings for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RatingTotals {
    pub product_id: ProductId,
    pub rating_sum: i64,
    pub review_count: i64,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Approved rating totals for the given products. Products without
    /// approved reviews are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_totals(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<RatingTotals>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let totals = sqlx::query_as::<_, RatingTotals>(
            r"
            SELECT product_id,
                   COALESCE(SUM(rating), 0)::BIGINT AS rating_sum,
                   COUNT(*) AS review_count
            FROM shop.reviews
            WHERE status = 'approved' AND product_id = ANY($1)
            GROUP BY product_id
            ",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(totals)
    }

    /// Approved reviews of a product with reviewer names, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<PublicReview>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS}, u.name AS user_name \
             FROM shop.reviews r JOIN shop.users u ON u.id = r.user_id \
             WHERE r.product_id = $1 AND r.status = 'approved' \
             ORDER BY r.created_at DESC, r.id DESC"
        );
        let reviews = sqlx::query_as::<_, PublicReview>(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        Ok(reviews)
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM shop.reviews r WHERE r.id = $1");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// Insert a pending review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        rating: Rating,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(
            r"
            INSERT INTO shop.reviews AS r (product_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING r.id, r.product_id, r.user_id, r.rating, r.comment, r.status,
                      r.created_at, r.updated_at
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "review already exists"))?;
        Ok(review)
    }

    /// Overwrite rating, comment and status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn update(
        &self,
        id: ReviewId,
        rating: Rating,
        comment: Option<&str>,
        status: ReviewStatus,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            UPDATE shop.reviews AS r
            SET rating = $2, comment = $3, status = $4
            WHERE r.id = $1
            RETURNING r.id, r.product_id, r.user_id, r.rating, r.comment, r.status,
                      r.created_at, r.updated_at
            ",
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Reviews for moderation, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_moderation(
        &self,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<AdminReview>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS}, u.name AS user_name, p.title AS product_title \
             FROM shop.reviews r \
             JOIN shop.users u ON u.id = r.user_id \
             JOIN shop.products p ON p.id = r.product_id \
             WHERE ($1::shop.review_status IS NULL OR r.status = $1) \
             ORDER BY r.created_at DESC, r.id DESC"
        );
        let reviews = sqlx::query_as::<_, AdminReview>(&sql)
            .bind(status)
            .fetch_all(self.pool)
            .await?;
        Ok(reviews)
    }

    /// Set a review's moderation status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn set_status(
        &self,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            UPDATE shop.reviews AS r
            SET status = $2
            WHERE r.id = $1
            RETURNING r.id, r.product_id, r.user_id, r.rating, r.comment, r.status,
                      r.created_at, r.updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
