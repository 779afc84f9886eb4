//! Product reviews: public listing, creation and owner edits.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use paw_core::{ProductId, Rating, ReviewId, ReviewStatus, UserId};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::db::reviews::ReviewRepository;
use crate::error::ValidationErrors;
use crate::models::review::{PublicReview, Review};

const MAX_COMMENT_LENGTH: usize = 1000;

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid review: {0}")]
    Validation(ValidationErrors),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("review {0} not found")]
    ReviewNotFound(ReviewId),

    #[error("already reviewed")]
    AlreadyReviewed,

    #[error("not the review's author")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReviewRequest {
    pub product_id: ProductId,
    pub rating: i64,
    pub comment: Option<String>,
}

/// Body of `PATCH /api/reviews/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdateRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

fn parse_rating(value: i64, errors: &mut ValidationErrors) -> Option<Rating> {
    Rating::new(value)
        .map_err(|e| errors.push("rating", e.to_string()))
        .ok()
}

/// Trim a comment; blank comments become `None`.
fn normalize_comment(
    comment: Option<String>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())?;
    if comment.chars().count() > MAX_COMMENT_LENGTH {
        errors.push(
            "comment",
            format!("must be at most {MAX_COMMENT_LENGTH} characters"),
        );
    }
    Some(comment)
}

/// Review service.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the query fails.
    pub async fn list_approved(&self, product_id: ProductId) -> Result<Vec<PublicReview>, ReviewError> {
        Ok(self.reviews.approved_for_product(product_id).await?)
    }

    /// Submit a review. It stays `pending` until moderated.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` for a bad rating or comment,
    /// `ProductNotFound` for a missing product and `AlreadyReviewed` when the
    /// user has reviewed this product before.
    #[instrument(skip(self, req), fields(product_id = %req.product_id))]
    pub async fn create(&self, user_id: UserId, req: NewReviewRequest) -> Result<Review, ReviewError> {
        let mut errors = ValidationErrors::new();
        let rating = parse_rating(req.rating, &mut errors);
        let comment = normalize_comment(req.comment, &mut errors);
        let Some(rating) = rating.filter(|_| errors.is_empty()) else {
            return Err(ReviewError::Validation(errors));
        };

        if self.products.get(req.product_id).await?.is_none() {
            return Err(ReviewError::ProductNotFound(req.product_id));
        }

        let review = self
            .reviews
            .create(req.product_id, user_id, rating, comment.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ReviewError::AlreadyReviewed,
                other => ReviewError::Repository(other),
            })?;

        tracing::info!(review_id = %review.id, "Review submitted");
        Ok(review)
    }

    /// Edit one's own review. Editing an approved review sends it back to
    /// moderation.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ReviewNotFound`, `NotOwner` when someone else
    /// wrote it, or `Validation` for a bad rating or comment.
    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReviewId,
        req: ReviewUpdateRequest,
    ) -> Result<Review, ReviewError> {
        let existing = self
            .reviews
            .get(id)
            .await?
            .ok_or(ReviewError::ReviewNotFound(id))?;
        if existing.user_id != user_id {
            return Err(ReviewError::NotOwner);
        }

        let mut errors = ValidationErrors::new();
        let rating = req
            .rating
            .map_or(Some(existing.rating), |r| parse_rating(r, &mut errors));
        let comment = match req.comment {
            Some(c) => normalize_comment(Some(c), &mut errors),
            None => existing.comment.clone(),
        };
        let Some(rating) = rating.filter(|_| errors.is_empty()) else {
            return Err(ReviewError::Validation(errors));
        };

        let status = next_status(existing.status);
        Ok(self
            .reviews
            .update(id, rating, comment.as_deref(), status)
            .await?)
    }
}

/// Status after an owner edit.
#[must_use]
pub const fn next_status(current: ReviewStatus) -> ReviewStatus {
    match current {
        ReviewStatus::Approved => ReviewStatus::Pending,
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_resets_approved_review() {
        assert_eq!(next_status(ReviewStatus::Approved), ReviewStatus::Pending);
        assert_eq!(next_status(ReviewStatus::Pending), ReviewStatus::Pending);
        assert_eq!(next_status(ReviewStatus::Rejected), ReviewStatus::Rejected);
    }

    #[test]
    fn test_rating_out_of_range() {
        let mut errors = ValidationErrors::new();
        assert!(parse_rating(6, &mut errors).is_none());
        assert!(parse_rating(0, &mut errors).is_none());
        assert_eq!(errors.fields().len(), 2);
        assert_eq!(parse_rating(5, &mut errors).map(Rating::stars), Some(5));
    }

    #[test]
    fn test_comment_normalization() {
        let mut errors = ValidationErrors::new();
        assert_eq!(normalize_comment(Some("   ".to_string()), &mut errors), None);
        assert_eq!(
            normalize_comment(Some(" Lovely mat ".to_string()), &mut errors).as_deref(),
            Some("Lovely mat")
        );
        assert!(errors.is_empty());

        normalize_comment(Some("x".repeat(1001)), &mut errors);
        assert_eq!(errors.fields()[0].field, "comment");
    }
}
