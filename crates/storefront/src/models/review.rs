//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use paw_core::{ProductId, Rating, ReviewId, ReviewStatus, UserId};

/// A product review as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An approved review with the reviewer's name, as shown on product pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PublicReview {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub review: Review,
    pub user_name: String,
}

/// A review in the moderation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminReview {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub review: Review,
    pub user_name: String,
    pub product_title: String,
}
