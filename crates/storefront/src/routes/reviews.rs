//! Review route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use tracing::instrument;

use paw_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAuth;
use crate::models::{PublicReview, Review};
use crate::services::reviews::{NewReviewRequest, ReviewService, ReviewUpdateRequest};
use crate::state::AppState;

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/product/{product_id}", get(for_product))
        .route("/{id}", patch(update))
}

/// Approved reviews of a product, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn for_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<ProductId>,
) -> Result<Json<Vec<PublicReview>>> {
    let reviews = ReviewService::new(state.pool())
        .list_approved(product_id)
        .await?;
    Ok(Json(reviews))
}

/// Submit a review; it waits for moderation.
///
/// # Errors
///
/// Returns validation errors, `NotFound` for an unknown product and
/// `Conflict` when the user already reviewed it.
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(req): AppJson<NewReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = ReviewService::new(state.pool()).create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Edit one's own review.
///
/// # Errors
///
/// Returns `Forbidden` for someone else's review.
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<ReviewId>,
    AppJson(req): AppJson<ReviewUpdateRequest>,
) -> Result<Json<Review>> {
    let review = ReviewService::new(state.pool())
        .update(user.id, id, req)
        .await?;
    Ok(Json(review))
}
