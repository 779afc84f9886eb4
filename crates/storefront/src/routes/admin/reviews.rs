//! Review moderation.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use paw_core::{ReviewId, ReviewStatus};

use crate::db::reviews::ReviewRepository;
use crate::error::Result;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAdmin;
use crate::models::{AdminReview, Review};
use crate::state::AppState;

/// Build the admin reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", patch(moderate))
}

/// Query of `GET /api/admin/reviews`.
#[derive(Debug, Default, Deserialize)]
pub struct ModerationQuery {
    pub status: Option<ReviewStatus>,
}

/// Body of `PATCH /api/admin/reviews/{id}`.
#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub status: ReviewStatus,
}

/// Reviews with author and product, optionally filtered by status.
///
/// # Errors
///
/// Returns a database error if the query fails.
#[instrument(skip_all, fields(status = ?query.status))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ModerationQuery>,
) -> Result<Json<Vec<AdminReview>>> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_moderation(query.status)
        .await?;
    Ok(Json(reviews))
}

/// Approve, reject or reset a review.
///
/// # Errors
///
/// Returns `NotFound` for an unknown review.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn moderate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<ReviewId>,
    AppJson(body): AppJson<ModerationRequest>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, body.status)
        .await?;
    tracing::info!(review_id = %id, status = %review.status, "Review moderated");
    Ok(Json(review))
}
