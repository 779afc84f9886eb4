//! Checkout and order history handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use paw_core::OrderId;

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::OrderWithItems;
use crate::services::checkout::{CheckoutRequest, CheckoutService};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show))
}

/// Place an order. Guests may check out; a logged-in user owns the order.
///
/// # Errors
///
/// Returns validation, not-found or insufficient-stock errors. Nothing is
/// written when any of them occurs.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    AppJson(req): AppJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let order = CheckoutService::new(state.pool())
        .place_order(user.map(|u| u.id), req)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The current user's orders, newest first.
///
/// # Errors
///
/// Returns `Unauthorized` when logged out.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the current user's orders.
///
/// # Errors
///
/// Returns `NotFound` for someone else's order as well as a missing one.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<OrderId>,
) -> Result<Json<OrderWithItems>> {
    OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}
