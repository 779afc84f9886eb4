//! Admin order management.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use paw_core::{OrderId, OrderStatus, PaymentStatus};

use crate::db::orders::OrderRepository;
use crate::error::{Result, ValidationErrors};
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAdmin;
use crate::models::{AdminOrder, Order};
use crate::state::AppState;

/// Build the admin orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", patch(update))
}

/// Body of `PATCH /api/admin/orders/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Every order, guest orders included, newest first.
///
/// # Errors
///
/// Returns a database error if a query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminOrder>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_all().await?))
}

/// Change an order's fulfilment and/or payment status.
///
/// # Errors
///
/// Returns a validation error when neither field is given and `NotFound`
/// for an unknown order.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<OrderId>,
    AppJson(body): AppJson<OrderStatusUpdate>,
) -> Result<Json<Order>> {
    if body.status.is_none() && body.payment_status.is_none() {
        return Err(ValidationErrors::single("status", "status or paymentStatus is required").into());
    }

    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status, body.payment_status)
        .await?;
    tracing::info!(
        order_id = %id,
        status = %order.status,
        payment_status = %order.payment_status,
        "Order status updated"
    );
    Ok(Json(order))
}
