//! Cart route handlers.
//!
//! Carts live in memory and are keyed by the `x-session-id` header, so a
//! client can keep its cart without logging in.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use paw_core::{ProductId, VariantId};

use crate::error::{Result, add_breadcrumb};
use crate::extract::{AppJson, AppPath, AppQuery, CartSession};
use crate::services::cart::{AddItemRequest, Cart, CartService, UpdateItemRequest};
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/update", put(update))
        .route("/remove/{product_id}", delete(remove))
        .route("/clear", delete(clear))
}

/// Query of `DELETE /api/cart/remove/{productId}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveQuery {
    pub variant_id: Option<VariantId>,
}

fn carts(state: &AppState) -> CartService<'_> {
    CartService::new(state.carts(), state.pool())
}

/// The session's cart; empty when the session is unknown.
pub async fn show(State(state): State<AppState>, CartSession(session): CartSession) -> Json<Cart> {
    Json(carts(&state).get(&session).await)
}

/// Add an item to the cart.
///
/// # Errors
///
/// Returns validation, not-found or insufficient-stock errors.
#[instrument(skip(state, req))]
pub async fn add(
    State(state): State<AppState>,
    CartSession(session): CartSession,
    AppJson(req): AppJson<AddItemRequest>,
) -> Result<Json<Cart>> {
    let product_id = req.product_id.to_string();
    let cart = carts(&state).add_item(&session, req).await?;
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(cart))
}

/// Set a line's quantity; zero or less removes it.
///
/// # Errors
///
/// Returns `NotFound` when the cart or line is missing.
#[instrument(skip(state, req))]
pub async fn update(
    State(state): State<AppState>,
    CartSession(session): CartSession,
    AppJson(req): AppJson<UpdateItemRequest>,
) -> Result<Json<Cart>> {
    Ok(Json(carts(&state).update_item(&session, req).await?))
}

/// Remove a line, or every line of the product when no variant is given.
///
/// # Errors
///
/// Returns `NotFound` when the session has no cart.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    CartSession(session): CartSession,
    AppPath(product_id): AppPath<ProductId>,
    AppQuery(query): AppQuery<RemoveQuery>,
) -> Result<Json<Cart>> {
    let cart = carts(&state)
        .remove_item(&session, product_id, query.variant_id)
        .await?;
    Ok(Json(cart))
}

/// Empty the cart.
pub async fn clear(State(state): State<AppState>, CartSession(session): CartSession) -> Json<Cart> {
    Json(carts(&state).clear(&session).await)
}
