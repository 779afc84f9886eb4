//! HTTP route handlers for the storefront API.
//!
//! Everything here is nested under `/api`.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Health check with timestamp
//!
//! # Catalog
//! GET    /products                    - Product listing (q, category, minPrice, maxPrice, sort)
//! GET    /products/{id}               - Product detail
//!
//! # Cart (keyed by the x-session-id header)
//! GET    /cart                        - Current cart
//! POST   /cart/add                    - Add a product or variant
//! PUT    /cart/update                 - Set a line's quantity
//! DELETE /cart/remove/{productId}     - Remove a line (?variantId=)
//! DELETE /cart/clear                  - Empty the cart
//!
//! # Orders
//! POST   /orders                      - Checkout (guest or logged in)
//! GET    /orders                      - My orders (requires auth)
//! GET    /orders/{id}                 - One of my orders (requires auth)
//!
//! # Reviews
//! GET    /reviews/product/{productId} - Approved reviews
//! POST   /reviews                     - Submit a review (requires auth)
//! PATCH  /reviews/{id}                - Edit my review (requires auth)
//!
//! # Auth (rate limited)
//! POST   /auth/register               - Create an account and log in
//! POST   /auth/login                  - Log in
//! POST   /auth/logout                 - Log out
//! GET    /auth/me                     - Current user (requires auth)
//!
//! # Admin (requires admin role)
//! GET    /admin/products              - All products, including inactive
//! POST   /admin/products              - Create a product
//! PUT    /admin/products/{id}         - Update a product
//! DELETE /admin/products/{id}         - Delete a product
//! GET    /admin/orders                - All orders
//! PATCH  /admin/orders/{id}           - Update order or payment status
//! GET    /admin/reviews               - Reviews for moderation (?status=)
//! PATCH  /admin/reviews/{id}          - Moderate a review
//! GET    /admin/analytics             - Sales and store statistics
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// API health check.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}
