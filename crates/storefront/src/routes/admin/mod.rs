//! Admin API. Every handler requires the `admin` role through
//! [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod analytics;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/analytics", analytics::router())
}
