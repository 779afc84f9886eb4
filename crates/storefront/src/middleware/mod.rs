//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS
//! 3. `TraceLayer` (request span with status and latency)
//! 4. Request ID (add unique ID to each request)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on auth routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{auth_rate_limiter, rate_limit_response};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
