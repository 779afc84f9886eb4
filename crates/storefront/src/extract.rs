//! Request extractors that reject with [`AppError`] instead of axum's
//! plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Header carrying the client-chosen cart session.
pub const CART_SESSION_HEADER: &str = "x-session-id";

/// Session used when the client sends none.
pub const DEFAULT_CART_SESSION: &str = "default";

const MAX_CART_SESSION_LENGTH: usize = 128;

/// The cart session identifier from `x-session-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSession(pub String);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(CART_SESSION_HEADER) else {
            return Ok(Self(DEFAULT_CART_SESSION.to_string()));
        };
        let id = value
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{CART_SESSION_HEADER} must be ASCII")))?
            .trim();

        if id.is_empty() {
            return Ok(Self(DEFAULT_CART_SESSION.to_string()));
        }
        if id.len() > MAX_CART_SESSION_LENGTH {
            return Err(AppError::BadRequest(format!(
                "{CART_SESSION_HEADER} must be at most {MAX_CART_SESSION_LENGTH} characters"
            )));
        }
        Ok(Self(id.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> Result<CartSession, AppError> {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(h) = header {
            builder = builder.header(CART_SESSION_HEADER, h);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        CartSession::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_cart_session_defaults() {
        assert_eq!(extract(None).await.unwrap().0, "default");
        assert_eq!(extract(Some("  ")).await.unwrap().0, "default");
    }

    #[tokio::test]
    async fn test_cart_session_from_header() {
        assert_eq!(extract(Some("abc-123")).await.unwrap().0, "abc-123");
    }

    #[tokio::test]
    async fn test_cart_session_too_long() {
        let long = "s".repeat(129);
        assert!(matches!(extract(Some(&long)).await, Err(AppError::BadRequest(_))));
    }
}
