//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every failure renders as
//! `{"error": code, "message": text, "fields"?: [...]}`.

use std::fmt;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::reviews::ReviewError;

// =============================================================================
// Validation Errors
// =============================================================================

/// A single invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `shippingAddress.city`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Accumulated field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a collection holding one failure.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Record a failure.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded failures, in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Return `value` when nothing was recorded, otherwise the failures.
    ///
    /// # Errors
    ///
    /// Returns `self` if any failure was recorded.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// AppError
// =============================================================================

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// One or more request fields are invalid.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Malformed request (unparseable body, query or path).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state (duplicate SKU, email, review).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not enough stock to satisfy the requested quantity.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl AppError {
    /// HTTP status and stable machine-readable code.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                (StatusCode::CONFLICT, "conflict")
            }
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::InsufficientStock(_) => (StatusCode::CONFLICT, "insufficient_stock"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Resource not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::InsufficientStock(msg)
            | Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg) => msg.clone(),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Validation(errors) => {
                if errors.fields().len() == 1
                    && let Some(only) = errors.fields().first()
                {
                    only.message.clone()
                } else {
                    "Validation failed".to_string()
                }
            }
            Self::RateLimited => "Too many requests, please slow down".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let fields = match &self {
            Self::Validation(errors) => Some(errors.fields()),
            _ => None,
        };
        let body = ErrorBody {
            error: code,
            message: self.public_message(),
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity { .. } => {
                Self::Validation(ValidationErrors::single("quantity", err.to_string()))
            }
            CartError::ProductNotFound(_) => Self::NotFound("Product not found".to_string()),
            CartError::VariantNotFound(_) => Self::NotFound("Variant not found".to_string()),
            CartError::CartNotFound => Self::NotFound("Cart not found".to_string()),
            CartError::ItemNotFound(_) => Self::NotFound("Item not in cart".to_string()),
            CartError::InsufficientStock { .. } => Self::InsufficientStock(err.to_string()),
            CartError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(errors) => Self::Validation(errors),
            CheckoutError::ProductNotFound(_) | CheckoutError::VariantNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            CheckoutError::InsufficientStock { .. } => Self::InsufficientStock(err.to_string()),
            CheckoutError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Validation(errors) => Self::Validation(errors),
            ReviewError::ProductNotFound(_) => Self::NotFound("Product not found".to_string()),
            ReviewError::ReviewNotFound(_) => Self::NotFound("Review not found".to_string()),
            ReviewError::AlreadyReviewed => {
                Self::Conflict("You have already reviewed this product".to_string())
            }
            ReviewError::NotOwner => Self::Forbidden("You can only edit your own reviews".to_string()),
            ReviewError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_string()),
            AuthError::UserAlreadyExists => {
                Self::Conflict("An account with this email already exists".to_string())
            }
            AuthError::InvalidEmail(e) => {
                Self::Validation(ValidationErrors::single("email", e.to_string()))
            }
            AuthError::InvalidName(msg) => Self::Validation(ValidationErrors::single("name", msg)),
            AuthError::WeakPassword(msg) => {
                Self::Validation(ValidationErrors::single("password", msg))
            }
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

// =============================================================================
// Sentry Helpers
// =============================================================================

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "11")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::InsufficientStock("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("sku".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("shippingAddress.city", "is required");
        errors.push("paymentMethod", "must be one of cod, jazzcash, easypaisa, stripe, card");

        let (status, body) = body_json(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["fields"][0]["field"], "shippingAddress.city");
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) =
            body_json(AppError::Internal("connection refused on 10.0.0.3".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("fields").is_none());
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert_eq!(ValidationErrors::new().into_result(5).unwrap(), 5);

        let err = ValidationErrors::single("quantity", "must be at least 1")
            .into_result(())
            .unwrap_err();
        assert_eq!(err.to_string(), "quantity: must be at least 1");
    }

    #[test]
    fn test_cart_errors_map_to_codes() {
        let err: AppError = CartError::CartNotFound.into();
        assert_eq!(err.status_and_code().1, "not_found");

        let err: AppError = CartError::InsufficientStock {
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "insufficient_stock"));

        let err: AppError = CartError::InvalidQuantity { quantity: 0 }.into();
        assert_eq!(err.status_and_code().1, "validation_error");
    }
}
