//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use paw_core::{Email, UserId, UserRole};

/// A registered customer or admin.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address, lowercased.
    pub email: Email,
    /// Customer or admin.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
