//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! paw-cli admin create -e admin@example.com -n "Admin Name" -p "a long password"
//! ```

use paw_core::UserRole;
use paw_storefront::services::auth::{AuthError, AuthService};

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Admin's password
///
/// # Errors
///
/// Returns an error for invalid input, an email that is already registered,
/// or database failures.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&pool)
        .register(name, email, password, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => {
                format!("User already exists with email: {email}").into()
            }
            other => Box::<dyn std::error::Error>::from(other),
        })?;

    tracing::info!("Admin user created successfully!");
    tracing::info!("  ID: {}", user.id);
    tracing::info!("  Email: {}", user.email);
    tracing::info!("  Role: {}", user.role);
    Ok(())
}
