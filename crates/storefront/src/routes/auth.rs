//! Authentication route handlers.
//!
//! Email and password accounts. The logged-in user is kept in the
//! `PostgreSQL`-backed session; the session id is cycled on every login to
//! prevent fixation.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::map_response,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use paw_core::UserRole;

use crate::db::users::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::AppJson;
use crate::middleware::{
    RequireAuth, auth_rate_limiter, clear_current_user, rate_limit_response, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Build the auth router. Every route here is rate limited per client IP.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .layer(auth_rate_limiter())
        .layer(map_response(rate_limit_response))
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Store the user in a fresh session.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    session.cycle_id().await?;
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and log it in.
///
/// # Errors
///
/// Returns validation errors for a bad name, email or password and
/// `Conflict` when the email is taken.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&req.name, &req.email, &req.password, UserRole::Customer)
        .await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns `Unauthorized` for an unknown email or a wrong password alike.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// Log out.
///
/// # Errors
///
/// Returns an internal error if the session store fails.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user's account.
///
/// # Errors
///
/// Returns `Unauthorized` when logged out and `NotFound` when the account was
/// deleted after login.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
