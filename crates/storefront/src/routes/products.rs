//! Catalog route handlers.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use paw_core::ProductId;

use crate::error::{AppError, Result};
use crate::extract::{AppPath, AppQuery};
use crate::services::catalog::{CatalogEntry, CatalogService, ProductDetail, ProductFilter, ProductQuery};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", get(show))
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.images(), state.compare_at_multiplier())
}

/// List active products.
///
/// # Errors
///
/// Returns a validation error for malformed price bounds.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<Json<Vec<CatalogEntry>>> {
    let filter = ProductFilter::try_from(query)?;
    let products = catalog(&state).list_products(&filter).await?;
    Ok(Json(products))
}

/// Show one active product.
///
/// # Errors
///
/// Returns `NotFound` for a missing or inactive product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<ProductDetail>> {
    catalog(&state)
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
