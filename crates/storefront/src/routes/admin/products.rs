//! Admin product management.

use std::io::ErrorKind;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;
use tracing::instrument;

use paw_core::ProductId;

use crate::db::products::ProductRepository;
use crate::error::Result;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAdmin;
use crate::models::product::{NewProductInput, ProductUpdateInput};
use crate::models::{Product, ProductImage, ProductVariant};
use crate::services::catalog::group_by_product;
use crate::state::AppState;

/// Build the admin products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", put(update).delete(destroy))
}

/// A product with every stored image and variant.
#[derive(Debug, Serialize)]
pub struct AdminProduct {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
}

/// All products, including inactive ones, newest first.
///
/// # Errors
///
/// Returns a database error if a query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminProduct>>> {
    let repo = ProductRepository::new(state.pool());
    let products = repo.list_all().await?;
    let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

    let (variants, images) = tokio::try_join!(repo.variants_for(&ids), repo.images_for(&ids))?;
    let mut variants = group_by_product(variants, |v| v.product_id);
    let mut images = group_by_product(images, |i| i.product_id);

    Ok(Json(
        products
            .into_iter()
            .map(|product| AdminProduct {
                images: images.remove(&product.id).unwrap_or_default(),
                variants: variants.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect(),
    ))
}

/// Create a product with its variants and images.
///
/// # Errors
///
/// Returns validation errors and `Conflict` for a duplicate SKU.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<NewProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let draft = input.validate()?;
    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update the supplied fields of a product.
///
/// # Errors
///
/// Returns validation errors, `NotFound` and `Conflict` for a duplicate SKU.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
    AppJson(input): AppJson<ProductUpdateInput>,
) -> Result<Json<Product>> {
    let changes = input.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &changes)
        .await?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Delete a product. Variants, images and reviews go with it; uploaded
/// files are removed best-effort.
///
/// # Errors
///
/// Returns `NotFound` for an unknown product.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;

    let upload_dir = state.config().uploads_dir.join(format!("product_{id}"));
    match tokio::fs::remove_dir_all(&upload_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(error = %e, dir = %upload_dir.display(), "Failed to remove product uploads");
        }
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
