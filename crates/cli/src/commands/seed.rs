//! Seed the catalog from a YAML file.
//!
//! The file lists products in the same shape the admin API accepts:
//!
//! ```yaml
//! products:
//!   - title: The Dachshund
//!     sku: PAW-001
//!     category: dogs
//!     images: ["images/1(1).jpeg"]
//!     variants:
//!       - { size: small, price_pkr: 3000, stock: 50, dimensions: "20*16 inches" }
//! ```
//!
//! Seeding is idempotent: a product whose SKU already exists is skipped.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use paw_storefront::db::RepositoryError;
use paw_storefront::db::products::ProductRepository;
use paw_storefront::models::product::{NewProductInput, ProductDraft};

/// Top-level structure of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<NewProductInput>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse and validate a catalog without touching the database.
///
/// # Errors
///
/// Returns a message per invalid product, naming its position and SKU.
pub fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, Box<dyn std::error::Error>> {
    let file: CatalogFile = serde_yaml::from_str(content)?;

    let mut drafts = Vec::with_capacity(file.products.len());
    let mut failures = Vec::new();
    for (i, product) in file.products.into_iter().enumerate() {
        let sku = product.sku.clone();
        match product.validate() {
            Ok(draft) => drafts.push(draft),
            Err(errors) => failures.push(format!("products[{i}] ({sku}): {errors}")),
        }
    }

    if !failures.is_empty() {
        error!("Catalog validation failed:");
        for failure in &failures {
            error!("  - {failure}");
        }
        return Err(format!("{} invalid products", failures.len()).into());
    }
    Ok(drafts)
}

/// Seed products from a YAML catalog.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or the
/// database is unreachable.
pub async fn catalog(file_path: &str) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Validate everything before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let drafts = parse_catalog(&content)?;
    info!(products = drafts.len(), "Catalog validated");

    let pool = super::connect().await?;
    let products = ProductRepository::new(&pool);

    let mut summary = SeedSummary::default();
    for draft in &drafts {
        match products.create(draft).await {
            Ok(product) => {
                info!(id = %product.id, sku = %product.sku, "Inserted product");
                summary.inserted += 1;
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!(sku = %draft.sku, %reason, "Skipping existing product");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {}", summary.inserted);
    info!("  Products skipped (already exist): {}", summary.skipped);
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use paw_core::{Category, VariantSize};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let content = include_str!("../../seeds/catalog.yaml");
        let drafts = parse_catalog(content).unwrap();

        assert_eq!(drafts.len(), 20);
        let first = &drafts[0];
        assert_eq!(first.sku, "PAW-001");
        assert_eq!(first.slug, "the-dachshund");
        assert_eq!(first.category, Category::Dogs);
        assert_eq!(first.price_pkr, Decimal::from(3000));
        assert_eq!(first.variants.len(), 3);
        assert_eq!(first.variants[0].size, VariantSize::Small);
        assert_eq!(first.variants[0].product_code.as_deref(), Some("PIB1620-01"));
        assert_eq!(first.images, vec!["images/1(1).jpeg".to_string()]);

        let mut skus: Vec<&str> = drafts.iter().map(|d| d.sku.as_str()).collect();
        skus.sort_unstable();
        skus.dedup();
        assert_eq!(skus.len(), 20);
    }

    #[test]
    fn test_invalid_products_are_reported() {
        let content = r"
products:
  - title: Good Mat
    sku: PAW-100
    category: dogs
  - title: Bad Mat
    sku: PAW-101
    category: hamsters
";
        let err = parse_catalog(content).unwrap_err();
        assert_eq!(err.to_string(), "1 invalid products");
    }
}
