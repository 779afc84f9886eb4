//! Catalog read-aggregation behind the product listing and detail endpoints.
//!
//! Products are joined with their variants, database images, discovered
//! images and approved-review ratings, and annotated with display fields:
//!
//! - display price: the cheapest variant, or the base price without variants
//! - `averageRating` / `reviewCount` over approved reviews only
//! - a merged image list where discovered images come first
//! - an optional `compare_at_price` when a multiplier is configured

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use paw_core::{Category, ProductId};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::db::reviews::{RatingTotals, ReviewRepository};
use crate::error::ValidationErrors;
use crate::models::product::{Product, ProductImage, ProductVariant};
pub use crate::models::product::{ProductFilter, SortKey};
use crate::models::review::PublicReview;
use crate::services::images::{DirectorySnapshot, DiscoveredImages, ImageDiscovery};

// =============================================================================
// Filter
// =============================================================================

/// Raw query string of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

impl TryFrom<ProductQuery> for ProductFilter {
    type Error = ValidationErrors;

    fn try_from(q: ProductQuery) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();

        let query = q
            .q
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let category = q.category.and_then(|c| c.parse::<Category>().ok());
        let min_price = parse_price("minPrice", q.min_price.as_deref(), &mut errors);
        let max_price = parse_price("maxPrice", q.max_price.as_deref(), &mut errors);
        let sort = q.sort.as_deref().map(SortKey::parse).unwrap_or_default();

        errors.into_result(Self {
            query,
            category,
            min_price,
            max_price,
            sort,
        })
    }
}

fn parse_price(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<Decimal> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<Decimal>() {
        Ok(price) => Some(price),
        Err(_) => {
            errors.push(field, "must be a number");
            None
        }
    }
}

// =============================================================================
// Image Merging
// =============================================================================

/// Where an image URL came from. Discovered images take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Discovered(String),
    Database(String),
}

impl ImageSource {
    const fn rank(&self) -> u8 {
        match self {
            Self::Discovered(_) => 0,
            Self::Database(_) => 1,
        }
    }

    fn url(&self) -> &str {
        match self {
            Self::Discovered(url) | Self::Database(url) => url,
        }
    }
}

/// Normalize an image URL for de-duplication.
#[must_use]
pub fn normalize_image_url(url: &str) -> String {
    let mut normalized = url.trim().replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// Merge images from all sources: discovered first, each source keeping its
/// own order, duplicates by normalized URL dropped. The first occurrence's
/// URL is kept as written.
#[must_use]
pub fn merge_images(sources: impl IntoIterator<Item = ImageSource>) -> Vec<String> {
    let mut sources: Vec<ImageSource> = sources.into_iter().collect();
    sources.sort_by_key(ImageSource::rank);

    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(normalize_image_url(s.url())))
        .map(|s| match s {
            ImageSource::Discovered(url) | ImageSource::Database(url) => url,
        })
        .collect()
}

fn image_sources<'a>(
    discovered: &'a DiscoveredImages,
    database: &'a [ProductImage],
) -> impl Iterator<Item = ImageSource> + 'a {
    discovered
        .all()
        .map(|img| ImageSource::Discovered(img.url.clone()))
        .chain(
            database
                .iter()
                .map(|img| ImageSource::Database(img.url.clone())),
        )
}

// =============================================================================
// Derived Fields
// =============================================================================

/// Average of approved ratings, rounded to one decimal, and their count.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    /// Build from a rating sum and count. A zero count averages to 0.
    ///
    /// Halves round away from zero on the binary value, so 23/20 gives 1.2.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_totals(sum: i64, count: i64) -> Self {
        if count <= 0 {
            return Self::default();
        }
        let average = sum as f64 / count as f64;
        Self {
            average_rating: (average * 10.0).round() / 10.0,
            review_count: count,
        }
    }
}

impl From<&RatingTotals> for RatingSummary {
    fn from(t: &RatingTotals) -> Self {
        Self::from_totals(t.rating_sum, t.review_count)
    }
}

impl From<&[PublicReview]> for RatingSummary {
    fn from(reviews: &[PublicReview]) -> Self {
        let sum = reviews.iter().map(|r| i64::from(r.review.rating.stars())).sum();
        let count = i64::try_from(reviews.len()).unwrap_or(i64::MAX);
        Self::from_totals(sum, count)
    }
}

/// Cheapest variant price, or `base` when there are no variants.
#[must_use]
pub fn min_display_price(variants: &[ProductVariant], base: Decimal) -> Decimal {
    variants.iter().map(|v| v.price_pkr).min().unwrap_or(base)
}

/// Strikethrough price shown next to `price`, rounded to two decimals.
#[must_use]
pub fn compare_at(price: Decimal, multiplier: Option<Decimal>) -> Option<Decimal> {
    multiplier.map(|m| (price * m).round_dp(2))
}

// =============================================================================
// Views
// =============================================================================

/// A variant with its optional strikethrough price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: ProductVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Decimal>,
}

impl VariantView {
    fn new(variant: ProductVariant, multiplier: Option<Decimal>) -> Self {
        Self {
            compare_at_price: compare_at(variant.price_pkr, multiplier),
            variant,
        }
    }
}

/// One product in the listing. `price_pkr` is the display price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<String>,
    pub variants: Vec<VariantView>,
    #[serde(flatten)]
    pub rating: RatingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Decimal>,
}

impl CatalogEntry {
    /// Annotate a product with its related rows.
    #[must_use]
    pub fn build(
        mut product: Product,
        variants: Vec<ProductVariant>,
        images: Vec<String>,
        rating: RatingSummary,
        multiplier: Option<Decimal>,
    ) -> Self {
        product.price_pkr = min_display_price(&variants, product.price_pkr);
        Self {
            compare_at_price: compare_at(product.price_pkr, multiplier),
            product,
            images,
            variants: variants
                .into_iter()
                .map(|v| VariantView::new(v, multiplier))
                .collect(),
            rating,
        }
    }
}

/// Full product page. `price_pkr` is the base price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<String>,
    pub image_colors: BTreeMap<String, Vec<crate::services::images::DiscoveredImage>>,
    pub base_images: Vec<String>,
    pub variants: Vec<VariantView>,
    pub reviews: Vec<PublicReview>,
    #[serde(flatten)]
    pub rating: RatingSummary,
    #[serde(rename = "compare_at_price", skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Decimal>,
}

// =============================================================================
// Service
// =============================================================================

/// Catalog query service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    reviews: ReviewRepository<'a>,
    images: &'a ImageDiscovery,
    compare_at_multiplier: Option<Decimal>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        images: &'a ImageDiscovery,
        compare_at_multiplier: Option<Decimal>,
    ) -> Self {
        Self {
            products: ProductRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            images,
            compare_at_multiplier,
        }
    }

    /// Active products matching `filter`, annotated for display.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let products = self.products.list_active(filter).await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

        let (variants, images, totals, snapshot) = tokio::join!(
            self.products.variants_for(&ids),
            self.products.images_for(&ids),
            self.reviews.rating_totals(&ids),
            self.images.snapshot(),
        );
        let mut variants = group_by_product(variants?, |v| v.product_id);
        let mut images = group_by_product(images?, |i| i.product_id);
        let ratings: HashMap<ProductId, RatingSummary> = totals?
            .iter()
            .map(|t| (t.product_id, RatingSummary::from(t)))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| {
                let id = product.id;
                let merged = merged_images(&snapshot, id, &images.remove(&id).unwrap_or_default());
                CatalogEntry::build(
                    product,
                    variants.remove(&id).unwrap_or_default(),
                    merged,
                    ratings.get(&id).copied().unwrap_or_default(),
                    self.compare_at_multiplier,
                )
            })
            .collect())
    }

    /// One active product with everything its page shows.
    ///
    /// Returns `None` when the product is missing or inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.products.get_active(id).await? else {
            return Ok(None);
        };

        let (variants, db_images, reviews, discovered) = tokio::join!(
            self.products.variants(id),
            self.products.images(id),
            self.reviews.approved_for_product(id),
            self.images.discover(id),
        );
        let variants = variants?;
        let db_images = db_images?;
        let reviews = reviews?;

        let multiplier = self.compare_at_multiplier;
        Ok(Some(ProductDetail {
            images: merge_images(image_sources(&discovered, &db_images)),
            base_images: discovered.base.iter().map(|img| img.url.clone()).collect(),
            rating: RatingSummary::from(reviews.as_slice()),
            compare_at_price: compare_at(product.price_pkr, multiplier),
            variants: variants
                .into_iter()
                .map(|v| VariantView::new(v, multiplier))
                .collect(),
            image_colors: discovered.colors,
            reviews,
            product,
        }))
    }
}

fn merged_images(snapshot: &DirectorySnapshot, id: ProductId, db_images: &[ProductImage]) -> Vec<String> {
    let discovered = snapshot.discover(id);
    merge_images(image_sources(&discovered, db_images))
}

pub(crate) fn group_by_product<T>(rows: Vec<T>, key: impl Fn(&T) -> ProductId) -> HashMap<ProductId, Vec<T>> {
    let mut grouped: HashMap<ProductId, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}
