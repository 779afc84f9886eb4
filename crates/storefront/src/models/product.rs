//! Catalog domain types and admin input validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paw_core::{Category, ImageId, ImageSize, ProductId, VariantId, VariantSize};

use crate::error::ValidationErrors;

const MAX_TITLE_LENGTH: usize = 255;
const MAX_SKU_LENGTH: usize = 100;
const MAX_IMAGES_PER_PRODUCT: usize = 20;

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub sku: String,
    pub description: Option<String>,
    /// Base price. Listings display the cheapest variant instead.
    pub price_pkr: Decimal,
    pub category: Category,
    /// Product-level stock, used only for cart lines without a variant.
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable size of a product.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: VariantId,
    #[serde(skip_serializing)]
    pub product_id: ProductId,
    pub size: VariantSize,
    pub price_pkr: Decimal,
    pub stock: i32,
    pub dimensions: Option<String>,
    pub product_code: Option<String>,
}

/// An image URL recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    #[serde(skip_serializing)]
    pub id: ImageId,
    #[serde(skip_serializing)]
    pub product_id: ProductId,
    pub url: String,
    #[serde(rename = "size")]
    pub size_label: ImageSize,
}

// =============================================================================
// Listing Filter
// =============================================================================

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Oldest first.
    #[default]
    CreatedAt,
    /// Cheapest base price first.
    Price,
    /// Most expensive base price first.
    PriceDesc,
}

impl SortKey {
    /// Parse a `sort` query value. Unknown keys, including `popularity`,
    /// fall back to creation order.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "price" => Self::Price,
            "price-desc" => Self::PriceDesc,
            _ => Self::CreatedAt,
        }
    }
}

/// Typed listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of title, description or SKU.
    pub query: Option<String>,
    pub category: Option<Category>,
    /// Inclusive lower bound on the base price.
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on the base price.
    pub max_price: Option<Decimal>,
    pub sort: SortKey,
}

/// Derive a URL slug from a product title.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `-` and trims leading/trailing dashes.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// =============================================================================
// Admin Input
// =============================================================================

/// Variant supplied when creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariantInput {
    pub size: String,
    pub price_pkr: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub dimensions: Option<String>,
    pub product_code: Option<String>,
}

/// Body of `POST /api/admin/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProductInput {
    pub title: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_pkr: Option<Decimal>,
    pub category: String,
    pub stock: Option<i32>,
    #[serde(default)]
    pub variants: Vec<NewVariantInput>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Validated variant ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDraft {
    pub size: VariantSize,
    pub price_pkr: Decimal,
    pub stock: i32,
    pub dimensions: Option<String>,
    pub product_code: Option<String>,
}

/// Validated product ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: String,
    pub slug: String,
    pub sku: String,
    pub description: Option<String>,
    /// Cheapest variant price.
    pub price_pkr: Decimal,
    pub category: Category,
    pub variants: Vec<VariantDraft>,
    pub images: Vec<String>,
}

impl NewProductInput {
    /// Validate and normalize the input.
    ///
    /// When no variants are supplied a single `medium` variant is created
    /// from `price_pkr` and `stock`. The base price is the cheapest variant.
    ///
    /// # Errors
    ///
    /// Returns every field failure found.
    pub fn validate(self) -> Result<ProductDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim().to_string();
        check_title(&title, &mut errors);
        let sku = self.sku.trim().to_string();
        check_sku(&sku, &mut errors);
        let category = parse_category(&self.category, &mut errors);

        let mut variants = Vec::with_capacity(self.variants.len().max(1));
        for (i, v) in self.variants.into_iter().enumerate() {
            let size = v.size.parse::<VariantSize>().map_err(|e| {
                errors.push(format!("variants[{i}].size"), e.to_string());
            });
            if v.price_pkr.is_sign_negative() {
                errors.push(format!("variants[{i}].price_pkr"), "must not be negative");
            }
            if v.stock < 0 {
                errors.push(format!("variants[{i}].stock"), "must not be negative");
            }
            if let Ok(size) = size {
                if variants.iter().any(|d: &VariantDraft| d.size == size) {
                    errors.push(format!("variants[{i}].size"), "duplicate size");
                }
                variants.push(VariantDraft {
                    size,
                    price_pkr: v.price_pkr,
                    stock: v.stock,
                    dimensions: v.dimensions.filter(|d| !d.trim().is_empty()),
                    product_code: v.product_code.filter(|c| !c.trim().is_empty()),
                });
            }
        }

        if variants.is_empty() && errors.is_empty() {
            let price = self.price_pkr.unwrap_or(Decimal::ZERO);
            let stock = self.stock.unwrap_or(0);
            if price.is_sign_negative() {
                errors.push("price_pkr", "must not be negative");
            }
            if stock < 0 {
                errors.push("stock", "must not be negative");
            }
            variants.push(VariantDraft {
                size: VariantSize::Medium,
                price_pkr: price,
                stock,
                dimensions: None,
                product_code: None,
            });
        }

        let images: Vec<String> = self
            .images
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if images.len() > MAX_IMAGES_PER_PRODUCT {
            errors.push(
                "images",
                format!("at most {MAX_IMAGES_PER_PRODUCT} images are allowed"),
            );
        }

        let price_pkr = variants
            .iter()
            .map(|v| v.price_pkr)
            .min()
            .unwrap_or(Decimal::ZERO);

        let draft = ProductDraft {
            slug: slugify(&title),
            title,
            sku,
            description: self.description.filter(|d| !d.trim().is_empty()),
            price_pkr,
            category: category.unwrap_or(Category::Dogs),
            variants,
            images,
        };
        errors.into_result(draft)
    }
}

/// Body of `PUT /api/admin/products/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdateInput {
    pub title: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price_pkr: Option<Decimal>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub title: Option<String>,
    /// Re-derived whenever the title changes.
    pub slug: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price_pkr: Option<Decimal>,
    pub category: Option<Category>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductUpdateInput {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns every field failure found.
    pub fn validate(self) -> Result<ProductChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.map(|t| t.trim().to_string());
        if let Some(title) = &title {
            check_title(title, &mut errors);
        }
        let sku = self.sku.map(|s| s.trim().to_string());
        if let Some(sku) = &sku {
            check_sku(sku, &mut errors);
        }
        let category = self
            .category
            .as_deref()
            .and_then(|c| parse_category(c, &mut errors));
        if self.price_pkr.is_some_and(|p| p.is_sign_negative()) {
            errors.push("price_pkr", "must not be negative");
        }
        if self.stock.is_some_and(|s| s < 0) {
            errors.push("stock", "must not be negative");
        }

        let changes = ProductChanges {
            slug: title.as_deref().map(slugify),
            title,
            sku,
            description: self.description,
            price_pkr: self.price_pkr,
            category,
            stock: self.stock,
            is_active: self.is_active,
        };
        errors.into_result(changes)
    }
}

fn check_title(title: &str, errors: &mut ValidationErrors) {
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(
            "title",
            format!("must be between 1 and {MAX_TITLE_LENGTH} characters"),
        );
    } else if slugify(title).is_empty() {
        errors.push("title", "must contain at least one letter or digit");
    }
}

fn check_sku(sku: &str, errors: &mut ValidationErrors) {
    if sku.is_empty() || sku.chars().count() > MAX_SKU_LENGTH {
        errors.push(
            "sku",
            format!("must be between 1 and {MAX_SKU_LENGTH} characters"),
        );
    }
}

fn parse_category(raw: &str, errors: &mut ValidationErrors) -> Option<Category> {
    raw.parse::<Category>()
        .map_err(|_| errors.push("category", "must be one of dogs, cats"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_product() -> NewProductInput {
        NewProductInput {
            title: "Triple Whisker Blue".to_string(),
            sku: "PAW-011".to_string(),
            description: Some("Orthopedic cat mat".to_string()),
            price_pkr: None,
            category: "cats".to_string(),
            stock: None,
            variants: Vec::new(),
            images: vec!["images/11-blue(1).jpeg".to_string()],
        }
    }

    fn variant(size: &str, price: i64) -> NewVariantInput {
        NewVariantInput {
            size: size.to_string(),
            price_pkr: Decimal::from(price),
            stock: 50,
            dimensions: None,
            product_code: None,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Scooby-Doo Classic"), "scooby-doo-classic");
        assert_eq!(slugify("  Hope You Like Dogs Matt!! "), "hope-you-like-dogs-matt");
        assert_eq!(slugify("Paw & Co. -- 2"), "paw-co-2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_base_price_is_cheapest_variant() {
        let mut input = new_product();
        input.variants = vec![variant("large", 5000), variant("small", 3000), variant("medium", 4500)];

        let draft = input.validate().unwrap();
        assert_eq!(draft.price_pkr, Decimal::from(3000));
        assert_eq!(draft.variants.len(), 3);
        assert_eq!(draft.slug, "triple-whisker-blue");
        assert_eq!(draft.category, Category::Cats);
    }

    #[test]
    fn test_default_medium_variant_when_none_given() {
        let mut input = new_product();
        input.price_pkr = Some(Decimal::from(4500));
        input.stock = Some(12);

        let draft = input.validate().unwrap();
        assert_eq!(
            draft.variants,
            vec![VariantDraft {
                size: VariantSize::Medium,
                price_pkr: Decimal::from(4500),
                stock: 12,
                dimensions: None,
                product_code: None,
            }]
        );
        assert_eq!(draft.price_pkr, Decimal::from(4500));
    }

    #[test]
    fn test_validation_collects_all_fields() {
        let mut input = new_product();
        input.title = "   ".to_string();
        input.sku = String::new();
        input.category = "birds".to_string();
        input.variants = vec![variant("huge", 100), variant("small", -5)];

        let errors = input.validate().unwrap_err();
        let fields: Vec<&str> = errors.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["title", "sku", "category", "variants[0].size", "variants[1].price_pkr"]
        );
    }

    #[test]
    fn test_duplicate_variant_sizes_rejected() {
        let mut input = new_product();
        input.variants = vec![variant("small", 3000), variant("small", 3200)];
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields()[0].field, "variants[1].size");
    }

    #[test]
    fn test_update_rederives_slug() {
        let changes = ProductUpdateInput {
            title: Some("Cosmic Kitty".to_string()),
            is_active: Some(false),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(changes.slug.as_deref(), Some("cosmic-kitty"));
        assert_eq!(changes.is_active, Some(false));
        assert!(changes.sku.is_none());
    }

    #[test]
    fn test_update_rejects_bad_category() {
        let errors = ProductUpdateInput {
            category: Some("fish".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.fields()[0].field, "category");
    }
}
