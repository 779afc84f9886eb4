//! Checkout: validate the request, plan the order against locked catalog
//! rows, then persist it in one transaction.
//!
//! Client-supplied prices are ignored. The total comes from the catalog
//! rows locked inside the transaction, and every stock requirement is
//! checked before the first write.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use paw_core::{PaymentMethod, ProductId, UserId, VariantId};

use crate::db::RepositoryError;
use crate::db::orders::{self, LockedProduct, LockedVariant, NewOrderItem};
use crate::error::ValidationErrors;
use crate::models::order::{OrderItemDetail, OrderWithItems, ShippingAddress};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid order: {0}")]
    Validation(ValidationErrors),

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: u64,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Request
// =============================================================================

/// Shipping address as submitted. Every field is optional here so missing
/// ones can be reported individually.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// One submitted order line. Any client price is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemInput {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: Option<i64>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: Option<ShippingAddressInput>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<CheckoutItemInput>,
}

/// A requested quantity of one product or variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

/// A checkout request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Aggregated per (product, variant).
    pub lines: Vec<RequestedLine>,
}

fn required(
    value: Option<String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> String {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            errors.push(format!("shippingAddress.{field}"), "is required");
            String::new()
        }
    }
}

impl CheckoutRequest {
    /// Check every field and aggregate the lines.
    ///
    /// # Errors
    ///
    /// Returns all field failures at once.
    pub fn validate(self) -> Result<ValidatedCheckout, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let address = self.shipping_address.unwrap_or_default();
        let shipping_address = ShippingAddress {
            name: required(address.name, "name", &mut errors),
            phone: required(address.phone, "phone", &mut errors),
            address: required(address.address, "address", &mut errors),
            city: required(address.city, "city", &mut errors),
            postal_code: address
                .postal_code
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        };

        let payment_method = self
            .payment_method
            .as_deref()
            .and_then(|m| m.parse::<PaymentMethod>().ok());
        if payment_method.is_none() {
            errors.push(
                "paymentMethod",
                "must be one of cod, jazzcash, easypaisa, stripe, card",
            );
        }

        if self.items.is_empty() {
            errors.push("items", "Cart is empty");
        }
        let mut requested = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.iter().enumerate() {
            let quantity = item.quantity.unwrap_or(1);
            match u32::try_from(quantity).ok().filter(|q| *q >= 1) {
                Some(quantity) => requested.push(RequestedLine {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity,
                }),
                None => errors.push(format!("items[{i}].quantity"), "must be at least 1"),
            }
        }

        let checkout = ValidatedCheckout {
            shipping_address,
            payment_method: payment_method.unwrap_or(PaymentMethod::Cod),
            lines: aggregate(requested),
        };
        errors.into_result(checkout)
    }
}

/// Merge lines that name the same (product, variant), summing quantities.
/// The result is ordered by product then variant.
#[must_use]
pub fn aggregate(lines: impl IntoIterator<Item = RequestedLine>) -> Vec<RequestedLine> {
    let mut merged: BTreeMap<(ProductId, Option<VariantId>), u32> = BTreeMap::new();
    for line in lines {
        let quantity = merged.entry((line.product_id, line.variant_id)).or_insert(0);
        *quantity = quantity.saturating_add(line.quantity);
    }
    merged
        .into_iter()
        .map(|((product_id, variant_id), quantity)| RequestedLine {
            product_id,
            variant_id,
            quantity,
        })
        .collect()
}

// =============================================================================
// Planning
// =============================================================================

/// An order line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub item: NewOrderItem,
    pub title: String,
    pub slug: String,
    pub sku: String,
}

/// Everything needed to write the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
}

/// Resolve every requested line against the locked rows and check stock.
///
/// # Errors
///
/// Returns `NotFound` for unknown or mismatched products and variants, and
/// `InsufficientStock` when a line asks for more than is available.
pub fn plan_order(
    requested: &[RequestedLine],
    variants: &[LockedVariant],
    products: &[LockedProduct],
) -> Result<OrderPlan, CheckoutError> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut total = Decimal::ZERO;

    for line in requested {
        let planned = match line.variant_id {
            Some(variant_id) => {
                let v = variants
                    .iter()
                    .find(|v| v.variant_id == variant_id && v.product_id == line.product_id)
                    .ok_or(CheckoutError::VariantNotFound(variant_id))?;
                check_stock(line, v.stock)?;
                PlannedLine {
                    item: NewOrderItem {
                        product_id: v.product_id,
                        variant_id: Some(v.variant_id),
                        size: Some(v.size),
                        price: v.price,
                        quantity: quantity_i32(line.quantity),
                    },
                    title: v.title.clone(),
                    slug: v.slug.clone(),
                    sku: v.sku.clone(),
                }
            }
            None => {
                let p = products
                    .iter()
                    .find(|p| p.product_id == line.product_id)
                    .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
                check_stock(line, p.stock)?;
                PlannedLine {
                    item: NewOrderItem {
                        product_id: p.product_id,
                        variant_id: None,
                        size: None,
                        price: p.price,
                        quantity: quantity_i32(line.quantity),
                    },
                    title: p.title.clone(),
                    slug: p.slug.clone(),
                    sku: p.sku.clone(),
                }
            }
        };
        total += planned.item.price * Decimal::from(planned.item.quantity);
        lines.push(planned);
    }

    Ok(OrderPlan { lines, total })
}

fn check_stock(line: &RequestedLine, stock: i32) -> Result<(), CheckoutError> {
    if i64::from(line.quantity) > i64::from(stock) {
        return Err(CheckoutError::InsufficientStock {
            product_id: line.product_id,
            available: i64::from(stock),
            requested: u64::from(line.quantity),
        });
    }
    Ok(())
}

fn quantity_i32(quantity: u32) -> i32 {
    // Stock columns are INTEGER, so any quantity that passed the stock
    // check fits.
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

// =============================================================================
// Service
// =============================================================================

/// Places orders.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate and place an order, attached to `user_id` when logged in.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for bad input, `NotFound` or
    /// `InsufficientStock` from planning, and `Repository` for database
    /// failures. Nothing is written unless every step succeeds.
    #[instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        user_id: Option<UserId>,
        request: CheckoutRequest,
    ) -> Result<OrderWithItems, CheckoutError> {
        let checkout = request.validate().map_err(CheckoutError::Validation)?;

        let mut variant_ids: Vec<VariantId> =
            checkout.lines.iter().filter_map(|l| l.variant_id).collect();
        variant_ids.sort_unstable();
        variant_ids.dedup();
        let mut product_ids: Vec<ProductId> = checkout
            .lines
            .iter()
            .filter(|l| l.variant_id.is_none())
            .map(|l| l.product_id)
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let variants = orders::lock_variants(&mut tx, &variant_ids).await?;
        let products = orders::lock_products(&mut tx, &product_ids).await?;
        let plan = plan_order(&checkout.lines, &variants, &products)?;

        let payment_status = checkout.payment_method.initial_payment_status();
        let order = orders::insert_order(
            &mut tx,
            user_id,
            plan.total,
            checkout.payment_method,
            payment_status,
            &checkout.shipping_address,
        )
        .await?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in plan.lines {
            let item = orders::insert_item(&mut tx, order.id, &line.item).await?;
            match line.item.variant_id {
                Some(variant_id) => {
                    orders::decrement_variant_stock(&mut tx, variant_id, line.item.quantity).await?;
                }
                None => {
                    orders::decrement_product_stock(&mut tx, line.item.product_id, line.item.quantity)
                        .await?;
                }
            }
            items.push(OrderItemDetail {
                item,
                title: line.title,
                slug: line.slug,
                sku: line.sku,
            });
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_id = %order.id,
            user_id = ?user_id,
            total = %order.total_amount,
            payment_method = %order.payment_method,
            items = items.len(),
            "Order created"
        );
        Ok(OrderWithItems { order, items })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use paw_core::VariantSize;

    use super::*;

    fn address() -> ShippingAddressInput {
        ShippingAddressInput {
            name: Some("Ayesha Khan".to_string()),
            phone: Some("03001234567".to_string()),
            address: Some("12 Canal Road".to_string()),
            city: Some("Lahore".to_string()),
            postal_code: None,
        }
    }

    fn item(product: i32, variant: Option<i32>, quantity: i64) -> CheckoutItemInput {
        CheckoutItemInput {
            product_id: ProductId::new(product),
            variant_id: variant.map(VariantId::new),
            quantity: Some(quantity),
        }
    }

    fn locked_variant(id: i32, product: i32, price: i64, stock: i32) -> LockedVariant {
        LockedVariant {
            variant_id: VariantId::new(id),
            product_id: ProductId::new(product),
            title: format!("Mat {product}"),
            slug: format!("mat-{product}"),
            sku: format!("PAW-{product:03}"),
            size: VariantSize::Small,
            price: Decimal::from(price),
            stock,
        }
    }

    fn requested(product: i32, variant: Option<i32>, quantity: u32) -> RequestedLine {
        RequestedLine {
            product_id: ProductId::new(product),
            variant_id: variant.map(VariantId::new),
            quantity,
        }
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let errors = CheckoutRequest {
            shipping_address: Some(ShippingAddressInput {
                name: Some("  ".to_string()),
                ..Default::default()
            }),
            payment_method: Some("bitcoin".to_string()),
            items: Vec::new(),
        }
        .validate()
        .unwrap_err();

        let fields: Vec<&str> = errors.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "shippingAddress.name",
                "shippingAddress.phone",
                "shippingAddress.address",
                "shippingAddress.city",
                "paymentMethod",
                "items",
            ]
        );
        assert_eq!(errors.fields()[5].message, "Cart is empty");
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let errors = CheckoutRequest {
            shipping_address: Some(address()),
            payment_method: Some("cod".to_string()),
            items: vec![item(1, Some(1), 1), item(1, Some(2), 0)],
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.fields()[0].field, "items[1].quantity");
    }

    #[test]
    fn test_validate_aggregates_lines() {
        let checkout = CheckoutRequest {
            shipping_address: Some(address()),
            payment_method: Some("JazzCash".to_string()),
            items: vec![item(2, None, 1), item(1, Some(5), 2), item(1, Some(5), 3)],
        }
        .validate()
        .unwrap();

        assert_eq!(checkout.payment_method, PaymentMethod::JazzCash);
        assert_eq!(
            checkout.lines,
            vec![requested(1, Some(5), 5), requested(2, None, 1)]
        );
        assert!(checkout.shipping_address.postal_code.is_none());
    }

    #[test]
    fn test_plan_totals_from_catalog_prices() {
        let variants = vec![locked_variant(5, 1, 3000, 10), locked_variant(6, 1, 4500, 10)];
        let products = vec![LockedProduct {
            product_id: ProductId::new(2),
            title: "Mat 2".to_string(),
            slug: "mat-2".to_string(),
            sku: "PAW-002".to_string(),
            price: Decimal::from(5000),
            stock: 3,
        }];
        let plan = plan_order(
            &[requested(1, Some(5), 2), requested(1, Some(6), 1), requested(2, None, 3)],
            &variants,
            &products,
        )
        .unwrap();

        assert_eq!(plan.total, Decimal::from(6000 + 4500 + 15_000));
        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.lines[0].item.size, Some(VariantSize::Small));
        assert_eq!(plan.lines[2].item.variant_id, None);
    }

    #[test]
    fn test_plan_rejects_excess_quantity() {
        let err = plan_order(&[requested(1, Some(5), 4)], &[locked_variant(5, 1, 3000, 3)], &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_plan_rejects_variant_of_other_product() {
        let err = plan_order(&[requested(2, Some(5), 1)], &[locked_variant(5, 1, 3000, 3)], &[])
            .unwrap_err();
        assert!(matches!(err, CheckoutError::VariantNotFound(id) if id == VariantId::new(5)));
    }

    #[test]
    fn test_plan_rejects_missing_product() {
        let err = plan_order(&[requested(9, None, 1)], &[], &[]).unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ProductId::new(9)));
    }
}
