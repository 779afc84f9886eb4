//! Session-keyed shopping carts held in process memory.
//!
//! Carts live in a bounded [`CartStore`] (a moka cache) keyed by the client's
//! session identifier. Every mutation of one session's cart runs inside
//! moka's per-key `and_compute_with`, so concurrent requests for the same
//! session are applied one after the other instead of overwriting each
//! other. The total is recomputed on every mutation.
//!
//! Stock is checked against the catalog before the cart is touched; the
//! authoritative check happens again at checkout.

use std::future::ready;
use std::time::Duration;

use moka::future::Cache;
use moka::ops::compute::Op;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use paw_core::{ProductId, VariantId, VariantSize};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::models::product::{Product, ProductVariant};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("cart not found")]
    CartNotFound,

    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),

    #[error("only {available} in stock, {requested} requested")]
    InsufficientStock { available: i64, requested: u64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a cart, unique per (product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    /// Unit price captured when the line was added.
    pub price: Decimal,
    pub size: Option<VariantSize>,
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartItem {
    fn matches(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }

    fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A session's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// Sum of unit price times quantity over all lines.
    pub total: Decimal,
}

/// What a product or variant resolves to when added to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub price: Decimal,
    pub size: Option<VariantSize>,
    pub stock: i32,
}

/// Resolve price, size and stock from a variant, or from the product itself
/// when there is none.
#[must_use]
pub fn resolve_line(product: &Product, variant: Option<&ProductVariant>) -> ResolvedLine {
    match variant {
        Some(v) => ResolvedLine {
            product_id: product.id,
            variant_id: Some(v.id),
            title: product.title.clone(),
            price: v.price_pkr,
            size: Some(v.size),
            stock: v.stock,
        },
        None => ResolvedLine {
            product_id: product.id,
            variant_id: None,
            title: product.title.clone(),
            price: product.price_pkr,
            size: None,
            stock: product.stock,
        },
    }
}

impl Cart {
    fn recompute_total(&mut self) {
        self.total = self.items.iter().map(CartItem::line_total).sum();
    }

    /// Add `quantity` of `line`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` if the resulting line quantity
    /// would exceed the resolved stock.
    pub fn add(&mut self, line: ResolvedLine, quantity: u32) -> Result<(), CartError> {
        let existing = self
            .items
            .iter()
            .position(|item| item.matches(line.product_id, line.variant_id));
        let already = existing
            .and_then(|i| self.items.get(i))
            .map_or(0, |item| item.quantity);

        let requested = u64::from(already) + u64::from(quantity);
        let available = i64::from(line.stock);
        if i64::try_from(requested).map_or(true, |r| r > available) {
            return Err(CartError::InsufficientStock {
                available,
                requested,
            });
        }

        match existing.and_then(|i| self.items.get_mut(i)) {
            Some(item) => item.quantity = already.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                title: line.title,
                price: line.price,
                size: line.size,
                quantity,
                image: None,
            }),
        }
        self.recompute_total();
        Ok(())
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the cart.
    pub fn update(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) -> Result<(), CartError> {
        let index = self
            .items
            .iter()
            .position(|item| item.matches(product_id, variant_id))
            .ok_or(CartError::ItemNotFound(product_id))?;

        if quantity <= 0 {
            self.items.remove(index);
        } else if let Some(item) = self.items.get_mut(index) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.recompute_total();
        Ok(())
    }

    /// Remove one line, or every line of the product when `variant_id` is
    /// `None`. Removing an absent line is a no-op.
    pub fn remove(&mut self, product_id: ProductId, variant_id: Option<VariantId>) {
        self.items.retain(|item| {
            item.product_id != product_id || variant_id.is_some_and(|v| item.variant_id != Some(v))
        });
        self.recompute_total();
    }
}

// =============================================================================
// Store
// =============================================================================

/// Bounded session-to-cart store.
#[derive(Clone)]
pub struct CartStore {
    cache: Cache<String, Cart>,
}

impl CartStore {
    /// Create a store holding at most `max_sessions` carts. With `idle_ttl`,
    /// carts untouched for that long are dropped.
    #[must_use]
    pub fn new(max_sessions: u64, idle_ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_sessions);
        if let Some(ttl) = idle_ttl {
            builder = builder.time_to_idle(ttl);
        }
        Self {
            cache: builder.build(),
        }
    }

    /// The session's cart, or an empty one.
    pub async fn get(&self, session: &str) -> Cart {
        self.cache.get(session).await.unwrap_or_default()
    }

    /// Drop the session's cart.
    pub async fn clear(&self, session: &str) {
        self.cache.invalidate(session).await;
    }

    /// Apply `f` to the session's cart atomically with respect to other
    /// mutations of the same session. The cart is stored only when `f`
    /// succeeds. Without `create`, a missing cart is `CartNotFound`.
    async fn mutate<F>(&self, session: &str, create: bool, f: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError>,
    {
        let mut outcome = Err(CartError::CartNotFound);
        self.cache
            .entry_by_ref(session)
            .and_compute_with(|entry| {
                let op = match entry.map(moka::Entry::into_value) {
                    None if !create => Op::Nop,
                    current => {
                        let mut cart = current.unwrap_or_default();
                        match f(&mut cart) {
                            Ok(()) => {
                                outcome = Ok(cart.clone());
                                Op::Put(cart)
                            }
                            Err(e) => {
                                outcome = Err(e);
                                Op::Nop
                            }
                        }
                    }
                };
                ready(op)
            })
            .await;
        outcome
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("sessions", &self.cache.entry_count())
            .finish()
    }
}

// =============================================================================
// Service
// =============================================================================

/// Body of `POST /api/cart/add`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: Option<i64>,
}

/// Body of `PUT /api/cart/update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
}

/// Cart operations backed by the catalog for price and stock lookup.
pub struct CartService<'a> {
    store: &'a CartStore,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a CartStore, pool: &'a PgPool) -> Self {
        Self {
            store,
            products: ProductRepository::new(pool),
        }
    }

    /// The session's cart. Unknown sessions get an empty cart.
    pub async fn get(&self, session: &str) -> Cart {
        self.store.get(session).await
    }

    /// Discard the session's cart.
    pub async fn clear(&self, session: &str) -> Cart {
        self.store.clear(session).await;
        Cart::default()
    }

    /// Add a product (or one of its variants) to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity below 1.
    /// Returns `CartError::ProductNotFound` if the product is missing or inactive.
    /// Returns `CartError::VariantNotFound` if the variant is not the product's.
    /// Returns `CartError::InsufficientStock` if stock can't cover the line.
    #[instrument(skip(self))]
    pub async fn add_item(&self, session: &str, req: AddItemRequest) -> Result<Cart, CartError> {
        let requested = req.quantity.unwrap_or(1);
        let quantity = u32::try_from(requested)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity {
                quantity: requested,
            })?;

        let product = self
            .products
            .get_active(req.product_id)
            .await?
            .ok_or(CartError::ProductNotFound(req.product_id))?;

        let variant = match req.variant_id {
            Some(variant_id) => Some(
                self.products
                    .get_variant(variant_id)
                    .await?
                    .filter(|v| v.product_id == product.id)
                    .ok_or(CartError::VariantNotFound(variant_id))?,
            ),
            None => None,
        };

        let line = resolve_line(&product, variant.as_ref());
        let cart = self
            .store
            .mutate(session, true, |cart| cart.add(line, quantity))
            .await?;

        tracing::info!(
            product_id = %req.product_id,
            variant_id = ?req.variant_id,
            quantity,
            "Cart item added"
        );
        Ok(cart)
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` or `CartError::ItemNotFound`.
    #[instrument(skip(self))]
    pub async fn update_item(&self, session: &str, req: UpdateItemRequest) -> Result<Cart, CartError> {
        self.store
            .mutate(session, false, |cart| {
                cart.update(req.product_id, req.variant_id, req.quantity)
            })
            .await
    }

    /// Remove a line, or all lines of a product when no variant is given.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the session has no cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        session: &str,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Cart, CartError> {
        self.store
            .mutate(session, false, |cart| {
                cart.remove(product_id, variant_id);
                Ok(())
            })
            .await
    }
}
