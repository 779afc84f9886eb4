//! Order repository and the row-locking helpers used by checkout.
//!
//! The checkout helpers are free functions over `&mut PgConnection` so the
//! caller can run them inside one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use paw_core::{
    OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId, VariantSize,
};

use super::RepositoryError;
use crate::models::order::{
    AdminOrder, Order, OrderItem, OrderItemDetail, OrderWithItems, ShippingAddress,
};

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.total_amount, o.status, o.payment_method, \
     o.payment_status, o.shipping_address, o.created_at, o.updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    total_amount: Decimal,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            total_amount: r.total_amount,
            status: r.status,
            payment_method: r.payment_method,
            payment_status: r.payment_status,
            shipping_address: r.shipping_address.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    user_name: Option<String>,
    user_email: Option<String>,
}

// =============================================================================
// Checkout Helpers
// =============================================================================

/// A variant row locked for the duration of a checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LockedVariant {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    pub sku: String,
    pub size: VariantSize,
    pub price: Decimal,
    pub stock: i32,
}

/// A product row locked for lines that carry no variant.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LockedProduct {
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    pub sku: String,
    pub price: Decimal,
    pub stock: i32,
}

/// An order line ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub size: Option<VariantSize>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Lock the given variants of active products, in id order.
///
/// Missing variants and variants of inactive products are absent from the
/// result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_variants(
    conn: &mut PgConnection,
    ids: &[VariantId],
) -> Result<Vec<LockedVariant>, RepositoryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, LockedVariant>(
        r"
        SELECT v.id AS variant_id, v.product_id, p.title, p.slug, p.sku,
               v.size, v.price_pkr AS price, v.stock
        FROM shop.product_variants v
        JOIN shop.products p ON p.id = v.product_id
        WHERE v.id = ANY($1) AND p.is_active
        ORDER BY v.id
        FOR UPDATE OF v
        ",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Lock the given active products, in id order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<LockedProduct>, RepositoryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, LockedProduct>(
        r"
        SELECT id AS product_id, title, slug, sku, price_pkr AS price, stock
        FROM shop.products
        WHERE id = ANY($1) AND is_active
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Insert the order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: Option<UserId>,
    total_amount: Decimal,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    shipping_address: &ShippingAddress,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO shop.orders AS o
            (user_id, total_amount, payment_method, payment_status, shipping_address)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING o.id, o.user_id, o.total_amount, o.status, o.payment_method,
                  o.payment_status, o.shipping_address, o.created_at, o.updated_at
        ",
    )
    .bind(user_id)
    .bind(total_amount)
    .bind(payment_method)
    .bind(payment_status)
    .bind(Json(shipping_address))
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Insert one order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError> {
    let row = sqlx::query_as::<_, OrderItem>(
        r"
        INSERT INTO shop.order_items (order_id, product_id, variant_id, size, price, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, order_id, product_id, variant_id, size, price, quantity
        ",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .bind(item.size)
    .bind(item.price)
    .bind(item.quantity)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Subtract `quantity` from a locked variant's stock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the stock would go negative.
pub async fn decrement_variant_stock(
    conn: &mut PgConnection,
    id: VariantId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE shop.product_variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!("stock changed for variant {id}")));
    }
    Ok(())
}

/// Subtract `quantity` from a locked product's own stock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the stock would go negative.
pub async fn decrement_product_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result =
        sqlx::query("UPDATE shop.products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!("stock changed for product {id}")));
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reading and administering orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Lines of the given orders with product title, slug and SKU.
    async fn items_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItemDetail>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, OrderItemDetail>(
            r"
            SELECT i.id, i.order_id, i.product_id, i.variant_id, i.size, i.price, i.quantity,
                   p.title, p.slug, p.sku
            FROM shop.order_items i
            JOIN shop.products p ON p.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.order_id, i.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItemDetail>> = HashMap::new();
        for row in rows {
            grouped.entry(row.item.order_id).or_default().push(row);
        }
        Ok(grouped)
    }

    /// A user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders o WHERE o.user_id = $1 \
             ORDER BY o.created_at DESC, o.id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderWithItems {
                items: items.remove(&r.id).unwrap_or_default(),
                order: r.into(),
            })
            .collect())
    }

    /// One of a user's orders with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders o WHERE o.id = $1 AND o.user_id = $2"
        );
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut items = self.items_for(&[row.id]).await?;
        Ok(Some(OrderWithItems {
            items: items.remove(&row.id).unwrap_or_default(),
            order: row.into(),
        }))
    }

    /// Every order with customer details and lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminOrder>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, u.name AS user_name, u.email AS user_email \
             FROM shop.orders o LEFT JOIN shop.users u ON u.id = o.user_id \
             ORDER BY o.created_at DESC, o.id DESC"
        );
        let rows = sqlx::query_as::<_, AdminOrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| AdminOrder {
                items: items.remove(&r.order.id).unwrap_or_default(),
                user_name: r.user_name,
                user_email: r.user_email,
                order: r.order.into(),
            })
            .collect())
    }

    /// Update fulfilment and/or payment status. `None` leaves a field as is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE shop.orders AS o
            SET status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status)
            WHERE o.id = $1
            RETURNING o.id, o.user_id, o.total_amount, o.status, o.payment_method,
                      o.payment_status, o.shipping_address, o.created_at, o.updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
