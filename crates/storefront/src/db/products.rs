//! Product repository: products, variants and database-recorded images.

use sqlx::{PgPool, Postgres, QueryBuilder};

use paw_core::{ProductId, VariantId};

use super::{RepositoryError, escape_like};
use crate::models::product::{
    Product, ProductChanges, ProductDraft, ProductFilter, ProductImage, ProductVariant, SortKey,
};

const PRODUCT_COLUMNS: &str = "id, title, slug, sku, description, price_pkr, category, stock, \
     is_active, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, size, price_pkr, stock, dimensions, product_code";

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products matching `filter`, in the filter's sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        qb.push(PRODUCT_COLUMNS);
        qb.push(" FROM shop.products WHERE is_active");

        if let Some(query) = &filter.query {
            let pattern = format!("%{}%", escape_like(query));
            qb.push(" AND (title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR description ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR sku ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price_pkr >= ");
            qb.push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price_pkr <= ");
            qb.push_bind(max);
        }

        qb.push(match filter.sort {
            SortKey::CreatedAt => " ORDER BY created_at ASC, id ASC",
            SortKey::Price => " ORDER BY price_pkr ASC, id ASC",
            SortKey::PriceDesc => " ORDER BY price_pkr DESC, id ASC",
        });

        let products = qb
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// List every product, including inactive ones, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products ORDER BY created_at DESC, id DESC"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Get a product by ID, whether active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get a product by ID if it is active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get(id).await?.filter(|p| p.is_active))
    }

    /// Variants of the given products, grouped by product and ordered
    /// small, medium, large within each product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM shop.product_variants \
             WHERE product_id = ANY($1) ORDER BY product_id, size"
        );
        let variants = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(product_ids)
            .fetch_all(self.pool)
            .await?;
        Ok(variants)
    }

    /// Variants of one product, ordered small, medium, large.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        self.variants_for(&[product_id]).await
    }

    /// Get a single variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM shop.product_variants WHERE id = $1");
        let variant = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(variant)
    }

    /// Database images of the given products, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let images = sqlx::query_as::<_, ProductImage>(
            r"
            SELECT id, product_id, url, size_label
            FROM shop.product_images
            WHERE product_id = ANY($1)
            ORDER BY product_id, id
            ",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }

    /// Database images of one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        self.images_for(&[product_id]).await
    }

    /// Insert a product with its variants and images in one transaction.
    ///
    /// Each image URL is recorded once per image size label.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let stock: i32 = draft.variants.iter().map(|v| v.stock).sum();
        let sql = format!(
            "INSERT INTO shop.products (title, slug, sku, description, price_pkr, category, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&draft.title)
            .bind(&draft.slug)
            .bind(&draft.sku)
            .bind(&draft.description)
            .bind(draft.price_pkr)
            .bind(draft.category)
            .bind(stock)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                RepositoryError::unique_violation(e, "a product with this SKU or title already exists")
            })?;

        for variant in &draft.variants {
            sqlx::query(
                r"
                INSERT INTO shop.product_variants
                    (product_id, size, price_pkr, stock, dimensions, product_code)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(product.id)
            .bind(variant.size)
            .bind(variant.price_pkr)
            .bind(variant.stock)
            .bind(&variant.dimensions)
            .bind(&variant.product_code)
            .execute(&mut *tx)
            .await?;
        }

        for url in &draft.images {
            for size in paw_core::ImageSize::ALL {
                sqlx::query(
                    "INSERT INTO shop.product_images (product_id, url, size_label) VALUES ($1, $2, $3)",
                )
                .bind(product.id)
                .bind(url)
                .bind(*size)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Apply a partial update. Absent fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new SKU or slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE shop.products SET \
                title = COALESCE($2, title), \
                slug = COALESCE($3, slug), \
                sku = COALESCE($4, sku), \
                description = COALESCE($5, description), \
                price_pkr = COALESCE($6, price_pkr), \
                category = COALESCE($7, category), \
                stock = COALESCE($8, stock), \
                is_active = COALESCE($9, is_active) \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.slug)
            .bind(&changes.sku)
            .bind(&changes.description)
            .bind(changes.price_pkr)
            .bind(changes.category)
            .bind(changes.stock)
            .bind(changes.is_active)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::unique_violation(e, "a product with this SKU or title already exists")
            })?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Variants, images, reviews and order lines cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
