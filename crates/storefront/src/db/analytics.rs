//! Aggregate queries behind the admin analytics dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use paw_core::ProductId;

use super::RepositoryError;

/// Paid sales for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub order_count: i64,
    pub total_sales: Decimal,
}

/// A product ranked by units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BestSeller {
    pub id: ProductId,
    pub title: String,
    pub sku: String,
    pub total_sold: i64,
    pub total_revenue: Decimal,
}

/// Store-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_orders: i64,
    /// Sum over paid orders only.
    pub total_revenue: Decimal,
    pub total_products: i64,
    pub pending_reviews: i64,
}

/// Repository for analytics queries.
pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Paid sales grouped by day over the last `days` days, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_by_day(&self, days: i32) -> Result<Vec<DailySales>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailySales>(
            r"
            SELECT created_at::date AS date,
                   COUNT(*) AS order_count,
                   SUM(total_amount) AS total_sales
            FROM shop.orders
            WHERE payment_status = 'paid'
              AND created_at >= CURRENT_DATE - make_interval(days => $1)
            GROUP BY created_at::date
            ORDER BY date ASC
            ",
        )
        .bind(days)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Top `limit` products by units sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn best_sellers(&self, limit: i64) -> Result<Vec<BestSeller>, RepositoryError> {
        let rows = sqlx::query_as::<_, BestSeller>(
            r"
            SELECT p.id, p.title, p.sku,
                   SUM(i.quantity)::BIGINT AS total_sold,
                   SUM(i.price * i.quantity) AS total_revenue
            FROM shop.order_items i
            JOIN shop.products p ON p.id = i.product_id
            GROUP BY p.id, p.title, p.sku
            ORDER BY total_sold DESC, p.id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Order, revenue, product and pending-review totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<StoreStats, RepositoryError> {
        let stats = sqlx::query_as::<_, StoreStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM shop.orders) AS total_orders,
                (SELECT COALESCE(SUM(total_amount), 0) FROM shop.orders
                    WHERE payment_status = 'paid') AS total_revenue,
                (SELECT COUNT(*) FROM shop.products) AS total_products,
                (SELECT COUNT(*) FROM shop.reviews WHERE status = 'pending') AS pending_reviews
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}
