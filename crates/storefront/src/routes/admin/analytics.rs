//! Store analytics for the admin dashboard.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use crate::db::analytics::{AnalyticsRepository, BestSeller, DailySales, StoreStats};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const SALES_WINDOW_DAYS: i32 = 30;
const BEST_SELLER_LIMIT: i64 = 10;

/// Build the analytics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show))
}

/// Body of `GET /api/admin/analytics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub sales_by_day: Vec<DailySales>,
    pub best_sellers: Vec<BestSeller>,
    pub stats: StoreStats,
}

/// Paid sales per day, best sellers and store totals.
///
/// # Errors
///
/// Returns a database error if a query fails.
#[instrument(skip_all)]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>> {
    let repo = AnalyticsRepository::new(state.pool());
    let (sales_by_day, best_sellers, stats) = tokio::try_join!(
        repo.sales_by_day(SALES_WINDOW_DAYS),
        repo.best_sellers(BEST_SELLER_LIMIT),
        repo.stats(),
    )?;
    Ok(Json(AnalyticsResponse {
        sales_by_day,
        best_sellers,
        stats,
    }))
}
