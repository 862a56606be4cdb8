//! HTTP handlers for valuation and stock health reports

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::valuation::{
    ExpiringBatch, LowStockProduct, ValuationReport, ValuationService,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    /// Explicit threshold; defaults to each product's reorder level
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: i32,
}

#[derive(Debug, Deserialize)]
pub struct ValuationQuery {
    pub product_id: Option<Uuid>,
}

/// Products at or below their reorder threshold
pub async fn low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<Vec<LowStockProduct>>> {
    let service = ValuationService::new(state.db);
    let products = service.low_stock(query.threshold).await?;
    Ok(Json(products))
}

/// Batches expiring within the requested window
pub async fn expiring_batches(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<ExpiringBatch>>> {
    let service = ValuationService::new(state.db);
    let batches = service.expiring_within(query.days).await?;
    Ok(Json(batches))
}

/// Inventory value at cost, per product and in total
pub async fn valuation(
    State(state): State<AppState>,
    Query(query): Query<ValuationQuery>,
) -> AppResult<Json<ValuationReport>> {
    let service = ValuationService::new(state.db);
    let report = service.valuation(query.product_id).await?;
    Ok(Json(report))
}
