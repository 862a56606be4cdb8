//! HTTP handlers for batch store endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::batch::{BatchService, InventoryBatch};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    /// When true, include depleted and expired batches
    #[serde(default)]
    pub include_inactive: bool,
}

/// List a product's batches. Default is the FEFO-ordered active set; with
/// `include_inactive=true` the full audit history, newest first.
pub async fn list_product_batches(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Vec<InventoryBatch>>> {
    let service = BatchService::new(state.db);
    let batches = if query.include_inactive {
        service.batches_for_product(product_id).await?
    } else {
        service.active_batches_for_product(product_id).await?
    };
    Ok(Json(batches))
}
