//! HTTP handlers for the movement ledger read path

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::services::movement::{MovementFilters, MovementService, StockMovement};
use crate::AppState;

/// List ledger movements, newest first, with optional filters
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filters): Query<MovementFilters>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = MovementService::new(state.db);
    let movements = service.list(filters).await?;
    Ok(Json(movements))
}
