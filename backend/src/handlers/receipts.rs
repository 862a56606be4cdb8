//! HTTP handlers for goods receipt finalization

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::receipt::{ReceiptFinalization, ReceiptService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FinalizeReceiptRequest {
    pub performed_by: Uuid,
}

/// Finalize a draft goods receipt; returns the cost variance alerts
pub async fn finalize_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<Uuid>,
    Json(input): Json<FinalizeReceiptRequest>,
) -> AppResult<Json<ReceiptFinalization>> {
    let service = ReceiptService::new(state.db, state.config.clone());
    let result = service
        .finalize_receipt(receipt_id, input.performed_by)
        .await?;
    Ok(Json(result))
}
