//! HTTP handlers for stock adjustment endpoints

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::adjustment::{AdjustmentInput, AdjustmentResult, AdjustmentService};
use crate::AppState;

/// Apply a manual, signed stock adjustment
pub async fn create_adjustment(
    State(state): State<AppState>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<AdjustmentResult>> {
    input.validate().map_err(|e| AppError::Validation {
        field: "adjustment".to_string(),
        message: e.to_string(),
    })?;

    let service = AdjustmentService::new(state.db, state.config.clone());
    let result = service.adjust(input).await?;
    Ok(Json(result))
}
