//! HTTP handlers for FEFO allocation endpoints

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::allocation::AllocationPlan;

use crate::error::AppResult;
use crate::services::allocation::{AllocationService, CommitOutcome, MovementReference};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CommitPlanRequest {
    pub plan: AllocationPlan,
    #[serde(default)]
    pub reference: MovementReference,
    pub performed_by: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteAllocationRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    pub reference: MovementReference,
    pub performed_by: Uuid,
}

/// Preview an allocation plan without touching stock
pub async fn allocate(
    State(state): State<AppState>,
    Json(input): Json<AllocateRequest>,
) -> AppResult<Json<AllocationPlan>> {
    let service = AllocationService::new(state.db, state.config.clone());
    let plan = service.allocate(input.product_id, input.quantity).await?;
    Ok(Json(plan))
}

/// Commit a previously previewed plan
pub async fn commit_allocation(
    State(state): State<AppState>,
    Json(input): Json<CommitPlanRequest>,
) -> AppResult<Json<CommitOutcome>> {
    let service = AllocationService::new(state.db, state.config.clone());
    let outcome = service
        .commit_plan(&input.plan, input.reference, input.performed_by)
        .await?;
    Ok(Json(outcome))
}

/// Allocate and commit in a single transaction
pub async fn execute_allocation(
    State(state): State<AppState>,
    Json(input): Json<ExecuteAllocationRequest>,
) -> AppResult<Json<CommitOutcome>> {
    let service = AllocationService::new(state.db, state.config.clone());
    let outcome = service
        .allocate_and_commit(
            input.product_id,
            input.quantity,
            input.reference,
            input.performed_by,
        )
        .await?;
    Ok(Json(outcome))
}
