//! Manual stock adjustments
//!
//! Signed quantity corrections with a mandatory reason. Negative
//! adjustments debit stock FEFO through the same locked plan-and-commit
//! path as sales: shelf life leaving the building should always be the
//! shortest first. Positive adjustments introduce found stock as a new
//! batch so the audit trail records where the quantity came from.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::validation::validate_adjustment_reason;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::allocation::{AllocationService, BatchDebit, MovementReference};
use crate::services::batch::{BatchService, BatchSource, NewBatch};
use crate::services::movement::{MovementService, MovementType, NewMovement};
use crate::services::product;

/// Stock adjustment service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
    config: Arc<Config>,
}

/// Why stock was adjusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Damage,
    Theft,
    Expiry,
    CountCorrection,
    Other,
}

/// Input for a manual adjustment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdjustmentInput {
    pub product_id: Uuid,
    /// Signed: positive introduces stock, negative removes it
    pub quantity: Decimal,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
    pub adjustment_type: AdjustmentType,
    /// Only meaningful for positive adjustments
    pub expiry_date: Option<NaiveDate>,
    pub performed_by: Uuid,
}

/// Result of a committed adjustment
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentResult {
    pub product_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub quantity: Decimal,
    pub movement_ids: Vec<Uuid>,
    /// Batches debited by a negative adjustment
    pub debits: Vec<BatchDebit>,
    /// Batch created by a positive adjustment
    pub created_batch_id: Option<Uuid>,
    pub quantity_on_hand: Decimal,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Damage => "damage",
            AdjustmentType::Theft => "theft",
            AdjustmentType::Expiry => "expiry",
            AdjustmentType::CountCorrection => "count_correction",
            AdjustmentType::Other => "other",
        }
    }
}

impl AdjustmentService {
    /// Create a new AdjustmentService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Apply a signed quantity correction through the movement ledger.
    pub async fn adjust(&self, input: AdjustmentInput) -> AppResult<AdjustmentResult> {
        if input.quantity == Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Adjustment quantity cannot be zero".to_string(),
            ));
        }
        validate_adjustment_reason(&input.reason, self.config.inventory.adjustment_reason_min_len)
            .map_err(|msg| AppError::Validation {
                field: "reason".to_string(),
                message: msg.to_string(),
            })?;

        if input.quantity < Decimal::ZERO {
            self.adjust_out(input).await
        } else {
            self.adjust_in(input).await
        }
    }

    /// Negative adjustment: FEFO debit, same locking and retry semantics
    /// as a sale commit.
    async fn adjust_out(&self, input: AdjustmentInput) -> AppResult<AdjustmentResult> {
        let reference = MovementReference {
            reference_type: Some("stock_adjustment".to_string()),
            reference_id: None,
            reference_number: Some(input.adjustment_type.as_str().to_string()),
            notes: Some(input.reason.clone()),
        };

        let outcome = AllocationService::new(self.db.clone(), self.config.clone())
            .execute_outflow(
                input.product_id,
                -input.quantity,
                MovementType::Adjustment,
                reference,
                input.performed_by,
            )
            .await?;

        Ok(AdjustmentResult {
            product_id: input.product_id,
            adjustment_type: input.adjustment_type,
            quantity: input.quantity,
            movement_ids: outcome.movement_ids,
            debits: outcome.debits,
            created_batch_id: None,
            quantity_on_hand: outcome.quantity_on_hand,
        })
    }

    /// Positive adjustment: found stock enters as a new batch tagged with
    /// the adjustment provenance, costed at the product's current cost.
    async fn adjust_in(&self, input: AdjustmentInput) -> AppResult<AdjustmentResult> {
        let mut tx = self.db.begin().await?;

        let product = product::lock_product(&mut tx, input.product_id).await?;
        let batch_number = BatchService::generate_batch_number(&mut tx).await?;

        let batch = BatchService::create_batch(
            &mut tx,
            NewBatch {
                product_id: input.product_id,
                batch_number,
                source_type: BatchSource::Adjustment,
                source_id: None,
                quantity: input.quantity,
                cost_price: product.cost_price,
                expiry_date: input.expiry_date,
                received_date: Utc::now().date_naive(),
            },
        )
        .await?;

        let movement = MovementService::record(
            &mut tx,
            NewMovement {
                product_id: input.product_id,
                batch_id: Some(batch.id),
                movement_type: MovementType::Adjustment,
                quantity: input.quantity,
                cost_price: Some(product.cost_price),
                reference_type: Some("stock_adjustment".to_string()),
                reference_id: None,
                reference_number: Some(input.adjustment_type.as_str().to_string()),
                notes: Some(input.reason.clone()),
                created_by: input.performed_by,
            },
        )
        .await?;

        let quantity_on_hand =
            product::adjust_on_hand(&mut tx, input.product_id, input.quantity).await?;

        tx.commit().await?;

        Ok(AdjustmentResult {
            product_id: input.product_id,
            adjustment_type: input.adjustment_type,
            quantity: input.quantity,
            movement_ids: vec![movement.id],
            debits: Vec::new(),
            created_batch_id: Some(batch.id),
            quantity_on_hand,
        })
    }
}
