//! FEFO allocation and the allocate-and-commit critical sequence
//!
//! `allocate` is a read-only preview; nothing is reserved. Committing a
//! plan locks the chosen batch rows, debits them, and appends one ledger
//! movement per debit, all inside a single transaction, so two concurrent
//! sales can never both read the same remaining quantity and oversell.
//! Serialization failures and lock timeouts retry the whole sequence from
//! the locked read, never mid-way.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::allocation::{plan_allocation, AllocationError, AllocationPlan};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::batch::{BatchService, BatchStatus};
use crate::services::movement::{MovementService, MovementType, NewMovement};
use crate::services::product;

/// Allocation service
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
    config: Arc<Config>,
}

/// Business document that caused an outflow, stamped onto each movement.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MovementReference {
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

/// One committed batch debit.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDebit {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub quantity: Decimal,
    pub remaining_after: Decimal,
    pub status: BatchStatus,
}

/// Result of a committed allocation or negative adjustment.
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub product_id: Uuid,
    pub committed_quantity: Decimal,
    pub movement_ids: Vec<Uuid>,
    pub debits: Vec<BatchDebit>,
    pub quantity_on_hand: Decimal,
}

/// Postgres codes that indicate a retryable transaction failure:
/// serialization_failure, deadlock_detected, lock_not_available.
const RETRYABLE_SQLSTATE: [&str; 3] = ["40001", "40P01", "55P03"];

fn is_retryable_sql(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| RETRYABLE_SQLSTATE.contains(&code.as_ref()))
}

fn map_plan_error(err: AllocationError) -> AppError {
    match err {
        AllocationError::NonPositiveQuantity(q) => {
            AppError::InvalidInput(format!("Requested quantity must be positive, got {}", q))
        }
        AllocationError::InsufficientStock {
            requested,
            available,
            shortfall,
        } => AppError::InsufficientStock {
            requested,
            available,
            shortfall,
        },
        AllocationError::MalformedPlan(msg) => AppError::InvalidInput(msg),
    }
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Read-only FEFO preview. Fetches the product's active batches in
    /// FEFO order and plans without locking or mutating anything, so a
    /// sale that ultimately fails payment never touches stock.
    pub async fn allocate(
        &self,
        product_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<AllocationPlan> {
        let mut conn = self.db.acquire().await?;
        product::ensure_product_exists(&mut conn, product_id).await?;
        drop(conn);

        let batches = BatchService::new(self.db.clone())
            .active_batches_for_product(product_id)
            .await?;
        let availability: Vec<_> = batches.iter().map(|b| b.availability()).collect();

        plan_allocation(product_id, quantity, &availability).map_err(map_plan_error)
    }

    /// Commit a previously previewed plan. The plan arrives from the
    /// client, so it is validated first: positive entries covering
    /// exactly the requested quantity, every batch owned by the plan's
    /// product. The batches are then locked and re-verified; if any no
    /// longer holds the planned quantity the commit fails with
    /// `ConcurrencyConflict` and the caller should re-allocate.
    pub async fn commit_plan(
        &self,
        plan: &AllocationPlan,
        reference: MovementReference,
        performed_by: Uuid,
    ) -> AppResult<CommitOutcome> {
        if plan.entries.is_empty() {
            return Err(AppError::InvalidInput(
                "Allocation plan has no entries".to_string(),
            ));
        }
        plan.check_consistency().map_err(map_plan_error)?;

        let mut tx = self.db.begin().await?;

        for entry in &plan.entries {
            let batch = BatchService::lock_batch(&mut tx, entry.batch_id).await?;
            if batch.product_id != plan.product_id {
                tx.rollback().await?;
                return Err(AppError::InvalidInput(format!(
                    "Batch {} does not belong to product {}",
                    entry.batch_number, plan.product_id
                )));
            }
            if batch.remaining_quantity < entry.quantity || batch.status != BatchStatus::Active {
                tx.rollback().await?;
                return Err(AppError::ConcurrencyConflict(format!(
                    "Batch {} changed since the plan was computed",
                    entry.batch_number
                )));
            }
        }

        let outcome = debit_plan(
            &mut tx,
            plan,
            MovementType::Sale,
            &reference,
            performed_by,
        )
        .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    /// The full critical sequence in one call: lock the product's FEFO
    /// batches, plan, debit, record movements, and sync the product
    /// total, all in one transaction. Retried as a whole, bounded by
    /// configuration, when the database reports a serialization failure
    /// or lock timeout.
    pub async fn allocate_and_commit(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        reference: MovementReference,
        performed_by: Uuid,
    ) -> AppResult<CommitOutcome> {
        self.execute_outflow(
            product_id,
            quantity,
            MovementType::Sale,
            reference,
            performed_by,
        )
        .await
    }

    /// Shared outflow path for sales and negative adjustments.
    pub(crate) async fn execute_outflow(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        movement_type: MovementType,
        reference: MovementReference,
        performed_by: Uuid,
    ) -> AppResult<CommitOutcome> {
        let max_retries = self.config.inventory.allocation_max_retries;
        let mut attempt = 0;

        loop {
            match self
                .try_outflow(product_id, quantity, movement_type, &reference, performed_by)
                .await
            {
                Err(AppError::Database(e)) if is_retryable_sql(&e) && attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        %product_id,
                        %quantity,
                        attempt,
                        "retrying allocation after transaction conflict: {}",
                        e
                    );
                }
                Err(AppError::Database(e)) if is_retryable_sql(&e) => {
                    return Err(AppError::ConcurrencyConflict(format!(
                        "Allocation gave up after {} retries: {}",
                        max_retries, e
                    )));
                }
                other => return other,
            }
        }
    }

    async fn try_outflow(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        movement_type: MovementType,
        reference: &MovementReference,
        performed_by: Uuid,
    ) -> AppResult<CommitOutcome> {
        let mut tx = self.db.begin().await?;

        product::ensure_product_exists(&mut tx, product_id).await?;

        let batches = BatchService::active_batches_for_update(&mut tx, product_id).await?;
        let availability: Vec<_> = batches.iter().map(|b| b.availability()).collect();
        let plan =
            plan_allocation(product_id, quantity, &availability).map_err(map_plan_error)?;

        let outcome = debit_plan(&mut tx, &plan, movement_type, reference, performed_by).await?;

        tx.commit().await?;
        Ok(outcome)
    }
}

/// Debit every batch in the plan and append its paired movement, then
/// sync the product's cached on-hand total. Runs inside the caller's
/// transaction; the pairing here is what keeps the ledger-sum invariant
/// true.
pub(crate) async fn debit_plan(
    conn: &mut PgConnection,
    plan: &AllocationPlan,
    movement_type: MovementType,
    reference: &MovementReference,
    performed_by: Uuid,
) -> AppResult<CommitOutcome> {
    let mut movement_ids = Vec::with_capacity(plan.entries.len());
    let mut debits = Vec::with_capacity(plan.entries.len());

    for entry in &plan.entries {
        let batch =
            BatchService::apply_quantity_delta(conn, entry.batch_id, -entry.quantity).await?;

        let movement = MovementService::record(
            conn,
            NewMovement {
                product_id: plan.product_id,
                batch_id: Some(entry.batch_id),
                movement_type,
                quantity: -entry.quantity,
                cost_price: Some(entry.cost_price),
                reference_type: reference.reference_type.clone(),
                reference_id: reference.reference_id,
                reference_number: reference.reference_number.clone(),
                notes: reference.notes.clone(),
                created_by: performed_by,
            },
        )
        .await?;

        movement_ids.push(movement.id);
        debits.push(BatchDebit {
            batch_id: batch.id,
            batch_number: batch.batch_number,
            quantity: entry.quantity,
            remaining_after: batch.remaining_quantity,
            status: batch.status,
        });
    }

    let total = plan.total_quantity();
    let quantity_on_hand = product::adjust_on_hand(conn, plan.product_id, -total).await?;

    Ok(CommitOutcome {
        product_id: plan.product_id,
        committed_quantity: total,
        movement_ids,
        debits,
        quantity_on_hand,
    })
}
