//! Batch store: the catalog of inventory batches
//!
//! One row per received lot of a product. Batches are never deleted;
//! they are the audit trail behind the movement ledger. The FEFO policy
//! lives entirely in the ordering of `active_batches_for_product`.

use chrono::{Datelike, DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::allocation::BatchAvailability;
use shared::validation::{validate_batch_intake, validate_batch_number};

use crate::error::{AppError, AppResult};

/// Batch store service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Depleted,
    Expired,
}

/// Provenance of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchSource {
    GoodsReceipt,
    Adjustment,
}

/// An inventory batch: a discrete, independently costed and expiry-dated
/// lot of a product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_number: String,
    pub source_type: BatchSource,
    pub source_id: Option<Uuid>,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub received_date: NaiveDate,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryBatch {
    pub fn availability(&self) -> BatchAvailability {
        BatchAvailability {
            batch_id: self.id,
            batch_number: self.batch_number.clone(),
            remaining_quantity: self.remaining_quantity,
            cost_price: self.cost_price,
            expiry_date: self.expiry_date,
        }
    }
}

/// Input for creating a batch
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: Uuid,
    pub batch_number: String,
    pub source_type: BatchSource,
    pub source_id: Option<Uuid>,
    pub quantity: Decimal,
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub received_date: NaiveDate,
}

const BATCH_COLUMNS: &str = "id, product_id, batch_number, source_type, source_id, quantity, \
     remaining_quantity, cost_price, expiry_date, received_date, status, created_at, updated_at";

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active batches of a product in FEFO order: earliest expiry first,
    /// never-expiring last, ties broken by received date then id. This
    /// ordering is the allocation policy; the planner just walks it.
    /// Past-expiry batches are excluded by date, whether or not their
    /// stored status has been recomputed since they lapsed.
    pub async fn active_batches_for_product(
        &self,
        product_id: Uuid,
    ) -> AppResult<Vec<InventoryBatch>> {
        let batches = sqlx::query_as::<_, InventoryBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS}
            FROM inventory_batches
            WHERE product_id = $1 AND status = 'active' AND remaining_quantity > 0
              AND (expiry_date IS NULL OR expiry_date >= CURRENT_DATE)
            ORDER BY expiry_date ASC NULLS LAST, received_date ASC, id ASC
            "#,
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// All batches of a product, newest first. Depleted and expired
    /// batches stay visible as audit history.
    pub async fn batches_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryBatch>> {
        let batches = sqlx::query_as::<_, InventoryBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS}
            FROM inventory_batches
            WHERE product_id = $1
            ORDER BY received_date DESC, created_at DESC
            "#,
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// FEFO ordering with `FOR UPDATE` row locks. Only callable inside a
    /// transaction; this is the read step of the allocate-and-commit
    /// critical sequence.
    pub(crate) async fn active_batches_for_update(
        conn: &mut PgConnection,
        product_id: Uuid,
    ) -> AppResult<Vec<InventoryBatch>> {
        let batches = sqlx::query_as::<_, InventoryBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS}
            FROM inventory_batches
            WHERE product_id = $1 AND status = 'active' AND remaining_quantity > 0
              AND (expiry_date IS NULL OR expiry_date >= CURRENT_DATE)
            ORDER BY expiry_date ASC NULLS LAST, received_date ASC, id ASC
            FOR UPDATE
            "#,
        ))
        .bind(product_id)
        .fetch_all(conn)
        .await?;

        Ok(batches)
    }

    /// Lock a single batch for update.
    pub(crate) async fn lock_batch(
        conn: &mut PgConnection,
        batch_id: Uuid,
    ) -> AppResult<InventoryBatch> {
        sqlx::query_as::<_, InventoryBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE id = $1 FOR UPDATE",
        ))
        .bind(batch_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))
    }

    /// Create a batch. Duplicate batch numbers are a fatal input error,
    /// surfaced as `DuplicateBatchNumber` via the unique constraint.
    pub(crate) async fn create_batch(
        conn: &mut PgConnection,
        input: NewBatch,
    ) -> AppResult<InventoryBatch> {
        validate_batch_intake(input.quantity, input.cost_price)
            .map_err(|msg| AppError::InvalidInput(msg.to_string()))?;
        validate_batch_number(&input.batch_number).map_err(|msg| AppError::Validation {
            field: "batch_number".to_string(),
            message: msg.to_string(),
        })?;

        sqlx::query_as::<_, InventoryBatch>(&format!(
            r#"
            INSERT INTO inventory_batches (
                product_id, batch_number, source_type, source_id,
                quantity, remaining_quantity, cost_price,
                expiry_date, received_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, 'active')
            RETURNING {BATCH_COLUMNS}
            "#,
        ))
        .bind(input.product_id)
        .bind(&input.batch_number)
        .bind(input.source_type)
        .bind(input.source_id)
        .bind(input.quantity)
        .bind(input.cost_price)
        .bind(input.expiry_date)
        .bind(input.received_date)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateBatchNumber(input.batch_number.clone());
                }
            }
            e.into()
        })
    }

    /// Add `delta` (negative for debits) to a batch's remaining quantity
    /// and recompute its status. Fails with `InsufficientBatchQuantity`
    /// if the result would go negative; callers must never submit a delta
    /// larger than what the allocator reserved.
    ///
    /// Crate-private: every decrement must be paired with a ledger
    /// movement in the same transaction, so only the combined commit
    /// operations call this.
    pub(crate) async fn apply_quantity_delta(
        conn: &mut PgConnection,
        batch_id: Uuid,
        delta: Decimal,
    ) -> AppResult<InventoryBatch> {
        let updated = sqlx::query_as::<_, InventoryBatch>(&format!(
            r#"
            UPDATE inventory_batches
            SET remaining_quantity = remaining_quantity + $2,
                status = CASE
                    WHEN remaining_quantity + $2 <= 0 THEN 'depleted'
                    WHEN expiry_date IS NOT NULL AND expiry_date < CURRENT_DATE THEN 'expired'
                    ELSE 'active'
                END,
                updated_at = NOW()
            WHERE id = $1 AND remaining_quantity + $2 >= 0
            RETURNING {BATCH_COLUMNS}
            "#,
        ))
        .bind(batch_id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(batch) => Ok(batch),
            None => {
                // Distinguish a missing batch from an oversized debit
                let remaining = sqlx::query_scalar::<_, Decimal>(
                    "SELECT remaining_quantity FROM inventory_batches WHERE id = $1",
                )
                .bind(batch_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

                Err(AppError::InsufficientBatchQuantity {
                    batch_id,
                    requested: -delta,
                    remaining,
                })
            }
        }
    }

    /// Generate a unique, human-readable batch number: B-YYYY-NNNNN.
    pub(crate) async fn generate_batch_number(conn: &mut PgConnection) -> AppResult<String> {
        let sequence: i64 = sqlx::query_scalar("SELECT nextval('batch_number_seq')")
            .fetch_one(conn)
            .await?;

        Ok(format!("B-{}-{:05}", Utc::now().year(), sequence))
    }

    /// Cost of the most recently received active batch, if any. Used as
    /// the cost variance baseline in `previous_batch` mode.
    pub(crate) async fn latest_active_cost(
        conn: &mut PgConnection,
        product_id: Uuid,
    ) -> AppResult<Option<Decimal>> {
        let cost = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT cost_price
            FROM inventory_batches
            WHERE product_id = $1 AND status = 'active' AND remaining_quantity > 0
              AND (expiry_date IS NULL OR expiry_date >= CURRENT_DATE)
            ORDER BY received_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(cost)
    }
}
