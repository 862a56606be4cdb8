//! Movement ledger: append-only record of every quantity change
//!
//! Movements are immutable once written; corrections are new offsetting
//! movements, never edits. The signed sum of all movements for a product
//! equals its current quantity on hand.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Movement ledger service
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

/// What caused a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    GoodsReceipt,
    Adjustment,
    VoidReversal,
}

/// One immutable ledger entry. `quantity` is signed: positive is stock
/// in, negative is stock out.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub cost_price: Option<Decimal>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a movement
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub cost_price: Option<Decimal>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

/// Filters for listing movements
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilters {
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

const MOVEMENT_COLUMNS: &str = "id, product_id, batch_id, movement_type, quantity, cost_price, \
     reference_type, reference_id, reference_number, notes, created_by, created_at";

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a movement to the ledger. Zero-quantity movements are
    /// rejected: every entry must represent a real change.
    ///
    /// Crate-private: callers outside this module go through the combined
    /// commit operations so a batch decrement and its movement always
    /// land in the same transaction.
    pub(crate) async fn record(
        conn: &mut PgConnection,
        input: NewMovement,
    ) -> AppResult<StockMovement> {
        if input.quantity == Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Movement quantity cannot be zero".to_string(),
            ));
        }

        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            INSERT INTO stock_movements (
                product_id, batch_id, movement_type, quantity, cost_price,
                reference_type, reference_id, reference_number, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MOVEMENT_COLUMNS}
            "#,
        ))
        .bind(input.product_id)
        .bind(input.batch_id)
        .bind(input.movement_type)
        .bind(input.quantity)
        .bind(input.cost_price)
        .bind(&input.reference_type)
        .bind(input.reference_id)
        .bind(&input.reference_number)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(conn)
        .await?;

        Ok(movement)
    }

    /// List movements, newest first. All filters are optional.
    pub async fn list(&self, filters: MovementFilters) -> AppResult<Vec<StockMovement>> {
        let limit = filters.limit.unwrap_or(200).clamp(1, 1000);

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR batch_id = $2)
              AND ($3::varchar IS NULL OR movement_type = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6
            "#,
        ))
        .bind(filters.product_id)
        .bind(filters.batch_id)
        .bind(filters.movement_type)
        .bind(filters.from)
        .bind(filters.to)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Signed movement sum for a product. Equals the product's quantity
    /// on hand when the ledger invariant holds; used by reconciliation
    /// checks.
    pub async fn signed_sum(&self, product_id: Uuid) -> AppResult<Decimal> {
        let sum = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(quantity) FROM stock_movements WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(sum.unwrap_or(Decimal::ZERO))
    }
}
