//! Read-only inventory valuation and stock health reports
//!
//! Depends on the batch store only and never writes. Report correctness
//! rests entirely on the ledger invariants holding: on-hand totals here
//! are computed from active batch remainders, not the cached product
//! field, so drift between the two is visible rather than hidden.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Valuation reader service
#[derive(Clone)]
pub struct ValuationService {
    db: PgPool,
}

/// A product at or below its reorder threshold
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockProduct {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub on_hand: Decimal,
    pub reorder_level: Decimal,
}

/// A batch expiring within the requested window
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExpiringBatch {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub remaining_quantity: Decimal,
    pub expiry_date: NaiveDate,
}

/// Stock value of one product at batch cost
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductValuation {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: Decimal,
    pub value_at_cost: Decimal,
}

/// Valuation report: per-product rows plus totals
#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub products: Vec<ProductValuation>,
    pub total_quantity: Decimal,
    pub total_value_at_cost: Decimal,
}

impl ValuationService {
    /// Create a new ValuationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Products whose active-batch total is at or below a threshold: the
    /// explicit one when given, otherwise each product's reorder level.
    pub async fn low_stock(&self, threshold: Option<Decimal>) -> AppResult<Vec<LowStockProduct>> {
        let products = sqlx::query_as::<_, LowStockProduct>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name,
                   COALESCE(SUM(b.remaining_quantity), 0) AS on_hand,
                   p.reorder_level
            FROM products p
            LEFT JOIN inventory_batches b
                   ON b.product_id = p.id AND b.status = 'active'
                  AND (b.expiry_date IS NULL OR b.expiry_date >= CURRENT_DATE)
            GROUP BY p.id, p.sku, p.name, p.reorder_level
            HAVING COALESCE(SUM(b.remaining_quantity), 0) <= COALESCE($1, p.reorder_level)
            ORDER BY on_hand ASC, p.name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Active batches whose expiry falls within the next `days` days.
    pub async fn expiring_within(&self, days: i32) -> AppResult<Vec<ExpiringBatch>> {
        let batches = sqlx::query_as::<_, ExpiringBatch>(
            r#"
            SELECT b.id AS batch_id, b.batch_number, b.product_id, p.sku, p.name,
                   b.remaining_quantity, b.expiry_date
            FROM inventory_batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.status = 'active'
              AND b.remaining_quantity > 0
              AND b.expiry_date IS NOT NULL
              AND b.expiry_date <= CURRENT_DATE + $1
            ORDER BY b.expiry_date ASC, b.batch_number ASC
            "#,
        )
        .bind(days)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// Inventory value at batch cost, for one product or the whole store.
    pub async fn valuation(&self, product_id: Option<Uuid>) -> AppResult<ValuationReport> {
        let products = sqlx::query_as::<_, ProductValuation>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name,
                   COALESCE(SUM(b.remaining_quantity), 0) AS quantity,
                   COALESCE(SUM(b.remaining_quantity * b.cost_price), 0) AS value_at_cost
            FROM products p
            LEFT JOIN inventory_batches b
                   ON b.product_id = p.id AND b.status = 'active'
                  AND (b.expiry_date IS NULL OR b.expiry_date >= CURRENT_DATE)
            WHERE $1::uuid IS NULL OR p.id = $1
            GROUP BY p.id, p.sku, p.name
            ORDER BY p.name ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let total_quantity = products.iter().map(|p| p.quantity).sum();
        let total_value_at_cost = products.iter().map(|p| p.value_at_cost).sum();

        Ok(ValuationReport {
            products,
            total_quantity,
            total_value_at_cost,
        })
    }
}
