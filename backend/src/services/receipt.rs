//! Goods receipt finalization
//!
//! Drafts are produced by the procurement workflow elsewhere in the back
//! office; this service consumes them. Finalizing a receipt creates one
//! batch and one positive ledger movement per line and evaluates each
//! line's cost against a baseline. The whole receipt is one atomic unit:
//! any line failure rolls everything back and the receipt stays a draft.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::variance::{classify_cost_variance, CostVarianceAlert};

use crate::config::{Config, VarianceBaseline};
use crate::error::{AppError, AppResult};
use crate::services::batch::{BatchService, BatchSource, NewBatch};
use crate::services::movement::{MovementService, MovementType, NewMovement};
use crate::services::product;

/// Goods receipt finalizer service
#[derive(Clone)]
pub struct ReceiptService {
    db: PgPool,
    config: Arc<Config>,
}

/// Receipt lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Draft,
    Finalized,
}

/// A goods receipt header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoodsReceipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub supplier_name: Option<String>,
    pub status: ReceiptStatus,
    pub received_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub finalized_by: Option<Uuid>,
}

/// One draft receipt line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoodsReceiptItem {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub product_id: Uuid,
    pub received_quantity: Decimal,
    pub cost_price: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Summary of one batch created during finalization
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedBatch {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Result of finalizing a receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptFinalization {
    pub receipt_id: Uuid,
    pub receipt_number: String,
    pub batches: Vec<ReceivedBatch>,
    pub alerts: Vec<CostVarianceAlert>,
}

impl ReceiptService {
    /// Create a new ReceiptService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Finalize a draft receipt: per line, create a batch, append a
    /// goods-receipt movement, sync the product total and cost, and
    /// evaluate cost variance. Returns all alerts for the receipt; the
    /// caller decides whether high-severity alerts block anything.
    pub async fn finalize_receipt(
        &self,
        receipt_id: Uuid,
        performed_by: Uuid,
    ) -> AppResult<ReceiptFinalization> {
        let mut tx = self.db.begin().await?;

        let receipt = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            SELECT id, receipt_number, supplier_name, status, received_date,
                   created_at, finalized_at, finalized_by
            FROM goods_receipts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(receipt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Goods receipt".to_string()))?;

        if receipt.status != ReceiptStatus::Draft {
            return Err(AppError::Conflict {
                resource: "goods_receipt".to_string(),
                message: format!("Receipt {} is already finalized", receipt.receipt_number),
            });
        }

        let items = sqlx::query_as::<_, GoodsReceiptItem>(
            r#"
            SELECT id, receipt_id, product_id, received_quantity, cost_price,
                   batch_number, expiry_date
            FROM goods_receipt_items
            WHERE receipt_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(receipt_id)
        .fetch_all(&mut *tx)
        .await?;

        if items.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Receipt {} has no line items",
                receipt.receipt_number
            )));
        }

        let mut batches = Vec::with_capacity(items.len());
        let mut alerts = Vec::new();

        for item in &items {
            let (batch, alert) = self
                .finalize_line(&mut tx, &receipt, item, performed_by)
                .await?;
            batches.push(batch);
            if let Some(alert) = alert {
                alerts.push(alert);
            }
        }

        sqlx::query(
            r#"
            UPDATE goods_receipts
            SET status = 'finalized', finalized_at = NOW(), finalized_by = $2
            WHERE id = $1
            "#,
        )
        .bind(receipt_id)
        .bind(performed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        for alert in &alerts {
            tracing::warn!(
                product_id = %alert.product_id,
                batch_number = %alert.batch_number,
                change = %alert.change_percentage,
                severity = ?alert.severity,
                "cost variance detected during receipt finalization"
            );
        }

        Ok(ReceiptFinalization {
            receipt_id: receipt.id,
            receipt_number: receipt.receipt_number,
            batches,
            alerts,
        })
    }

    async fn finalize_line(
        &self,
        conn: &mut PgConnection,
        receipt: &GoodsReceipt,
        item: &GoodsReceiptItem,
        performed_by: Uuid,
    ) -> AppResult<(ReceivedBatch, Option<CostVarianceAlert>)> {
        let inventory = &self.config.inventory;
        let product = product::lock_product(conn, item.product_id).await?;

        // Baseline must be read before the new batch exists
        let baseline = match inventory.variance_baseline {
            VarianceBaseline::PreviousBatch => {
                BatchService::latest_active_cost(conn, item.product_id)
                    .await?
                    .unwrap_or(product.cost_price)
            }
            VarianceBaseline::ProductCost => product.cost_price,
        };

        let batch_number = match &item.batch_number {
            Some(number) => number.clone(),
            None => BatchService::generate_batch_number(conn).await?,
        };

        let batch = BatchService::create_batch(
            conn,
            NewBatch {
                product_id: item.product_id,
                batch_number: batch_number.clone(),
                source_type: BatchSource::GoodsReceipt,
                source_id: Some(receipt.id),
                quantity: item.received_quantity,
                cost_price: item.cost_price,
                expiry_date: item.expiry_date,
                received_date: receipt.received_date,
            },
        )
        .await?;

        MovementService::record(
            conn,
            NewMovement {
                product_id: item.product_id,
                batch_id: Some(batch.id),
                movement_type: MovementType::GoodsReceipt,
                quantity: item.received_quantity,
                cost_price: Some(item.cost_price),
                reference_type: Some("goods_receipt".to_string()),
                reference_id: Some(receipt.id),
                reference_number: Some(receipt.receipt_number.clone()),
                notes: None,
                created_by: performed_by,
            },
        )
        .await?;

        product::adjust_on_hand(conn, item.product_id, item.received_quantity).await?;
        product::update_cost_price(conn, item.product_id, item.cost_price).await?;

        let alert = classify_cost_variance(
            item.product_id,
            &batch_number,
            baseline,
            item.cost_price,
            &inventory.variance_thresholds(),
        );

        Ok((
            ReceivedBatch {
                batch_id: batch.id,
                batch_number: batch.batch_number,
                product_id: batch.product_id,
                quantity: batch.quantity,
                cost_price: batch.cost_price,
                expiry_date: batch.expiry_date,
            },
            alert,
        ))
    }
}
