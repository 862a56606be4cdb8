//! Product master data collaborator
//!
//! Products are owned elsewhere in the back office; the ledger only reads
//! cost/reorder data and keeps `quantity_on_hand` synchronized in the
//! same transaction as every batch mutation. The field is a cache of the
//! batch totals, never independent truth.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_on_hand: Decimal,
    pub cost_price: Decimal,
    pub reorder_level: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fetch a product row, locking it for the current transaction.
pub(crate) async fn lock_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<ProductRow> {
    sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, sku, name, quantity_on_hand, cost_price, reorder_level,
               created_at, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Check that a product exists without locking it.
pub(crate) async fn ensure_product_exists(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(conn)
            .await?;

    if !exists {
        return Err(AppError::NotFound("Product".to_string()));
    }
    Ok(())
}

/// Apply a signed delta to the cached on-hand total. Must run in the same
/// transaction as the batch mutation it mirrors.
pub(crate) async fn adjust_on_hand(
    conn: &mut PgConnection,
    product_id: Uuid,
    delta: Decimal,
) -> AppResult<Decimal> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE products
        SET quantity_on_hand = quantity_on_hand + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING quantity_on_hand
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Record the latest received unit cost on the product.
pub(crate) async fn update_cost_price(
    conn: &mut PgConnection,
    product_id: Uuid,
    cost_price: Decimal,
) -> AppResult<()> {
    sqlx::query("UPDATE products SET cost_price = $2, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(cost_price)
        .execute(conn)
        .await?;

    Ok(())
}
