//! FEFO allocation planning
//!
//! The planner is a pure function over an already FEFO-ordered batch
//! sequence. It never mutates stock; committing a plan (debiting batches
//! and appending ledger movements) is a separate transactional step owned
//! by the backend.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A batch as seen by the planner: identity plus what is left to take.
///
/// The caller is responsible for supplying batches in FEFO order
/// (earliest expiry first, never-expiring last, ties broken by received
/// date then id) and restricted to active stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAvailability {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub remaining_quantity: Decimal,
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// One entry of an allocation plan: take `quantity` from `batch_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub quantity: Decimal,
    pub cost_price: Decimal,
}

/// Proposed distribution of a requested quantity across batches.
///
/// Transient: never persisted. The backend turns each entry into a stock
/// movement when the plan is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub product_id: Uuid,
    pub requested_quantity: Decimal,
    pub entries: Vec<AllocationEntry>,
}

impl AllocationPlan {
    /// Total quantity covered by the plan entries.
    pub fn total_quantity(&self) -> Decimal {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    /// Value of the allocated stock at batch cost.
    pub fn total_cost(&self) -> Decimal {
        self.entries.iter().map(|e| e.quantity * e.cost_price).sum()
    }

    /// Check a plan received from an untrusted caller. Plans built by
    /// [`plan_allocation`] always pass; a tampered one with a
    /// non-positive entry or entries that do not cover exactly the
    /// requested quantity is rejected before any batch is touched.
    pub fn check_consistency(&self) -> Result<(), AllocationError> {
        if self.requested_quantity <= Decimal::ZERO {
            return Err(AllocationError::NonPositiveQuantity(self.requested_quantity));
        }
        for entry in &self.entries {
            if entry.quantity <= Decimal::ZERO {
                return Err(AllocationError::MalformedPlan(format!(
                    "entry for batch {} has non-positive quantity {}",
                    entry.batch_number, entry.quantity
                )));
            }
        }
        let total = self.total_quantity();
        if total != self.requested_quantity {
            return Err(AllocationError::MalformedPlan(format!(
                "entries total {} but the plan requests {}",
                total, self.requested_quantity
            )));
        }
        Ok(())
    }
}

/// Planning failures. `InsufficientStock` carries the shortfall so callers
/// can decide between rejecting the transaction and backordering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("requested quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("insufficient stock: requested {requested}, available {available} (short {shortfall})")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("malformed allocation plan: {0}")]
    MalformedPlan(String),
}

/// Build an allocation plan by walking `batches` in the given order,
/// taking `min(outstanding, batch.remaining_quantity)` from each until the
/// request is covered.
///
/// Batches with nothing left are skipped rather than producing zero-sized
/// entries. Exhausting the sequence with an outstanding remainder fails
/// with the shortfall; a zero or negative request is rejected outright.
pub fn plan_allocation(
    product_id: Uuid,
    requested_quantity: Decimal,
    batches: &[BatchAvailability],
) -> Result<AllocationPlan, AllocationError> {
    if requested_quantity <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity(requested_quantity));
    }

    let mut outstanding = requested_quantity;
    let mut entries = Vec::new();

    for batch in batches {
        if outstanding == Decimal::ZERO {
            break;
        }
        if batch.remaining_quantity <= Decimal::ZERO {
            continue;
        }

        let take = outstanding.min(batch.remaining_quantity);
        entries.push(AllocationEntry {
            batch_id: batch.batch_id,
            batch_number: batch.batch_number.clone(),
            quantity: take,
            cost_price: batch.cost_price,
        });
        outstanding -= take;
    }

    if outstanding > Decimal::ZERO {
        let available = requested_quantity - outstanding;
        return Err(AllocationError::InsufficientStock {
            requested: requested_quantity,
            available,
            shortfall: outstanding,
        });
    }

    Ok(AllocationPlan {
        product_id,
        requested_quantity,
        entries,
    })
}

/// Sort batches into FEFO order: earliest expiry first, never-expiring
/// last, ties broken by received date then id.
///
/// The backend gets this ordering from SQL (`ORDER BY expiry_date ASC
/// NULLS LAST, received_date ASC, id ASC`); this helper exists for
/// in-memory callers and tests that need the same policy.
pub fn sort_fefo<T, F>(batches: &mut [T], key: F)
where
    F: Fn(&T) -> (Option<NaiveDate>, NaiveDate, Uuid),
{
    batches.sort_by(|a, b| {
        let (ae, ar, ai) = key(a);
        let (be, br, bi) = key(b);
        match (ae, be) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then(ar.cmp(&br))
        .then(ai.cmp(&bi))
    });
}
