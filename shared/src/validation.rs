//! Validation and derivation helpers for the inventory ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Batch lifecycle status, derivable from the other batch fields.
///
/// Persisted for indexable queries, but treated as a cached
/// classification: recompute with [`derive_batch_status`] and compare
/// rather than trusting a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStatus {
    Active,
    Depleted,
    Expired,
}

/// Compute batch status from remaining quantity and expiry.
///
/// Depletion wins over expiry: a batch with nothing left is depleted even
/// if its expiry date has also passed.
pub fn derive_batch_status(
    remaining_quantity: Decimal,
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> DerivedStatus {
    if remaining_quantity <= Decimal::ZERO {
        DerivedStatus::Depleted
    } else if expiry_date.is_some_and(|d| d < today) {
        DerivedStatus::Expired
    } else {
        DerivedStatus::Active
    }
}

/// Check a received quantity / cost pair for batch creation.
pub fn validate_batch_intake(quantity: Decimal, cost_price: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    if cost_price < Decimal::ZERO {
        return Err("Cost price cannot be negative");
    }
    Ok(())
}

/// Validate a manual adjustment reason against the configured minimum.
pub fn validate_adjustment_reason(reason: &str, min_len: usize) -> Result<(), &'static str> {
    if reason.trim().len() < min_len {
        return Err("Adjustment reason is too short");
    }
    Ok(())
}

/// Validate a caller-supplied batch number: non-empty, at most 64 chars,
/// printable ASCII without whitespace.
pub fn validate_batch_number(batch_number: &str) -> Result<(), &'static str> {
    if batch_number.is_empty() {
        return Err("Batch number cannot be empty");
    }
    if batch_number.len() > 64 {
        return Err("Batch number must be at most 64 characters");
    }
    if !batch_number.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Batch number must be printable ASCII without spaces");
    }
    Ok(())
}
