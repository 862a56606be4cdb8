//! FEFO allocation planning tests
//!
//! Covers ordering (earliest real expiry first, never-expiring last),
//! partial fill across batches, shortfall reporting, and read-path
//! idempotence.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::allocation::{plan_allocation, sort_fefo, AllocationError, BatchAvailability};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).unwrap()
}

fn batch(number: &str, remaining: &str, cost: &str, expiry: Option<&str>) -> BatchAvailability {
    BatchAvailability {
        batch_id: Uuid::new_v4(),
        batch_number: number.to_string(),
        remaining_quantity: dec(remaining),
        cost_price: dec(cost),
        expiry_date: expiry.map(date),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Allocation order for expiries [2025-01-01, null, 2024-06-01] with
    /// equal received dates must be 2024-06-01, 2025-01-01, null.
    #[test]
    fn test_fefo_order_nulls_last() {
        let received = date("2024-01-10");
        let mut batches = vec![
            batch("B-jan25", "10", "1", Some("2025-01-01")),
            batch("B-never", "10", "1", None),
            batch("B-jun24", "10", "1", Some("2024-06-01")),
        ];
        sort_fefo(&mut batches, |b| (b.expiry_date, received, b.batch_id));

        let plan = plan_allocation(Uuid::new_v4(), dec("25"), &batches).unwrap();
        let order: Vec<&str> = plan.entries.iter().map(|e| e.batch_number.as_str()).collect();
        assert_eq!(order, vec!["B-jun24", "B-jan25", "B-never"]);
        assert_eq!(plan.entries[2].quantity, dec("5"));
    }

    /// Batches of 5 and 3 remaining; requesting 6 yields [(b1,5),(b2,1)].
    #[test]
    fn test_partial_fill() {
        let batches = [
            batch("B1", "5", "2.00", Some("2024-06-01")),
            batch("B2", "3", "2.10", Some("2025-01-01")),
        ];
        let plan = plan_allocation(Uuid::new_v4(), dec("6"), &batches).unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].quantity, dec("5"));
        assert_eq!(plan.entries[1].quantity, dec("1"));
        assert_eq!(plan.total_quantity(), dec("6"));
    }

    /// Requesting 10 against 5 + 3 fails with a shortfall of 2.
    #[test]
    fn test_shortfall_carries_amount() {
        let batches = [batch("B1", "5", "2.00", None), batch("B2", "3", "2.10", None)];
        let err = plan_allocation(Uuid::new_v4(), dec("10"), &batches).unwrap_err();

        match err {
            AllocationError::InsufficientStock { requested, available, shortfall } => {
                assert_eq!(requested, dec("10"));
                assert_eq!(available, dec("8"));
                assert_eq!(shortfall, dec("2"));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    /// Zero-length allocation is rejected, not silently accepted.
    #[test]
    fn test_zero_request_rejected() {
        let batches = [batch("B1", "5", "2.00", None)];
        let err = plan_allocation(Uuid::new_v4(), Decimal::ZERO, &batches).unwrap_err();
        assert!(matches!(err, AllocationError::NonPositiveQuantity(_)));
    }

    /// Planning repeatedly over the same unmutated sequence returns the
    /// same ordered plan.
    #[test]
    fn test_read_path_idempotent() {
        let batches = [
            batch("B1", "5", "2.00", Some("2024-06-01")),
            batch("B2", "7", "2.10", Some("2024-08-01")),
            batch("B3", "4", "2.20", None),
        ];
        let product_id = Uuid::new_v4();

        let first = plan_allocation(product_id, dec("14"), &batches).unwrap();
        let second = plan_allocation(product_id, dec("14"), &batches).unwrap();
        assert_eq!(first, second);
    }

    /// End-to-end scenario: receive 100 @ 10 (expiry 2025-12-01) then
    /// 50 @ 12 (no expiry); allocating 120 takes all of B1 then 20 of B2.
    #[test]
    fn test_end_to_end_receive_then_allocate() {
        let received = date("2025-01-05");
        let mut batches = vec![
            batch("B2", "50", "12", None),
            batch("B1", "100", "10", Some("2025-12-01")),
        ];
        sort_fefo(&mut batches, |b| (b.expiry_date, received, b.batch_id));

        let plan = plan_allocation(Uuid::new_v4(), dec("120"), &batches).unwrap();
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].batch_number, "B1");
        assert_eq!(plan.entries[0].quantity, dec("100"));
        assert_eq!(plan.entries[1].batch_number, "B2");
        assert_eq!(plan.entries[1].quantity, dec("20"));
        assert_eq!(plan.total_cost(), dec("1240"));
    }

    /// A client-submitted plan whose entry quantity was flipped negative
    /// is rejected before commit: a negative debit would silently mint
    /// stock through a sale movement.
    #[test]
    fn test_tampered_negative_entry_rejected() {
        let batches = [batch("B1", "5", "2.00", None)];
        let mut plan = plan_allocation(Uuid::new_v4(), dec("3"), &batches).unwrap();
        plan.entries[0].quantity = dec("-3");

        let err = plan.check_consistency().unwrap_err();
        assert!(matches!(err, AllocationError::MalformedPlan(_)));
    }

    /// A client-submitted plan whose entries were inflated past the
    /// requested quantity is rejected: entries must cover the request
    /// exactly.
    #[test]
    fn test_tampered_entry_total_rejected() {
        let batches = [
            batch("B1", "5", "2.00", Some("2024-06-01")),
            batch("B2", "3", "2.10", Some("2025-01-01")),
        ];
        let mut plan = plan_allocation(Uuid::new_v4(), dec("6"), &batches).unwrap();
        plan.entries[1].quantity = dec("3");

        let err = plan.check_consistency().unwrap_err();
        assert!(matches!(err, AllocationError::MalformedPlan(_)));
        assert!(plan_allocation(Uuid::new_v4(), dec("6"), &batches)
            .unwrap()
            .check_consistency()
            .is_ok());
    }

    /// Equal expiries fall back to received date, then id.
    #[test]
    fn test_tie_break_is_deterministic() {
        let expiry = Some(date("2025-03-01"));
        let older = date("2024-01-01");
        let newer = date("2024-02-01");

        let mut rows = vec![
            (expiry, newer, Uuid::new_v4(), "newer"),
            (expiry, older, Uuid::new_v4(), "older"),
        ];
        sort_fefo(&mut rows, |r| (r.0, r.1, r.2));
        assert_eq!(rows[0].3, "older");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating batch remaining quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    fn batches_strategy() -> impl Strategy<Value = Vec<BatchAvailability>> {
        prop::collection::vec((quantity_strategy(), 1i64..=100000i64), 1..10).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (remaining, cost))| BatchAvailability {
                    batch_id: Uuid::new_v4(),
                    batch_number: format!("B-{:03}", i),
                    remaining_quantity: remaining,
                    cost_price: Decimal::new(cost, 2),
                    expiry_date: None,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// A successful plan covers exactly the requested quantity.
        #[test]
        fn prop_plan_covers_request(batches in batches_strategy(), requested in quantity_strategy()) {
            if let Ok(plan) = plan_allocation(Uuid::new_v4(), requested, &batches) {
                prop_assert_eq!(plan.total_quantity(), requested);
            }
        }

        /// No entry ever takes more than its batch had available.
        #[test]
        fn prop_entries_bounded_by_availability(
            batches in batches_strategy(),
            requested in quantity_strategy()
        ) {
            if let Ok(plan) = plan_allocation(Uuid::new_v4(), requested, &batches) {
                for (entry, batch) in plan.entries.iter().zip(batches.iter()) {
                    prop_assert_eq!(entry.batch_id, batch.batch_id);
                    prop_assert!(entry.quantity > Decimal::ZERO);
                    prop_assert!(entry.quantity <= batch.remaining_quantity);
                }
            }
        }

        /// Planning succeeds iff the request fits the total availability,
        /// and failure reports the exact shortfall.
        #[test]
        fn prop_success_iff_stock_suffices(
            batches in batches_strategy(),
            requested in quantity_strategy()
        ) {
            let available: Decimal = batches.iter().map(|b| b.remaining_quantity).sum();
            match plan_allocation(Uuid::new_v4(), requested, &batches) {
                Ok(_) => prop_assert!(requested <= available),
                Err(AllocationError::InsufficientStock { shortfall, .. }) => {
                    prop_assert!(requested > available);
                    prop_assert_eq!(shortfall, requested - available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Entries appear in the same order as the input sequence: the
        /// planner never reorders, the ordering is the caller's policy.
        #[test]
        fn prop_plan_preserves_input_order(
            batches in batches_strategy(),
            requested in quantity_strategy()
        ) {
            if let Ok(plan) = plan_allocation(Uuid::new_v4(), requested, &batches) {
                let input_ids: Vec<_> = batches.iter().map(|b| b.batch_id).collect();
                let mut last_pos = 0;
                for entry in &plan.entries {
                    let pos = input_ids.iter().position(|id| *id == entry.batch_id).unwrap();
                    prop_assert!(pos >= last_pos);
                    last_pos = pos;
                }
            }
        }

        /// Every planner-built plan passes the untrusted-plan check used
        /// on the commit path.
        #[test]
        fn prop_planner_output_is_consistent(
            batches in batches_strategy(),
            requested in quantity_strategy()
        ) {
            if let Ok(plan) = plan_allocation(Uuid::new_v4(), requested, &batches) {
                prop_assert!(plan.check_consistency().is_ok());
            }
        }

        /// All batches before the last used one are fully drained: FEFO
        /// never skips usable shelf life.
        #[test]
        fn prop_earlier_batches_fully_consumed(
            batches in batches_strategy(),
            requested in quantity_strategy()
        ) {
            if let Ok(plan) = plan_allocation(Uuid::new_v4(), requested, &batches) {
                if plan.entries.len() > 1 {
                    for entry in &plan.entries[..plan.entries.len() - 1] {
                        let batch = batches.iter().find(|b| b.batch_id == entry.batch_id).unwrap();
                        prop_assert_eq!(entry.quantity, batch.remaining_quantity);
                    }
                }
            }
        }
    }
}
