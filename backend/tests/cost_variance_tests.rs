//! Cost variance classification tests
//!
//! Covers severity banding, the reporting floor, and the unit-multiple
//! suppression heuristic for unit-of-measure entry mistakes.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::variance::{classify_cost_variance, CostVarianceAlert, VarianceSeverity, VarianceThresholds};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn classify(baseline: Decimal, new_cost: Decimal, thresholds: &VarianceThresholds) -> Option<CostVarianceAlert> {
    classify_cost_variance(Uuid::new_v4(), "B-2025-00042", baseline, new_cost, thresholds)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Baseline 100, new cost 155: +55% lands in the HIGH band.
    #[test]
    fn test_high_band_at_55_percent() {
        let alert = classify(dec("100"), dec("155"), &VarianceThresholds::default())
            .expect("should alert");
        assert_eq!(alert.severity, VarianceSeverity::High);
        assert_eq!(alert.change_percentage, dec("55"));
    }

    /// +25% is MEDIUM, +10% is LOW.
    #[test]
    fn test_medium_and_low_bands() {
        let thresholds = VarianceThresholds::default();

        let medium = classify(dec("100"), dec("125"), &thresholds).unwrap();
        assert_eq!(medium.severity, VarianceSeverity::Medium);

        let low = classify(dec("100"), dec("110"), &thresholds).unwrap();
        assert_eq!(low.severity, VarianceSeverity::Low);
    }

    /// Band edges are inclusive: exactly 20% is MEDIUM, exactly 50% HIGH.
    #[test]
    fn test_band_edges_inclusive() {
        let thresholds = VarianceThresholds::default();

        let at_medium = classify(dec("100"), dec("120"), &thresholds).unwrap();
        assert_eq!(at_medium.severity, VarianceSeverity::Medium);

        let at_high = classify(dec("100"), dec("150"), &thresholds).unwrap();
        assert_eq!(at_high.severity, VarianceSeverity::High);
    }

    /// Decreases classify by magnitude: 100 -> 40 is -60%, HIGH.
    #[test]
    fn test_decrease_classified_by_magnitude() {
        let alert = classify(dec("100"), dec("40"), &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
        assert_eq!(alert.change_percentage, dec("-60"));
    }

    /// A clean 3x jump looks like a unit-of-measure entry mistake and is
    /// suppressed by default.
    #[test]
    fn test_unit_multiple_suppressed() {
        assert!(classify(dec("100"), dec("300"), &VarianceThresholds::default()).is_none());
    }

    /// With suppression disabled the same 3x jump alerts as HIGH.
    #[test]
    fn test_unit_multiple_alerts_when_suppression_off() {
        let thresholds = VarianceThresholds {
            unit_multiple_suppression: false,
            ..VarianceThresholds::default()
        };
        let alert = classify(dec("100"), dec("300"), &thresholds).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    /// Suppression only covers the configured multiple range; a 250x
    /// ratio is outside it and still alerts.
    #[test]
    fn test_multiple_outside_range_still_alerts() {
        let alert = classify(dec("1"), dec("250"), &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    /// A non-integer ratio close to a multiple is not suppressed.
    #[test]
    fn test_near_multiple_not_suppressed() {
        let alert = classify(dec("100"), dec("301"), &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    /// Variances below the reporting floor produce no alert.
    #[test]
    fn test_reporting_floor() {
        let thresholds = VarianceThresholds {
            report_floor_percent: dec("5"),
            ..VarianceThresholds::default()
        };
        assert!(classify(dec("100"), dec("103"), &thresholds).is_none());
        assert!(classify(dec("100"), dec("106"), &thresholds).is_some());
    }

    /// No baseline means no comparison; zero or negative baselines never
    /// alert rather than dividing by zero.
    #[test]
    fn test_zero_baseline_never_alerts() {
        let thresholds = VarianceThresholds::default();
        assert!(classify(Decimal::ZERO, dec("50"), &thresholds).is_none());
        assert!(classify(dec("-1"), dec("50"), &thresholds).is_none());
    }

    /// The alert carries both costs so the log line is self-contained.
    #[test]
    fn test_alert_carries_costs() {
        let alert = classify(dec("10"), dec("16"), &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.previous_cost, dec("10"));
        assert_eq!(alert.new_cost, dec("16"));
        assert_eq!(alert.batch_number, "B-2025-00042");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 10000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The reported percentage always matches (new - baseline) / baseline.
        #[test]
        fn prop_percentage_is_exact(baseline in price_strategy(), new_cost in price_strategy()) {
            let thresholds = VarianceThresholds {
                unit_multiple_suppression: false,
                ..VarianceThresholds::default()
            };
            if let Some(alert) = classify(baseline, new_cost, &thresholds) {
                let expected = (new_cost - baseline) / baseline * Decimal::from(100);
                prop_assert_eq!(alert.change_percentage, expected);
            }
        }

        /// Severity is monotone in the magnitude of the change.
        #[test]
        fn prop_severity_matches_band(baseline in price_strategy(), new_cost in price_strategy()) {
            let thresholds = VarianceThresholds {
                unit_multiple_suppression: false,
                ..VarianceThresholds::default()
            };
            if let Some(alert) = classify(baseline, new_cost, &thresholds) {
                let magnitude = alert.change_percentage.abs();
                match alert.severity {
                    VarianceSeverity::High => prop_assert!(magnitude >= thresholds.high_percent),
                    VarianceSeverity::Medium => {
                        prop_assert!(magnitude >= thresholds.medium_percent);
                        prop_assert!(magnitude < thresholds.high_percent);
                    }
                    VarianceSeverity::Low => prop_assert!(magnitude < thresholds.medium_percent),
                }
            }
        }

        /// Clean integer multiples inside the configured range are always
        /// suppressed when the heuristic is on.
        #[test]
        fn prop_clean_multiples_suppressed(baseline in price_strategy(), factor in 2u32..=200u32) {
            let thresholds = VarianceThresholds::default();
            let new_cost = baseline * Decimal::from(factor);
            prop_assert!(classify(baseline, new_cost, &thresholds).is_none());
        }

        /// Whatever alerts with suppression on also alerts with it off:
        /// the heuristic only removes alerts, never adds them.
        #[test]
        fn prop_suppression_only_removes(baseline in price_strategy(), new_cost in price_strategy()) {
            let on = VarianceThresholds::default();
            let off = VarianceThresholds { unit_multiple_suppression: false, ..on.clone() };
            if classify(baseline, new_cost, &on).is_some() {
                prop_assert!(classify(baseline, new_cost, &off).is_some());
            }
        }
    }
}
