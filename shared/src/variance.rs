//! Cost variance classification for goods receipts
//!
//! When new stock arrives at a unit cost that differs materially from a
//! baseline (the previous batch cost or the product's current cost), the
//! receipt finalizer raises an alert so purchasing can review the price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much the cost moved, bucketed for triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceSeverity {
    Low,
    Medium,
    High,
}

/// Alert raised when received stock cost deviates from the baseline.
///
/// Transient: returned from receipt finalization and logged, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostVarianceAlert {
    pub product_id: Uuid,
    pub batch_number: String,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    pub change_percentage: Decimal,
    pub severity: VarianceSeverity,
}

/// Classification thresholds, all expressed in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceThresholds {
    /// |change| at or above this is Medium.
    pub medium_percent: Decimal,
    /// |change| at or above this is High.
    pub high_percent: Decimal,
    /// Changes with |change| below this produce no alert at all.
    pub report_floor_percent: Decimal,
    /// Suppress alerts where new/baseline is a clean integer multiple
    /// in `unit_multiple_min..=unit_multiple_max`. Such ratios usually
    /// mean a unit-of-measure mismatch corrected upstream, not a real
    /// price change. Config-gated because it can mask genuine changes.
    pub unit_multiple_suppression: bool,
    pub unit_multiple_min: u32,
    pub unit_multiple_max: u32,
}

impl Default for VarianceThresholds {
    fn default() -> Self {
        Self {
            medium_percent: Decimal::from(20),
            high_percent: Decimal::from(50),
            report_floor_percent: Decimal::ZERO,
            unit_multiple_suppression: true,
            unit_multiple_min: 2,
            unit_multiple_max: 200,
        }
    }
}

impl VarianceThresholds {
    fn severity_for(&self, change_abs: Decimal) -> VarianceSeverity {
        if change_abs >= self.high_percent {
            VarianceSeverity::High
        } else if change_abs >= self.medium_percent {
            VarianceSeverity::Medium
        } else {
            VarianceSeverity::Low
        }
    }

    fn is_unit_multiple(&self, baseline: Decimal, new_cost: Decimal) -> bool {
        if !self.unit_multiple_suppression || baseline <= Decimal::ZERO {
            return false;
        }
        let ratio = new_cost / baseline;
        let min = Decimal::from(self.unit_multiple_min);
        let max = Decimal::from(self.unit_multiple_max);
        ratio >= min && ratio <= max && ratio.fract() == Decimal::ZERO
    }
}

/// Classify a received cost against a baseline.
///
/// Returns `None` when no alert should be raised: zero/negative baseline
/// (nothing to compare against), change below the reporting floor, or a
/// suppressed unit-of-measure multiple.
pub fn classify_cost_variance(
    product_id: Uuid,
    batch_number: &str,
    baseline: Decimal,
    new_cost: Decimal,
    thresholds: &VarianceThresholds,
) -> Option<CostVarianceAlert> {
    if baseline <= Decimal::ZERO {
        return None;
    }

    let change_percentage = (new_cost - baseline) / baseline * Decimal::from(100);
    let change_abs = change_percentage.abs();

    if change_abs < thresholds.report_floor_percent {
        return None;
    }
    if thresholds.is_unit_multiple(baseline, new_cost) {
        return None;
    }

    Some(CostVarianceAlert {
        product_id,
        batch_number: batch_number.to_string(),
        previous_cost: baseline,
        new_cost,
        change_percentage,
        severity: thresholds.severity_for(change_abs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn classify(baseline: &str, new_cost: &str, thresholds: &VarianceThresholds) -> Option<CostVarianceAlert> {
        classify_cost_variance(Uuid::new_v4(), "B-2024-00001", dec(baseline), dec(new_cost), thresholds)
    }

    #[test]
    fn fifty_five_percent_increase_is_high() {
        let alert = classify("100", "155", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.change_percentage, dec("55"));
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    #[test]
    fn twenty_five_percent_is_medium() {
        let alert = classify("100", "125", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::Medium);
    }

    #[test]
    fn small_change_is_low() {
        let alert = classify("100", "100.2", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::Low);
        assert_eq!(alert.change_percentage, dec("0.2"));
    }

    #[test]
    fn small_change_below_floor_is_not_reported() {
        let thresholds = VarianceThresholds {
            report_floor_percent: dec("1"),
            ..VarianceThresholds::default()
        };
        assert!(classify("100", "100.2", &thresholds).is_none());
    }

    #[test]
    fn decreases_classify_on_absolute_change() {
        let alert = classify("100", "45", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.change_percentage, dec("-55"));
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    #[test]
    fn exact_triple_is_suppressed_as_unit_multiple() {
        assert!(classify("100", "300", &VarianceThresholds::default()).is_none());
    }

    #[test]
    fn exact_triple_reports_high_with_suppression_disabled() {
        let thresholds = VarianceThresholds {
            unit_multiple_suppression: false,
            ..VarianceThresholds::default()
        };
        let alert = classify("100", "300", &thresholds).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
        assert_eq!(alert.change_percentage, dec("200"));
    }

    #[test]
    fn multiple_outside_range_is_not_suppressed() {
        // 300x is beyond the plausible unit-of-measure range
        let alert = classify("1", "300", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    #[test]
    fn non_integer_multiple_is_not_suppressed() {
        let alert = classify("100", "250", &VarianceThresholds::default()).unwrap();
        assert_eq!(alert.severity, VarianceSeverity::High);
    }

    #[test]
    fn zero_baseline_yields_no_alert() {
        assert!(classify("0", "10", &VarianceThresholds::default()).is_none());
    }
}
