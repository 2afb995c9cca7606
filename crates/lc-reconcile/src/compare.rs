//! Comparison rules. Pure: no IO, no clock.

use lc_config::{CheckDef, CheckRule};
use lc_query::{ScalarKind, ScalarValue};

use crate::{Discrepancy, DiscrepancyReport, Verdict};

/// Scalars observed for one check.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub check: CheckDef,
    pub gold: ScalarValue,
    pub silver: ScalarValue,
}

/// Numeric type both sides of a check are read as.
pub fn scalar_kind(rule: &CheckRule) -> ScalarKind {
    match rule {
        CheckRule::ExactInteger => ScalarKind::Integer,
        CheckRule::RoundedDecimal { .. } => ScalarKind::Float,
    }
}

/// Round to `decimals` places on the exact binary value, ties to even.
///
/// Goes through fixed-precision formatting: scaling by a power of ten first
/// adds its own error (`50000.125 * 100` lands above the tie).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// `None` when the two values agree under `rule`.
pub fn compare(check: &CheckDef, gold: ScalarValue, silver: ScalarValue) -> Option<Discrepancy> {
    let agrees = match &check.rule {
        CheckRule::ExactInteger => match (gold.as_i64(), silver.as_i64()) {
            (Some(g), Some(s)) => g == s,
            // a float on either side of an integer check never matches
            _ => false,
        },
        CheckRule::RoundedDecimal {
            decimals,
            tolerance,
        } => {
            let g = round_to(gold.as_f64(), *decimals);
            let s = round_to(silver.as_f64(), *decimals);
            (g - s).abs() <= *tolerance
        }
    };

    if agrees {
        None
    } else {
        Some(Discrepancy::new(check.label.clone(), gold, silver))
    }
}

/// Apply every rule in order; one discrepancy per failed check.
pub fn evaluate(observations: &[Observation]) -> Verdict {
    let mut report = DiscrepancyReport::new();
    for obs in observations {
        if let Some(d) = compare(&obs.check, obs.gold, obs.silver) {
            report.push(d);
        }
    }
    Verdict::from_report(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_config::validation::default_checks;

    fn count_check() -> CheckDef {
        default_checks("db").remove(0)
    }

    fn revenue_check() -> CheckDef {
        default_checks("db").remove(1)
    }

    #[test]
    fn round_to_two_places() {
        assert_eq!(round_to(100.001, 2), 100.0);
        assert_eq!(round_to(100.004, 2), 100.0);
        assert_eq!(round_to(50000.004, 2), 50000.0);
        assert_eq!(round_to(1.239, 2), 1.24);
        assert_eq!(round_to(-1.239, 2), -1.24);
    }

    #[test]
    fn round_to_ties_follow_the_binary_value() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.015, 2), 0.01);
        assert_eq!(round_to(50000.125, 2), 50000.12);
        assert_eq!(round_to(2.675, 2), 2.67);
    }

    #[test]
    fn revenue_tie_matches_its_rounded_counterpart() {
        let r = compare(
            &revenue_check(),
            ScalarValue::Float(50000.125),
            ScalarValue::Float(50000.12),
        );
        assert_eq!(r, None);
        let r = compare(&revenue_check(), ScalarValue::Float(0.015), ScalarValue::Float(0.01));
        assert_eq!(r, None);
    }

    #[test]
    fn wide_decimals_still_compare_equal_values_equal() {
        let check = CheckDef::new(
            "X",
            "SELECT 1",
            "SELECT 1",
            CheckRule::RoundedDecimal {
                decimals: 400,
                tolerance: 0.0,
            },
        );
        assert_eq!(compare(&check, ScalarValue::Float(1.0), ScalarValue::Float(1.0)), None);
    }

    #[test]
    fn equal_counts_agree() {
        let r = compare(&count_check(), ScalarValue::Integer(5), ScalarValue::Integer(5));
        assert_eq!(r, None);
    }

    #[test]
    fn differing_counts_name_both_values() {
        let d = compare(
            &count_check(),
            ScalarValue::Integer(1000),
            ScalarValue::Integer(998),
        )
        .unwrap();
        assert_eq!(d.message(), "Count mismatch: Gold=1000, Silver=998");
    }

    #[test]
    fn float_on_integer_check_never_matches() {
        let r = compare(&count_check(), ScalarValue::Float(5.0), ScalarValue::Integer(5));
        assert!(r.is_some());
    }

    #[test]
    fn revenue_noise_beyond_cents_is_equal() {
        let r = compare(
            &revenue_check(),
            ScalarValue::Float(100.001),
            ScalarValue::Float(100.004),
        );
        assert_eq!(r, None);
    }

    #[test]
    fn revenue_cent_difference_is_mismatch() {
        let d = compare(
            &revenue_check(),
            ScalarValue::Float(100.00),
            ScalarValue::Float(100.01),
        )
        .unwrap();
        assert_eq!(d.label, "Revenue");
        assert_eq!(d.message(), "Revenue mismatch: Gold=100.0, Silver=100.01");
    }

    #[test]
    fn tolerance_band_absorbs_small_differences() {
        let check = CheckDef::new(
            "Revenue",
            "SELECT 1",
            "SELECT 1",
            CheckRule::RoundedDecimal {
                decimals: 2,
                tolerance: 0.05,
            },
        );
        assert_eq!(
            compare(&check, ScalarValue::Float(10.00), ScalarValue::Float(10.04)),
            None
        );
        assert!(compare(&check, ScalarValue::Float(10.00), ScalarValue::Float(10.10)).is_some());
    }

    #[test]
    fn evaluate_reports_in_checklist_order() {
        let obs = vec![
            Observation {
                check: count_check(),
                gold: ScalarValue::Integer(1),
                silver: ScalarValue::Integer(2),
            },
            Observation {
                check: revenue_check(),
                gold: ScalarValue::Float(1.0),
                silver: ScalarValue::Float(2.0),
            },
        ];
        match evaluate(&obs) {
            Verdict::Fail(report) => {
                assert_eq!(report.len(), 2);
                assert_eq!(report.entries()[0].label, "Count");
                assert_eq!(report.entries()[1].label, "Revenue");
            }
            Verdict::Pass => panic!("expected FAIL"),
        }
    }

    #[test]
    fn evaluate_all_equal_is_pass() {
        let obs = vec![Observation {
            check: count_check(),
            gold: ScalarValue::Integer(7),
            silver: ScalarValue::Integer(7),
        }];
        assert_eq!(evaluate(&obs), Verdict::Pass);
    }
}
