//! Correctness Oracle
//!
//! Cross-checks a [`ParsedOutput`] against ground truth recomputed from the
//! measurement file.
//!
//! ```text
//! MeasurementGroup ──► GroundTruth ──┐
//!                                    ├──► coverage ──► value check ──► status
//! candidate stdout ──► ParsedOutput ─┘
//! ```

use crate::ParsedOutput;
use brcbench_core::{GroundTruth, MeasurementGroup, StationAggregate};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slack added to every tolerance so decimal boundaries such as
/// `21.26 - 21.25` compare as exactly `0.01`
pub const TOLERANCE_EPSILON: f64 = 1e-9;

/// Per-field comparison tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Allowed absolute difference for min and max
    pub min_max: f64,
    /// Allowed absolute difference for mean
    pub mean: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            min_max: 0.1,
            mean: 0.01,
        }
    }
}

impl Tolerances {
    /// Tolerance applying to a field
    pub fn for_field(&self, field: Field) -> f64 {
        match field {
            Field::Min | Field::Max => self.min_max,
            Field::Mean => self.mean,
        }
    }
}

/// Which aggregate value disagreed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Minimum
    Min,
    /// Mean
    Mean,
    /// Maximum
    Max,
}

impl Field {
    fn value(self, agg: &StationAggregate) -> f64 {
        match self {
            Field::Min => agg.min,
            Field::Mean => agg.mean,
            Field::Max => agg.max,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Min => "min",
            Field::Mean => "mean",
            Field::Max => "max",
        })
    }
}

/// A value outside tolerance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMismatch {
    /// Station name
    pub key: String,
    /// Field compared
    pub field: Field,
    /// Ground-truth value
    pub expected: f64,
    /// Candidate value
    pub actual: f64,
    /// `|actual - expected|`
    pub delta: f64,
    /// Tolerance that was exceeded
    pub tolerance: f64,
}

impl fmt::Display for ValueMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: expected {:.3}, got {:.3} (diff {:.4} > {})",
            self.key, self.field, self.expected, self.actual, self.delta, self.tolerance
        )
    }
}

/// Key-set comparison between input and output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Distinct stations in the input
    pub input_keys: usize,
    /// Distinct stations accepted from the output
    pub output_keys: usize,
    /// Input stations absent from the output, sorted
    pub missing: Vec<String>,
    /// Output stations absent from the input, sorted
    pub extra: Vec<String>,
}

impl Coverage {
    /// Share of input stations present in the output, in percent
    pub fn percentage(&self) -> f64 {
        if self.input_keys == 0 {
            return 100.0;
        }
        let found = self.input_keys - self.missing.len();
        found as f64 / self.input_keys as f64 * 100.0
    }

    /// Key sets match exactly
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    /// Output is well-formed, complete and within tolerance
    Pass,
    /// At least one format error, coverage gap or mismatch
    Fail,
}

impl ValidationStatus {
    /// Whether this is [`ValidationStatus::Pass`]
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationStatus::Pass)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Pass => "PASS",
            ValidationStatus::Fail => "FAIL",
        })
    }
}

/// Outcome of validating one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Grammar errors, rendered with their position
    pub format_errors: Vec<String>,
    /// Grammar warnings, rendered with their position
    pub format_warnings: Vec<String>,
    /// Key-set comparison
    pub coverage: Coverage,
    /// Values outside tolerance
    pub value_mismatches: Vec<ValueMismatch>,
    /// Whether values were compared against ground truth
    pub values_checked: bool,
    /// Verdict
    pub status: ValidationStatus,
}

impl ValidationReport {
    /// Grammar-only report, used when no input is available
    pub fn format_only(parsed: &ParsedOutput) -> Self {
        Self::finish(
            parsed,
            Coverage {
                output_keys: parsed.aggregates.len(),
                ..Coverage::default()
            },
            Vec::new(),
            false,
        )
    }

    fn finish(
        parsed: &ParsedOutput,
        coverage: Coverage,
        value_mismatches: Vec<ValueMismatch>,
        values_checked: bool,
    ) -> Self {
        let status = if parsed.is_valid() && coverage.is_complete() && value_mismatches.is_empty()
        {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };
        Self {
            format_errors: parsed.error_messages(),
            format_warnings: parsed.warning_messages(),
            coverage,
            value_mismatches,
            values_checked,
            status,
        }
    }

    /// Shorthand for `status.is_pass()`
    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }
}

/// Ground truth plus tolerances, reusable across many outputs
#[derive(Debug, Clone)]
pub struct Oracle {
    truth: GroundTruth,
    tolerances: Tolerances,
}

impl Oracle {
    /// Compute ground truth for a measurement group
    pub fn new(group: &MeasurementGroup) -> Self {
        Self::from_truth(GroundTruth::compute(group))
    }

    /// Wrap already computed ground truth
    pub fn from_truth(truth: GroundTruth) -> Self {
        Self {
            truth,
            tolerances: Tolerances::default(),
        }
    }

    /// Override the comparison tolerances
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Reference aggregates
    pub fn truth(&self) -> &GroundTruth {
        &self.truth
    }

    /// Active tolerances
    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    /// Validate one parsed output
    pub fn validate(&self, parsed: &ParsedOutput) -> ValidationReport {
        let output: FxHashMap<&str, &StationAggregate> = parsed
            .aggregates
            .iter()
            .map(|agg| (agg.key.as_str(), agg))
            .collect();

        let mut missing = Vec::new();
        let mut mismatches = Vec::new();

        // Ground truth iterates in key order, so missing is already sorted
        for expected in self.truth.iter() {
            let Some(actual) = output.get(expected.key.as_str()) else {
                missing.push(expected.key.clone());
                continue;
            };
            for field in [Field::Min, Field::Mean, Field::Max] {
                let tolerance = self.tolerances.for_field(field);
                let (want, got) = (field.value(expected), field.value(actual));
                let delta = (got - want).abs();
                if delta > tolerance + TOLERANCE_EPSILON {
                    mismatches.push(ValueMismatch {
                        key: expected.key.clone(),
                        field,
                        expected: want,
                        actual: got,
                        delta,
                        tolerance,
                    });
                }
            }
        }

        let mut extra: Vec<String> = output
            .keys()
            .filter(|key| !self.truth.contains(key))
            .map(|key| key.to_string())
            .collect();
        extra.sort_unstable();

        let coverage = Coverage {
            input_keys: self.truth.len(),
            output_keys: output.len(),
            missing,
            extra,
        };

        ValidationReport::finish(parsed, coverage, mismatches, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_output;

    fn oracle(readings: &[(&str, f64)]) -> Oracle {
        Oracle::new(&MeasurementGroup::from_readings(readings.iter().copied()))
    }

    #[test]
    fn test_end_to_end_pass() {
        let oracle = oracle(&[("Paris", 10.0), ("Paris", 20.0), ("Tokyo", 5.0)]);
        let report = oracle.validate(&parse_output("Paris=10.0/15.0/20.0\nTokyo=5.0/5.0/5.0\n"));

        assert_eq!(report.status, ValidationStatus::Pass);
        assert!(report.value_mismatches.is_empty());
        assert_eq!(report.coverage.input_keys, 2);
        assert_eq!(report.coverage.output_keys, 2);
        assert!((report.coverage.percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_tolerance_boundary() {
        let oracle = oracle(&[("Oslo", 21.25)]);

        let within = oracle.validate(&parse_output("Oslo=21.2/21.26/21.3"));
        assert!(within.value_mismatches.is_empty(), "{within:?}");
        assert!(within.passed());

        let outside = oracle.validate(&parse_output("Oslo=21.2/21.27/21.3"));
        assert_eq!(outside.value_mismatches.len(), 1);
        let mismatch = &outside.value_mismatches[0];
        assert_eq!(mismatch.field, Field::Mean);
        assert_eq!(mismatch.key, "Oslo");
        assert!((mismatch.delta - 0.02).abs() < 1e-9);
        assert_eq!(outside.status, ValidationStatus::Fail);
    }

    #[test]
    fn test_min_max_tolerance() {
        let oracle = oracle(&[("a", 1.0), ("a", 3.0)]);

        assert!(oracle.validate(&parse_output("a=1.1/2.0/2.9")).passed());

        let report = oracle.validate(&parse_output("a=0.8/2.0/3.2"));
        let fields: Vec<Field> = report.value_mismatches.iter().map(|m| m.field).collect();
        assert_eq!(fields, vec![Field::Min, Field::Max]);
    }

    #[test]
    fn test_missing_and_extra() {
        let oracle = oracle(&[("Paris", 1.0), ("Tokyo", 2.0)]);
        let report = oracle.validate(&parse_output("Oslo=1.0/1.0/1.0\nParis=1.0/1.0/1.0"));

        assert_eq!(report.coverage.missing, vec!["Tokyo"]);
        assert_eq!(report.coverage.extra, vec!["Oslo"]);
        assert_eq!(report.status, ValidationStatus::Fail);
        assert!((report.coverage.percentage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_extra_is_sorted() {
        let oracle = oracle(&[("m", 1.0)]);
        let report = oracle.validate(&parse_output("{z=1.0/1.0/1.0, m=1.0/1.0/1.0, b=1.0/1.0/1.0}"));
        assert_eq!(report.coverage.extra, vec!["b", "z"]);
    }

    #[test]
    fn test_format_errors_fail_status() {
        let oracle = oracle(&[("a", 1.0), ("b", 1.0)]);
        let report = oracle.validate(&parse_output("b=1.0/1.0/1.0\na=1.0/1.0/1.0"));

        assert!(report.value_mismatches.is_empty());
        assert!(report.coverage.is_complete());
        assert!(!report.format_errors.is_empty());
        assert_eq!(report.status, ValidationStatus::Fail);
    }

    #[test]
    fn test_warnings_keep_pass() {
        let oracle = oracle(&[("a", 1.0)]);
        let report = oracle.validate(&parse_output("a=1.00/1.00/1.00"));
        assert_eq!(report.format_warnings.len(), 3);
        assert!(report.passed());
    }

    #[test]
    fn test_custom_tolerances() {
        let oracle = oracle(&[("a", 1.0)]).with_tolerances(Tolerances {
            min_max: 0.5,
            mean: 0.5,
        });
        assert!(oracle.validate(&parse_output("a=0.6/1.4/1.5")).passed());
    }

    #[test]
    fn test_format_only() {
        let report = ValidationReport::format_only(&parse_output("a=1.0/1.0/1.0"));
        assert!(report.passed());
        assert!(!report.values_checked);
        assert_eq!(report.coverage.output_keys, 1);
    }

    #[test]
    fn test_report_serializes_status() {
        let report = ValidationReport::format_only(&parse_output(""));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["format_errors"][0], "empty output");
    }
}
