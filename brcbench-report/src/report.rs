//! Report Data Structures

use brcbench_logic::{ParsedOutput, ValidationReport};
use brcbench_stats::SummaryStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Benchmark report ────────────────────────────────────────────────────────

/// Complete benchmark report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub benchmark_info: BenchmarkInfo,
    pub system: SystemInfo,
    /// Candidate id → stats, only for candidates with at least one success
    pub results: BTreeMap<String, CandidateStats>,
    /// Candidate id → error strings, for candidates with any failure
    pub errors: BTreeMap<String, Vec<String>>,
    pub candidates: Vec<CandidateReport>,
    pub ranking: Vec<RankingEntry>,
    /// Slowest mean ÷ fastest mean, when two or more candidates ranked
    pub speedup: Option<f64>,
}

impl Report {
    /// At least one candidate produced stats
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }
}

/// Session parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkInfo {
    pub timestamp: DateTime<Utc>,
    pub data_file: String,
    pub data_file_bytes: u64,
    pub iterations: usize,
    pub timeout_secs: f64,
    pub total_candidates: usize,
    /// `off`, `report` or `strict`
    pub value_check: String,
}

/// System information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// Aggregate over a candidate's successful iterations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub success_count: usize,
    pub total_count: usize,
    /// Percent of iterations that succeeded
    pub success_rate: f64,
    /// Wall-clock seconds
    pub elapsed: SummaryStatistics,
    /// Peak RSS bytes
    pub memory: SummaryStatistics,
}

/// Where a candidate ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// No solution artifact on disk
    NotFound,
    /// Build step failed; no iteration ran
    BuildFailed,
    /// At least one iteration succeeded
    Completed,
    /// Every iteration failed
    Failed,
}

impl CandidateOutcome {
    /// Status icon for terminal output
    pub fn icon(&self) -> &'static str {
        match self {
            CandidateOutcome::NotFound => "⊘",
            CandidateOutcome::BuildFailed => "💥",
            CandidateOutcome::Completed => "✓",
            CandidateOutcome::Failed => "✗",
        }
    }
}

/// Per-candidate record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub id: String,
    pub language: String,
    pub path: String,
    pub outcome: CandidateOutcome,
    pub build_seconds: Option<f64>,
    pub build_error: Option<String>,
    pub iterations: Vec<IterationRecord>,
}

/// One iteration, without the captured stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based
    pub iteration: usize,
    pub elapsed_seconds: f64,
    pub memory_delta_bytes: u64,
    pub exit_code: i32,
    pub output_valid: bool,
    pub timed_out: bool,
    pub success: bool,
    pub output_bytes: usize,
    pub format_errors: Vec<String>,
    pub value_mismatches: Vec<String>,
    /// Input stations absent from the output
    pub missing_stations: Vec<String>,
    /// Output stations absent from the input
    pub extra_stations: Vec<String>,
    pub error: Option<String>,
}

/// Position in the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based
    pub rank: usize,
    pub id: String,
    pub mean_seconds: f64,
    pub medal: Option<String>,
}

/// Medal for the top three ranks
pub fn medal(rank: usize) -> Option<&'static str> {
    match rank {
        1 => Some("🥇"),
        2 => Some("🥈"),
        3 => Some("🥉"),
        _ => None,
    }
}

// ─── Validation report ───────────────────────────────────────────────────────

/// Per-station values as reported by the candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDetail {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub range: f64,
}

/// Extremes across all reported stations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRanges {
    /// Smallest station minimum
    pub global_min: f64,
    /// Largest station maximum
    pub global_max: f64,
    /// Mean of station means
    pub mean_of_means: f64,
}

/// Validation result of one saved output, as written by `validate --report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationDocument {
    #[serde(rename = "validation_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub output_file: String,
    pub input_file: Option<String>,
    #[serde(flatten)]
    pub report: ValidationReport,
    pub station_details: BTreeMap<String, StationDetail>,
    pub temperature_ranges: Option<TemperatureRanges>,
}

impl ValidationDocument {
    /// Assemble from the parse and its validation
    pub fn new(
        output_file: impl Into<String>,
        input_file: Option<String>,
        parsed: &ParsedOutput,
        report: ValidationReport,
    ) -> Self {
        let station_details = parsed
            .aggregates
            .iter()
            .map(|agg| {
                (
                    agg.key.clone(),
                    StationDetail {
                        min: agg.min,
                        mean: agg.mean,
                        max: agg.max,
                        range: agg.range(),
                    },
                )
            })
            .collect();

        let temperature_ranges = (!parsed.aggregates.is_empty()).then(|| {
            let aggs = &parsed.aggregates;
            TemperatureRanges {
                global_min: aggs.iter().map(|a| a.min).fold(f64::INFINITY, f64::min),
                global_max: aggs.iter().map(|a| a.max).fold(f64::NEG_INFINITY, f64::max),
                mean_of_means: aggs.iter().map(|a| a.mean).sum::<f64>() / aggs.len() as f64,
            }
        });

        Self {
            timestamp: Utc::now(),
            output_file: output_file.into(),
            input_file,
            report,
            station_details,
            temperature_ranges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brcbench_logic::parse_output;

    #[test]
    fn test_medals() {
        assert_eq!(medal(1), Some("🥇"));
        assert_eq!(medal(3), Some("🥉"));
        assert_eq!(medal(4), None);
    }

    #[test]
    fn test_validation_document() {
        let parsed = parse_output("a=-5.0/0.0/5.0\nb=10.0/20.0/30.0\n");
        let report = ValidationReport::format_only(&parsed);
        let doc = ValidationDocument::new("out.txt", None, &parsed, report);

        assert_eq!(doc.station_details["a"].range, 10.0);
        let ranges = doc.temperature_ranges.clone().unwrap();
        assert_eq!(ranges.global_min, -5.0);
        assert_eq!(ranges.global_max, 30.0);
        assert_eq!(ranges.mean_of_means, 10.0);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status"], "PASS");
        assert!(json["coverage"].is_object());
        assert!(json["station_details"]["b"].is_object());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&CandidateOutcome::BuildFailed).unwrap();
        assert_eq!(json, "\"build_failed\"");
    }
}
