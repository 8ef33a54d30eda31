//! BRCBench Report - Report Model and Serialization
//!
//! Two documents leave the harness:
//! - the benchmark [`Report`] (one per `bench` session)
//! - the [`ValidationDocument`] (one per `validate` call)
//!
//! Both serialize to JSON; human-readable rendering lives with the CLI.

mod json;
mod report;

pub use json::{generate_json_report, generate_validation_json, write_json};
pub use report::{
    BenchmarkInfo, CandidateOutcome, CandidateReport, CandidateStats, IterationRecord,
    RankingEntry, Report, StationDetail, SystemInfo, TemperatureRanges, ValidationDocument, medal,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON on stdout
    Json,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
