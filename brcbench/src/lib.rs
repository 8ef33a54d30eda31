#![warn(missing_docs)]
//! # BRCBench
//!
//! Correctness and performance harness for Billion Row Challenge submissions.
//!
//! BRCBench takes a measurement file of `station=temperature` lines and a set
//! of candidate programs, one or more per language, then:
//! - **Validates**: parses each output against the `STATION=MIN/MEAN/MAX`
//!   grammar and compares it to ground truth computed from the input
//! - **Supervises**: builds once, runs each iteration in its own process group
//!   with a hard timeout, and reaps every child on every path
//! - **Benchmarks**: summarizes wall-clock time and peak memory per candidate,
//!   ranks by mean time and reports the slowest/fastest speedup
//!
//! ## Library use
//!
//! ```ignore
//! use brcbench::{MeasurementGroup, Oracle, parse_output};
//!
//! let group = MeasurementGroup::load("data/test_measurements.txt")?;
//! let oracle = Oracle::new(&group);
//! let report = oracle.validate(&parse_output(&std::fs::read_to_string("out.txt")?));
//! println!("{}", report.status);
//! ```
//!
//! ## Binary
//!
//! `brcbench` (bench, validate, check, list, init); see `brcbench --help`.

// Re-export the data layer
pub use brcbench_core::{
    GroundTruth, LoadError, LoadSummary, MeasurementGroup, ResourceUsage, StationAggregate, Timer,
    check_input_precondition, parse_reading,
};

// Re-export grammar and oracle
pub use brcbench_logic::{
    GrammarConfig, Oracle, OutputParser, ParsedOutput, SurfaceForm, Tolerances, ValidationReport,
    ValidationStatus, ValueMismatch, format_lines, format_map, parse_output,
};

// Re-export report model
pub use brcbench_report::{OutputFormat, Report, ValidationDocument};

// Re-export stats
pub use brcbench_stats::{SummaryStatistics, compute_summary, speedup};

// Re-export the CLI entry points
pub use brcbench_cli::{BrcConfig, Cli, Commands, Language, ValueCheck, run, run_with_cli};
