#![warn(missing_docs)]
//! BRCBench Core - Measurements and Ground Truth
//!
//! This crate provides the data layer shared by the validator and the
//! benchmark orchestrator:
//! - `MeasurementGroup` loading of `station=temperature` input files
//! - `GroundTruth` exact per-station min/mean/max aggregation
//! - `StationAggregate`, the record compared between truth and candidate output
//! - Run measurement (wall-clock timer, child peak RSS)

mod aggregate;
mod measure;
mod measurements;

pub use aggregate::{GroundTruth, StationAggregate};
pub use measure::{ResourceUsage, Timer};
pub use measurements::{
    LoadSummary, LoadWarning, MAX_RECORDED_WARNINGS, MeasurementGroup, ReadingError,
    check_input_precondition, parse_reading,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening or loading a measurement file.
///
/// Malformed individual lines are not errors: they are skipped and recorded
/// in the [`LoadSummary`]. Only the conditions below abort a load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The input file has no content
    #[error("Input file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    /// The first line does not have the `KEY=VALUE` shape
    #[error(
        "Input file format invalid at {}: first line {line:?} is not STATION=TEMPERATURE",
        path.display()
    )]
    MalformedFirstLine {
        /// Offending file
        path: PathBuf,
        /// First line as read
        line: String,
    },
}
