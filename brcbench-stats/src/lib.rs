#![warn(missing_docs)]
//! BRCBench Statistics
//!
//! Summaries over the successful iterations of a candidate: central tendency
//! and spread for wall-clock time and peak memory.

mod percentiles;
mod summary;

pub use percentiles::{compute_median, compute_percentile};
pub use summary::{SummaryStatistics, compute_summary, speedup};
