//! Benchmark Executor
//!
//! Runs candidates and turns their iterations into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (resolved candidates)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Build once, run N iterations per candidate
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │verification │  Exit code, grammar, oracle → success
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Summaries over successful iterations
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Results, errors, ranking, speedup
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Candidate state machine and concurrency
//! - [`verification`] - Per-iteration success and saved-output validation
//! - [`statistics`] - Per-candidate summaries
//! - [`report`] - Report assembly and ranking
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod execution;
mod formatting;
mod metadata;
mod report;
mod statistics;
mod verification;

// Re-export public API
pub use execution::{CandidateExecution, CandidateState, ExecutionConfig, Executor};
pub use formatting::{format_check_output, format_human_output, format_validation_output};
pub use metadata::system_info;
pub use report::{SessionInfo, build_report, rank_candidates};
pub use statistics::{compute_candidate_stats, compute_statistics};
pub use verification::{IterationOutcome, validate_saved_output, verify_iteration};
