#![warn(missing_docs)]
//! BRCBench Logic - Output Grammar and Correctness Oracle
//!
//! Parses candidate output in either surface form (ordered `KEY=MIN/MEAN/MAX`
//! lines, or the legacy `{k=a/b/c, ...}` map) and cross-checks the parsed
//! aggregates against ground truth recomputed from the raw input.
//!
//! Both stages return their findings as values: the parser accumulates
//! [`Diagnostic`]s, the oracle produces a [`ValidationReport`]. Nothing here
//! aborts on the first problem.

mod grammar;
mod oracle;

pub use grammar::{
    Diagnostic, GrammarConfig, OutputParser, ParsedOutput, SurfaceForm, format_lines, format_map,
    parse_output,
};
pub use oracle::{
    Coverage, Field, Oracle, TOLERANCE_EPSILON, Tolerances, ValidationReport, ValidationStatus,
    ValueMismatch,
};
