//! Output Verification
//!
//! Decides whether an iteration succeeded, and validates saved outputs for
//! the `validate` subcommand.
//!
//! An iteration succeeds when the process exited with 0 and its output parsed
//! without grammar errors. With value checking on, the parsed output is also
//! handed to the oracle; under `strict` anything short of a PASS verdict
//! (mismatches, missing or extra stations) disqualifies the iteration, under
//! `report` the findings are only recorded.

use crate::config::{ValidationConfig, ValueCheck};
use crate::supervisor::RunResult;
use anyhow::Context;
use brcbench_core::MeasurementGroup;
use brcbench_logic::{Oracle, OutputParser, ValidationReport, ValueMismatch};
use brcbench_report::ValidationDocument;
use std::path::Path;

/// Verified result of one iteration; the captured stdout is not retained
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    /// 1-based
    pub iteration: usize,
    pub elapsed_seconds: f64,
    pub memory_delta_bytes: u64,
    pub exit_code: i32,
    pub output_valid: bool,
    pub timed_out: bool,
    pub output_bytes: usize,
    pub format_errors: Vec<String>,
    /// Oracle verdict, when value checking ran
    pub validation: Option<ValidationReport>,
    pub value_mismatches: Vec<ValueMismatch>,
    pub success: bool,
    /// Why the iteration failed, `None` on success
    pub failure: Option<String>,
}

/// Classify one run
pub fn verify_iteration(
    iteration: usize,
    run: RunResult,
    oracle: Option<&Oracle>,
    mode: ValueCheck,
) -> IterationOutcome {
    let validation = match (run.parsed.as_ref(), oracle) {
        (Some(parsed), Some(oracle)) if mode.is_enabled() && run.exit_code == 0 => {
            Some(oracle.validate(parsed))
        }
        _ => None,
    };

    let values_ok = match mode {
        ValueCheck::Strict => validation.as_ref().is_some_and(ValidationReport::passed),
        ValueCheck::Off | ValueCheck::Report => true,
    };
    let success = run.exit_code == 0 && !run.timed_out && run.output_valid && values_ok;

    let failure = if success {
        None
    } else if let Some(error) = &run.error {
        Some(error.clone())
    } else if !run.output_valid {
        Some(summarize("Invalid output", &run.format_errors))
    } else {
        Some(describe_validation(validation.as_ref()))
    };

    IterationOutcome {
        iteration,
        elapsed_seconds: run.elapsed_seconds,
        memory_delta_bytes: run.memory_delta_bytes,
        exit_code: run.exit_code,
        output_valid: run.output_valid,
        timed_out: run.timed_out,
        output_bytes: run.output_bytes(),
        format_errors: run.format_errors,
        value_mismatches: validation
            .as_ref()
            .map(|v| v.value_mismatches.clone())
            .unwrap_or_default(),
        validation,
        success,
        failure,
    }
}

fn summarize(prefix: &str, errors: &[String]) -> String {
    match errors {
        [] => prefix.to_string(),
        [only] => format!("{prefix}: {only}"),
        [first, rest @ ..] => format!("{prefix}: {first} (+{} more)", rest.len()),
    }
}

fn describe_validation(validation: Option<&ValidationReport>) -> String {
    let Some(report) = validation else {
        return "Values could not be checked".to_string();
    };
    let mut parts = Vec::new();
    if !report.value_mismatches.is_empty() {
        parts.push(format!("{} values outside tolerance", report.value_mismatches.len()));
    }
    if !report.coverage.missing.is_empty() {
        parts.push(format!("{} stations missing", report.coverage.missing.len()));
    }
    if !report.coverage.extra.is_empty() {
        parts.push(format!("{} unexpected stations", report.coverage.extra.len()));
    }
    if parts.is_empty() {
        "Validation failed".to_string()
    } else {
        format!("Validation failed: {}", parts.join(", "))
    }
}

/// Validate a saved output file, optionally against the input it came from
pub fn validate_saved_output(
    output: &Path,
    input: Option<&Path>,
    settings: &ValidationConfig,
) -> anyhow::Result<ValidationDocument> {
    let text = std::fs::read_to_string(output)
        .with_context(|| format!("Failed to read output file {}", output.display()))?;
    let parsed = OutputParser::new(settings.grammar()).parse(&text);

    let report = match input {
        Some(input) => {
            let group = MeasurementGroup::load(input)
                .with_context(|| format!("Failed to load input {}", input.display()))?;
            let skipped = group.summary().skipped;
            if skipped > 0 {
                tracing::warn!(skipped, "malformed input lines were skipped");
            }
            Oracle::new(&group)
                .with_tolerances(settings.tolerances())
                .validate(&parsed)
        }
        None => ValidationReport::format_only(&parsed),
    };

    Ok(ValidationDocument::new(
        output.display().to_string(),
        input.map(|p| p.display().to_string()),
        &parsed,
        report,
    ))
}
