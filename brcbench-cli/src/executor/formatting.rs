//! Output Formatting
//!
//! Human-readable output formatting for benchmark and validation reports.
//!
//! Generates terminal-friendly output with:
//! - Per-candidate results with status icons (✓/✗/💥/⊘)
//! - Time and memory summaries over successful iterations
//! - Ranking with medals and the slowest/fastest speedup
//! - Validation verdicts with coverage and value mismatches

use super::execution::CandidateExecution;
use brcbench_report::{CandidateOutcome, Report, ValidationDocument};

/// Value mismatches listed before truncating
const MAX_LISTED: usize = 10;

/// Render seconds with a unit that keeps three significant decimals
pub fn format_seconds(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.1} ms", secs * 1000.0)
    } else {
        format!("{:.3} s", secs)
    }
}

/// Render a byte count in binary units
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn section(output: &mut String, title: &str) {
    output.push_str(&format!("\n{}\n", title));
    output.push_str(&"-".repeat(60));
    output.push('\n');
}

/// Format a benchmark report for terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();
    let info = &report.benchmark_info;

    output.push('\n');
    output.push_str("BRCBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Data: {} ({})\n",
        info.data_file,
        format_bytes(info.data_file_bytes as f64)
    ));
    output.push_str(&format!(
        "  Iterations: {}  Timeout: {}  Value check: {}\n",
        info.iterations,
        format_seconds(info.timeout_secs),
        info.value_check
    ));
    output.push_str(&format!(
        "  System: {} {}, {} ({} cores, {:.1} GB)\n",
        report.system.os,
        report.system.arch,
        report.system.cpu,
        report.system.cpu_cores,
        report.system.memory_gb
    ));

    section(&mut output, "Candidates");
    for candidate in &report.candidates {
        let note = match candidate.outcome {
            CandidateOutcome::NotFound => " (no solution found)",
            CandidateOutcome::BuildFailed => " (build failed)",
            CandidateOutcome::Failed => " (all iterations failed)",
            CandidateOutcome::Completed => "",
        };
        output.push_str(&format!(
            "  {} {} [{}]{}\n",
            candidate.outcome.icon(),
            candidate.id,
            candidate.language,
            note
        ));

        if let Some(stats) = report.results.get(&candidate.id) {
            output.push_str(&format!(
                "      time: mean {}  median {}  std {}  min {}  max {}\n",
                format_seconds(stats.elapsed.mean),
                format_seconds(stats.elapsed.median),
                format_seconds(stats.elapsed.std_dev),
                format_seconds(stats.elapsed.min),
                format_seconds(stats.elapsed.max)
            ));
            output.push_str(&format!(
                "      memory: mean {}  max {}\n",
                format_bytes(stats.memory.mean),
                format_bytes(stats.memory.max)
            ));
            output.push_str(&format!(
                "      success: {}/{} ({:.1}%)\n",
                stats.success_count, stats.total_count, stats.success_rate
            ));
        }

        let value_warnings: usize = candidate
            .iterations
            .iter()
            .map(|it| it.value_mismatches.len())
            .sum();
        if value_warnings > 0 {
            output.push_str(&format!(
                "      warning: {} values outside tolerance across iterations\n",
                value_warnings
            ));
        }

        if let Some(errors) = report.errors.get(&candidate.id) {
            for error in errors {
                output.push_str(&format!("      error: {}\n", error));
            }
        }
    }

    if !report.ranking.is_empty() {
        section(&mut output, "Ranking");
        let width = report
            .ranking
            .iter()
            .map(|r| r.id.len())
            .max()
            .unwrap_or(8);
        for entry in &report.ranking {
            output.push_str(&format!(
                "  {} {:>2}. {:<width$}  {:>12}\n",
                entry.medal.as_deref().unwrap_or("  "),
                entry.rank,
                entry.id,
                format_seconds(entry.mean_seconds),
                width = width
            ));
        }
        if let Some(speedup) = report.speedup {
            output.push_str(&format!(
                "\n  Speedup: {:.2}x (slowest mean / fastest mean)\n",
                speedup
            ));
        }
    }

    section(&mut output, "Summary");
    let count = |outcome: CandidateOutcome| {
        report
            .candidates
            .iter()
            .filter(|c| c.outcome == outcome)
            .count()
    };
    output.push_str(&format!(
        "  Total: {}  Completed: {}  Failed: {}  Build failed: {}  Not found: {}\n",
        report.candidates.len(),
        count(CandidateOutcome::Completed),
        count(CandidateOutcome::Failed),
        count(CandidateOutcome::BuildFailed),
        count(CandidateOutcome::NotFound)
    ));

    output
}

/// Format a validation result for terminal display
pub fn format_validation_output(doc: &ValidationDocument) -> String {
    let report = &doc.report;
    let mut output = String::new();

    output.push_str(&format!("Validation: {}\n", report.status));
    output.push_str(&format!("  Output: {}\n", doc.output_file));
    if let Some(input) = &doc.input_file {
        output.push_str(&format!("  Input: {}\n", input));
    }

    let coverage = &report.coverage;
    if report.values_checked {
        output.push_str(&format!(
            "  Stations: {} reported / {} expected ({:.1}% coverage)\n",
            coverage.output_keys,
            coverage.input_keys,
            coverage.percentage()
        ));
    } else {
        output.push_str(&format!(
            "  Stations: {} reported (values not checked)\n",
            coverage.output_keys
        ));
    }
    if let Some(ranges) = &doc.temperature_ranges {
        output.push_str(&format!(
            "  Range: {:.1} .. {:.1}, mean of means {:.2}\n",
            ranges.global_min, ranges.global_max, ranges.mean_of_means
        ));
    }

    list(&mut output, "Format errors", &report.format_errors);
    list(&mut output, "Warnings", &report.format_warnings);
    list(&mut output, "Missing stations", &coverage.missing);
    list(&mut output, "Unexpected stations", &coverage.extra);
    let mismatches: Vec<String> = report
        .value_mismatches
        .iter()
        .map(ToString::to_string)
        .collect();
    list(&mut output, "Value mismatches", &mismatches);

    output
}

fn list(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("  {} ({}):\n", title, items.len()));
    for item in items.iter().take(MAX_LISTED) {
        output.push_str(&format!("    - {}\n", item));
    }
    if items.len() > MAX_LISTED {
        output.push_str(&format!("    ... {} more\n", items.len() - MAX_LISTED));
    }
}

/// Format the single-run result of `check`
pub fn format_check_output(exec: &CandidateExecution) -> String {
    let mut output = String::new();
    let candidate = &exec.candidate;

    output.push_str(&format!(
        "Candidate {} [{}] at {}\n",
        candidate.id,
        candidate.language,
        candidate.dir.display()
    ));
    if let Some(build) = exec.build_duration {
        output.push_str(&format!("  Build: ok ({})\n", format_seconds(build.as_secs_f64())));
    }
    if let Some(error) = &exec.build_error {
        output.push_str(&format!("  Build: {}\n", error));
        return output;
    }

    for it in &exec.iterations {
        output.push_str(&format!(
            "  Run: {} in {} (exit {}, peak {})\n",
            if it.success { "PASS" } else { "FAIL" },
            format_seconds(it.elapsed_seconds),
            it.exit_code,
            format_bytes(it.memory_delta_bytes as f64)
        ));
        if let Some(failure) = &it.failure {
            output.push_str(&format!("  Reason: {}\n", failure));
        }
        list(&mut output, "Format errors", &it.format_errors);
        if let Some(validation) = &it.validation {
            list(&mut output, "Missing stations", &validation.coverage.missing);
            list(&mut output, "Unexpected stations", &validation.coverage.extra);
            let mismatches: Vec<String> = validation
                .value_mismatches
                .iter()
                .map(ToString::to_string)
                .collect();
            list(&mut output, "Value mismatches", &mismatches);
            list(&mut output, "Warnings", &validation.format_warnings);
        }
    }

    output
}
