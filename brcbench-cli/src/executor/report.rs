//! Report Building
//!
//! Assembles the [`Report`] from candidate executions: per-candidate stats and
//! errors, ranking by mean elapsed time, and the slowest/fastest speedup.

use super::execution::{CandidateExecution, CandidateState};
use super::metadata::system_info;
use super::statistics::compute_statistics;
use super::verification::IterationOutcome;
use crate::config::ValueCheck;
use brcbench_report::{
    BenchmarkInfo, CandidateOutcome, CandidateReport, CandidateStats, IterationRecord,
    RankingEntry, Report, medal,
};
use brcbench_stats::speedup;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Session parameters recorded in the report header
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub data_file: PathBuf,
    pub iterations: usize,
    pub timeout: Duration,
    pub value_check: ValueCheck,
}

/// Build the complete report
pub fn build_report(executions: &[CandidateExecution], session: &SessionInfo) -> Report {
    let results: BTreeMap<String, CandidateStats> = compute_statistics(executions)
        .into_iter()
        .filter_map(|(id, stats)| stats.map(|s| (id, s)))
        .collect();

    let errors: BTreeMap<String, Vec<String>> = executions
        .iter()
        .map(|exec| (exec.candidate.id.clone(), candidate_errors(exec)))
        .filter(|(_, errors)| !errors.is_empty())
        .collect();

    let ranking = rank_candidates(&results);
    let means: Vec<f64> = ranking.iter().map(|r| r.mean_seconds).collect();

    let data_file_bytes = std::fs::metadata(&session.data_file)
        .map(|m| m.len())
        .unwrap_or(0);

    Report {
        benchmark_info: BenchmarkInfo {
            timestamp: Utc::now(),
            data_file: session.data_file.display().to_string(),
            data_file_bytes,
            iterations: session.iterations,
            timeout_secs: session.timeout.as_secs_f64(),
            total_candidates: executions.len(),
            value_check: session.value_check.to_string(),
        },
        system: system_info(),
        results,
        errors,
        candidates: executions.iter().map(candidate_report).collect(),
        ranking,
        speedup: speedup(&means),
    }
}

/// Order candidates by ascending mean elapsed time, ties by id
pub fn rank_candidates(results: &BTreeMap<String, CandidateStats>) -> Vec<RankingEntry> {
    let mut ordered: Vec<(&String, &CandidateStats)> = results.iter().collect();
    ordered.sort_by(|(id_a, a), (id_b, b)| {
        a.elapsed
            .mean
            .total_cmp(&b.elapsed.mean)
            .then_with(|| id_a.cmp(id_b))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (id, stats))| RankingEntry {
            rank: i + 1,
            id: id.clone(),
            mean_seconds: stats.elapsed.mean,
            medal: medal(i + 1).map(str::to_string),
        })
        .collect()
}

fn candidate_errors(exec: &CandidateExecution) -> Vec<String> {
    if let Some(build_error) = &exec.build_error {
        return vec![build_error.to_string()];
    }
    exec.iterations
        .iter()
        .filter_map(|it| {
            it.failure
                .as_ref()
                .map(|failure| format!("Iteration {}: {}", it.iteration, failure))
        })
        .collect()
}

fn outcome(exec: &CandidateExecution) -> CandidateOutcome {
    match exec.state {
        CandidateState::NotFound => CandidateOutcome::NotFound,
        CandidateState::BuildFailed => CandidateOutcome::BuildFailed,
        _ if exec.success_count() > 0 => CandidateOutcome::Completed,
        _ => CandidateOutcome::Failed,
    }
}

fn candidate_report(exec: &CandidateExecution) -> CandidateReport {
    CandidateReport {
        id: exec.candidate.id.clone(),
        language: exec.candidate.language.to_string(),
        path: exec.candidate.dir.display().to_string(),
        outcome: outcome(exec),
        build_seconds: exec.build_duration.map(|d| d.as_secs_f64()),
        build_error: exec.build_error.as_ref().map(ToString::to_string),
        iterations: exec.iterations.iter().map(iteration_record).collect(),
    }
}

fn iteration_record(it: &IterationOutcome) -> IterationRecord {
    let (missing_stations, extra_stations) = it
        .validation
        .as_ref()
        .map(|v| (v.coverage.missing.clone(), v.coverage.extra.clone()))
        .unwrap_or_default();

    IterationRecord {
        iteration: it.iteration,
        elapsed_seconds: it.elapsed_seconds,
        memory_delta_bytes: it.memory_delta_bytes,
        exit_code: it.exit_code,
        output_valid: it.output_valid,
        timed_out: it.timed_out,
        success: it.success,
        output_bytes: it.output_bytes,
        format_errors: it.format_errors.clone(),
        value_mismatches: it.value_mismatches.iter().map(ToString::to_string).collect(),
        missing_stations,
        extra_stations,
        error: it.failure.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Language;
    use crate::planner::Candidate;
    use crate::supervisor::BuildError;

    fn iteration(i: usize, secs: f64, success: bool) -> IterationOutcome {
        IterationOutcome {
            iteration: i,
            elapsed_seconds: secs,
            memory_delta_bytes: 1024,
            exit_code: if success { 0 } else { 1 },
            output_valid: success,
            timed_out: false,
            output_bytes: 10,
            format_errors: Vec::new(),
            validation: None,
            value_mismatches: Vec::new(),
            success,
            failure: (!success).then(|| "Exited with code 1".to_string()),
        }
    }

    fn exec(id: &str, state: CandidateState, iterations: Vec<IterationOutcome>) -> CandidateExecution {
        CandidateExecution {
            candidate: Candidate::resolve(
                id,
                Language::Cpp,
                format!("/nonexistent/{id}"),
                Language::Cpp.default_toolchain(),
            ),
            state,
            build_duration: None,
            build_error: None,
            iterations,
        }
    }

    fn session() -> SessionInfo {
        SessionInfo {
            data_file: PathBuf::from("/nonexistent/measurements.txt"),
            iterations: 2,
            timeout: Duration::from_secs(300),
            value_check: ValueCheck::Report,
        }
    }

    #[test]
    fn test_report_ranking_and_speedup() {
        let executions = vec![
            exec("slow", CandidateState::Summarized, vec![iteration(1, 4.0, true), iteration(2, 4.0, true)]),
            exec("fast", CandidateState::Summarized, vec![iteration(1, 1.0, true), iteration(2, 3.0, true)]),
            exec("tied", CandidateState::Summarized, vec![iteration(1, 2.0, true), iteration(2, 9.0, false)]),
        ];
        let report = build_report(&executions, &session());

        let ids: Vec<_> = report.ranking.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fast", "tied", "slow"]);
        assert_eq!(report.ranking[0].medal.as_deref(), Some("🥇"));
        assert_eq!(report.ranking[2].medal.as_deref(), Some("🥉"));
        assert_eq!(report.speedup, Some(2.0));

        let tied = &report.results["tied"];
        assert_eq!(tied.success_count, 1);
        assert_eq!(tied.total_count, 2);
        assert!((tied.success_rate - 50.0).abs() < 1e-9);
        assert_eq!(report.errors["tied"], vec!["Iteration 2: Exited with code 1"]);
        assert!(!report.errors.contains_key("fast"));
    }

    #[test]
    fn test_tie_broken_by_id() {
        let executions = vec![
            exec("b", CandidateState::Summarized, vec![iteration(1, 1.0, true)]),
            exec("a", CandidateState::Summarized, vec![iteration(1, 1.0, true)]),
        ];
        let report = build_report(&executions, &session());
        assert_eq!(report.ranking[0].id, "a");
        assert_eq!(report.speedup, Some(1.0));
    }

    #[test]
    fn test_failed_candidates_have_no_stats() {
        let mut broken = exec("broken", CandidateState::BuildFailed, Vec::new());
        broken.build_error = Some(BuildError::Timeout(Duration::from_secs(60)));
        let executions = vec![
            broken,
            exec("crashy", CandidateState::Summarized, vec![iteration(1, 1.0, false), iteration(2, 1.0, false)]),
            exec("ghost", CandidateState::NotFound, Vec::new()),
        ];
        let report = build_report(&executions, &session());

        assert!(!report.has_results());
        assert!(report.ranking.is_empty());
        assert_eq!(report.speedup, None);
        assert_eq!(report.errors["broken"].len(), 1);
        assert_eq!(report.errors["crashy"].len(), 2);
        assert!(!report.errors.contains_key("ghost"));

        let outcomes: Vec<_> = report.candidates.iter().map(|c| c.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                CandidateOutcome::BuildFailed,
                CandidateOutcome::Failed,
                CandidateOutcome::NotFound
            ]
        );
        assert_eq!(report.benchmark_info.total_candidates, 3);
        assert_eq!(report.benchmark_info.data_file_bytes, 0);
    }
}
