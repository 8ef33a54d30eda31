//! Statistics Computation
//!
//! Per-candidate summaries over successful iterations only. A candidate with
//! no successful iteration has no statistics at all.

use super::execution::CandidateExecution;
use brcbench_report::CandidateStats;
use brcbench_stats::compute_summary;
use rayon::prelude::*;

/// Summarize one candidate
pub fn compute_candidate_stats(exec: &CandidateExecution) -> Option<CandidateStats> {
    let elapsed: Vec<f64> = exec.successes().map(|it| it.elapsed_seconds).collect();
    if elapsed.is_empty() {
        return None;
    }
    let memory: Vec<f64> = exec
        .successes()
        .map(|it| it.memory_delta_bytes as f64)
        .collect();

    let total_count = exec.iterations.len();
    Some(CandidateStats {
        success_count: elapsed.len(),
        total_count,
        success_rate: elapsed.len() as f64 / total_count as f64 * 100.0,
        elapsed: compute_summary(&elapsed)?,
        memory: compute_summary(&memory)?,
    })
}

/// Compute statistics for every candidate (parallelized with Rayon)
///
/// Returns (candidate id, optional statistics) pairs in input order.
pub fn compute_statistics(executions: &[CandidateExecution]) -> Vec<(String, Option<CandidateStats>)> {
    executions
        .par_iter()
        .map(|exec| (exec.candidate.id.clone(), compute_candidate_stats(exec)))
        .collect()
}
