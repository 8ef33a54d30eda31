//! Candidate Execution
//!
//! Drives each candidate through its lifecycle:
//!
//! ```text
//! NotFound ◄── (no sources)
//!
//! BuildPending ──► BuildFailed            (terminal, one error)
//!      │
//!      ▼
//!    Built ──► Running(1) ──► … ──► Running(N) ──► Summarized
//! ```
//!
//! Iterations of one candidate run strictly in sequence. Different candidates
//! may run concurrently on a rayon pool of `jobs` threads; they share nothing
//! but the read-only oracle and the progress bar.

use super::verification::{IterationOutcome, verify_iteration};
use crate::config::ValueCheck;
use crate::planner::{Candidate, ExecutionPlan};
use crate::supervisor::{BuildError, ExecutionRunner};
use brcbench_logic::Oracle;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Configuration for a benchmark session
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Iterations per candidate
    pub iterations: usize,
    /// Wall-clock limit per iteration
    pub timeout: Duration,
    /// Wall-clock limit per build
    pub build_timeout: Duration,
    /// How oracle mismatches affect success
    pub value_check: ValueCheck,
    /// Candidates run concurrently
    pub jobs: usize,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            timeout: Duration::from_secs(300),
            build_timeout: Duration::from_secs(60),
            value_check: ValueCheck::Report,
            jobs: 1,
            show_progress: true,
        }
    }
}

/// Lifecycle position of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    NotFound,
    BuildPending,
    BuildFailed,
    Built,
    /// 1-based iteration in progress
    Running(usize),
    Summarized,
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateState::NotFound => write!(f, "not found"),
            CandidateState::BuildPending => write!(f, "build pending"),
            CandidateState::BuildFailed => write!(f, "build failed"),
            CandidateState::Built => write!(f, "built"),
            CandidateState::Running(i) => write!(f, "running #{i}"),
            CandidateState::Summarized => write!(f, "summarized"),
        }
    }
}

/// Everything recorded for one candidate
#[derive(Debug, Clone)]
pub struct CandidateExecution {
    pub candidate: Candidate,
    pub state: CandidateState,
    pub build_duration: Option<Duration>,
    pub build_error: Option<BuildError>,
    pub iterations: Vec<IterationOutcome>,
}

impl CandidateExecution {
    fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            state: CandidateState::BuildPending,
            build_duration: None,
            build_error: None,
            iterations: Vec::new(),
        }
    }

    fn transition(&mut self, next: CandidateState) {
        tracing::debug!(candidate = %self.candidate.id, from = %self.state, to = %next, "state");
        self.state = next;
    }

    /// Successful iterations
    pub fn successes(&self) -> impl Iterator<Item = &IterationOutcome> {
        self.iterations.iter().filter(|it| it.success)
    }

    /// Number of successful iterations
    pub fn success_count(&self) -> usize {
        self.successes().count()
    }
}

/// Runs an [`ExecutionPlan`]
pub struct Executor<'a> {
    config: ExecutionConfig,
    runner: ExecutionRunner,
    oracle: Option<&'a Oracle>,
}

impl<'a> Executor<'a> {
    /// Create an executor; `oracle` is consulted only when value checking is on
    pub fn new(config: ExecutionConfig, runner: ExecutionRunner, oracle: Option<&'a Oracle>) -> Self {
        Self {
            config,
            runner,
            oracle,
        }
    }

    /// Execute every candidate of the plan, preserving plan order
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        input: &Path,
    ) -> anyhow::Result<Vec<CandidateExecution>> {
        let found = plan.found().count();
        let pb = if self.config.show_progress {
            ProgressBar::new((found * self.config.iterations) as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let jobs = self.config.jobs.max(1).min(found.max(1));
        let executions = if jobs == 1 {
            plan.candidates
                .iter()
                .map(|candidate| self.execute_candidate(candidate, input, &pb))
                .collect()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build candidate pool: {}", e))?;
            pool.install(|| {
                plan.candidates
                    .par_iter()
                    .map(|candidate| self.execute_candidate(candidate, input, &pb))
                    .collect()
            })
        };

        pb.finish_with_message("Complete");
        Ok(executions)
    }

    /// Build once, then run every iteration
    pub fn execute_candidate(
        &self,
        candidate: &Candidate,
        input: &Path,
        pb: &ProgressBar,
    ) -> CandidateExecution {
        let mut exec = CandidateExecution::new(candidate.clone());
        let iterations = self.config.iterations;

        if !candidate.is_found() {
            tracing::info!(
                candidate = %candidate.id,
                dir = %candidate.dir.display(),
                "no solution found, skipping"
            );
            exec.transition(CandidateState::NotFound);
            return exec;
        }

        pb.set_message(format!("{} build", candidate.id));
        match self.runner.build(candidate, input, self.config.build_timeout) {
            Ok(duration) => {
                tracing::info!(candidate = %candidate.id, secs = duration.as_secs_f64(), "build ok");
                exec.build_duration = Some(duration);
                exec.transition(CandidateState::Built);
            }
            Err(e) => {
                tracing::warn!(candidate = %candidate.id, error = %e, "build failed");
                exec.build_error = Some(e);
                exec.transition(CandidateState::BuildFailed);
                pb.inc(iterations as u64);
                return exec;
            }
        }

        for iteration in 1..=iterations {
            exec.transition(CandidateState::Running(iteration));
            pb.set_message(format!("{} {}/{}", candidate.id, iteration, iterations));

            let run = self.runner.run(candidate, input, self.config.timeout);
            let outcome = verify_iteration(iteration, run, self.oracle, self.config.value_check);

            if outcome.success {
                tracing::info!(
                    candidate = %candidate.id,
                    iteration,
                    secs = outcome.elapsed_seconds,
                    "iteration ok"
                );
            } else {
                tracing::warn!(
                    candidate = %candidate.id,
                    iteration,
                    error = outcome.failure.as_deref().unwrap_or("unknown"),
                    "iteration failed"
                );
            }
            if !outcome.value_mismatches.is_empty() {
                tracing::warn!(
                    candidate = %candidate.id,
                    iteration,
                    mismatches = outcome.value_mismatches.len(),
                    "values outside tolerance"
                );
            }

            exec.iterations.push(outcome);
            pb.inc(1);
        }

        exec.transition(CandidateState::Summarized);
        exec
    }
}
