//! Candidate Planner
//!
//! Resolves the configured (or discovered) candidates into an execution plan.
//!
//! Resolution:
//! - Explicit `[[candidates]]` entries win; otherwise one candidate per
//!   language at `<submissions root>/<tag>`
//! - Sources are the files with the toolchain's extension directly in the
//!   candidate directory or its `src/` subdirectory
//! - A candidate with no sources is kept in the plan as not found
//!
//! Filtering options:
//! - Language subset
//! - Regex pattern matching on candidate id
//!
//! Ordering: candidates are sorted by id for deterministic execution.

use crate::command::{Language, TemplateVars, Toolchain, expand};
use crate::config::BrcConfig;
use regex::Regex;
use std::path::{Path, PathBuf};

/// A candidate program resolved against its toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub language: Language,
    pub dir: PathBuf,
    /// Source files, sorted; empty when the candidate was not found
    pub sources: Vec<PathBuf>,
    pub toolchain: Toolchain,
}

impl Candidate {
    /// Resolve a candidate, scanning `dir` for sources
    pub fn resolve(
        id: impl Into<String>,
        language: Language,
        dir: impl Into<PathBuf>,
        toolchain: Toolchain,
    ) -> Self {
        let dir = dir.into();
        let sources = find_sources(&dir, &toolchain.extension);
        Self {
            id: id.into(),
            language,
            dir,
            sources,
            toolchain,
        }
    }

    /// Whether a solution artifact exists
    pub fn is_found(&self) -> bool {
        !self.sources.is_empty()
    }

    fn vars<'a>(&'a self, input: &'a Path) -> TemplateVars<'a> {
        TemplateVars {
            dir: &self.dir,
            sources: &self.sources,
            input,
            id: &self.id,
        }
    }

    /// Expanded build argv, `None` when the language has no build step
    pub fn build_argv(&self, input: &Path) -> Option<Vec<String>> {
        self.toolchain
            .build
            .as_ref()
            .map(|template| expand(template, &self.vars(input)))
    }

    /// Expanded run argv
    pub fn run_argv(&self, input: &Path) -> Vec<String> {
        expand(&self.toolchain.run, &self.vars(input))
    }
}

fn find_sources(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = [dir.to_path_buf(), dir.join("src")]
        .iter()
        .filter_map(|d| std::fs::read_dir(d).ok())
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == extension)
        })
        .collect();
    sources.sort();
    sources
}

/// Execution plan for candidates
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Ordered list of candidates, found or not
    pub candidates: Vec<Candidate>,
}

impl ExecutionPlan {
    /// Candidates with a solution on disk
    pub fn found(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.is_found())
    }
}

/// Every candidate the configuration describes, unfiltered
pub fn resolve_candidates(config: &BrcConfig) -> Vec<Candidate> {
    if config.candidates.is_empty() {
        Language::ALL
            .into_iter()
            .map(|lang| {
                Candidate::resolve(
                    lang.tag(),
                    lang,
                    config.submissions.root.join(lang.tag()),
                    config.languages.toolchain(lang),
                )
            })
            .collect()
    } else {
        config
            .candidates
            .iter()
            .map(|entry| {
                Candidate::resolve(
                    entry
                        .id
                        .clone()
                        .unwrap_or_else(|| entry.language.tag().to_string()),
                    entry.language,
                    &entry.path,
                    config.languages.toolchain(entry.language),
                )
            })
            .collect()
    }
}

/// Build execution plan from resolved candidates
///
/// An empty `languages` slice keeps every language.
pub fn build_plan(
    candidates: impl IntoIterator<Item = Candidate>,
    languages: &[Language],
    filter: Option<&Regex>,
) -> ExecutionPlan {
    let mut selected: Vec<_> = candidates
        .into_iter()
        .filter(|c| languages.is_empty() || languages.contains(&c.language))
        .filter(|c| filter.is_none_or(|re| re.is_match(&c.id)))
        .collect();

    // Sort alphabetically for deterministic execution order
    selected.sort_by(|a, b| a.id.cmp(&b.id));
    selected.dedup_by(|a, b| {
        if a.id == b.id {
            tracing::warn!(id = %a.id, "duplicate candidate id, keeping the first");
            true
        } else {
            false
        }
    });

    ExecutionPlan {
        candidates: selected,
    }
}
