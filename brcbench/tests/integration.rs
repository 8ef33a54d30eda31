//! Integration tests for BRCBench
//!
//! These tests drive the CLI end to end with shell-script candidates.

use brcbench::{
    Cli, MeasurementGroup, Oracle, Report, ValidationStatus, format_lines, parse_output,
    run_with_cli,
};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const INPUT: &str = "Paris=10.0\nParis=20.0\nTokyo=5.0\n";
const CORRECT: &str = "Paris=10.0/15.0/20.0\nTokyo=5.0/5.0/5.0\n";

struct Arena {
    dir: tempfile::TempDir,
}

impl Arena {
    fn new() -> Self {
        let arena = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::write(arena.path("measurements.txt"), INPUT).unwrap();
        arena
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn candidate(&self, id: &str, script: &str) {
        let dir = self.path(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("solution.sh"), script).unwrap();
    }

    /// Writes brc.toml listing `ids` as shell candidates under the python tag
    fn config(&self, ids: &[&str]) -> PathBuf {
        let mut toml = String::from(
            "[runner]\ntimeout = \"10s\"\niterations = 2\n\n\
             [languages.python]\nextension = \"sh\"\nbuild = []\nrun = [\"sh\", \"{dir}/solution.sh\"]\n",
        );
        for id in ids {
            toml.push_str(&format!(
                "\n[[candidates]]\nid = \"{}\"\nlanguage = \"python\"\npath = \"{}\"\n",
                id,
                self.path(id).display()
            ));
        }
        let path = self.path("brc.toml");
        fs::write(&path, toml).unwrap();
        path
    }

    fn run(&self, config: &Path, args: &[&str]) -> anyhow::Result<ExitCode> {
        let mut argv = vec![
            "brcbench".to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        run_with_cli(Cli::try_parse_from(argv).unwrap())
    }
}

#[test]
fn test_bench_end_to_end() {
    let arena = Arena::new();
    arena.candidate("fast", &format!("printf '{}'", CORRECT.replace('\n', "\\n")));
    arena.candidate("legacy", "printf '{Paris=10.0/15.0/20.0, Tokyo=5.0/5.0/5.0}\\n'");
    arena.candidate("wrong", "printf 'Paris=10.0/16.0/20.0\\nTokyo=5.0/5.0/5.0\\n'");
    arena.candidate("crash", "exit 3");
    let config = arena.config(&["fast", "legacy", "wrong", "crash", "ghost"]);

    let input = arena.path("measurements.txt");
    let report_path = arena.path("out/report.json");
    let code = arena
        .run(
            &config,
            &[
                "bench",
                "-i",
                input.to_str().unwrap(),
                "--value-check",
                "strict",
                "--format",
                "json",
                "-o",
                report_path.to_str().unwrap(),
            ],
        )
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let report: Report = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report.benchmark_info.total_candidates, 5);
    assert_eq!(report.benchmark_info.iterations, 2);
    assert_eq!(report.benchmark_info.value_check, "strict");

    let ranked: Vec<_> = report.results.keys().map(String::as_str).collect();
    assert_eq!(ranked, vec!["fast", "legacy"]);
    assert_eq!(report.results["fast"].success_count, 2);
    assert_eq!(report.ranking.len(), 2);
    assert!(report.speedup.is_some());

    // Strict mode disqualifies wrong values; exit codes are recorded
    assert_eq!(report.errors["wrong"].len(), 2);
    assert_eq!(report.errors["crash"].len(), 2);
    let crash = report.candidates.iter().find(|c| c.id == "crash").unwrap();
    assert!(crash.iterations.iter().all(|it| it.exit_code == 3));
    let ghost = report.candidates.iter().find(|c| c.id == "ghost").unwrap();
    assert!(ghost.iterations.is_empty());
    assert!(!report.errors.contains_key("ghost"));
}

#[test]
fn test_bench_fails_without_results() {
    let arena = Arena::new();
    arena.candidate("crash", "exit 1");
    let config = arena.config(&["crash"]);
    let input = arena.path("measurements.txt");

    let code = arena
        .run(&config, &["bench", "-i", input.to_str().unwrap(), "--format", "json"])
        .unwrap();
    assert_eq!(code, ExitCode::FAILURE);
}

#[test]
fn test_bench_rejects_bad_input() {
    let arena = Arena::new();
    arena.candidate("fast", "true");
    let config = arena.config(&["fast"]);

    let missing = arena.path("nope.txt");
    assert!(arena.run(&config, &["-i", missing.to_str().unwrap()]).is_err());

    let malformed = arena.path("malformed.txt");
    fs::write(&malformed, "no separator here\nParis=1.0\n").unwrap();
    assert!(arena.run(&config, &["-i", malformed.to_str().unwrap()]).is_err());
}

#[test]
fn test_validate_command() {
    let arena = Arena::new();
    let config = arena.config(&[]);
    let input = arena.path("measurements.txt");

    let good = arena.path("good.txt");
    fs::write(&good, CORRECT).unwrap();
    let code = arena
        .run(
            &config,
            &["validate", good.to_str().unwrap(), "--input", input.to_str().unwrap()],
        )
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let bad = arena.path("bad.txt");
    fs::write(&bad, "Paris=10.0/15.0/20.0\nOslo=1.0/1.0/1.0\n").unwrap();
    let doc_path = arena.path("validation.json");
    let code = arena
        .run(
            &config,
            &[
                "validate",
                bad.to_str().unwrap(),
                "--input",
                input.to_str().unwrap(),
                "--report",
                doc_path.to_str().unwrap(),
            ],
        )
        .unwrap();
    assert_eq!(code, ExitCode::FAILURE);

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&doc_path).unwrap()).unwrap();
    assert_eq!(doc["status"], "FAIL");
    assert_eq!(doc["coverage"]["missing"][0], "Tokyo");
    assert_eq!(doc["coverage"]["extra"][0], "Oslo");
    assert!(doc["validation_timestamp"].is_string());
    assert_eq!(doc["station_details"]["Paris"]["range"], 10.0);
}

#[test]
fn test_check_command() {
    let arena = Arena::new();
    arena.candidate("fast", &format!("printf '{}'", CORRECT.replace('\n', "\\n")));
    arena.candidate("partial", "printf 'Paris=10.0/15.0/20.0\\n'");
    let config = arena.config(&["fast", "partial"]);
    let input = arena.path("measurements.txt");

    let code = arena
        .run(&config, &["check", "fast", "-i", input.to_str().unwrap()])
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    // A missing station fails strict validation
    let code = arena
        .run(&config, &["check", "partial", "-i", input.to_str().unwrap()])
        .unwrap();
    assert_eq!(code, ExitCode::FAILURE);

    assert!(arena.run(&config, &["check", "unknown"]).is_err());
}

#[test]
fn test_library_roundtrip_passes_oracle() {
    let group = MeasurementGroup::from_reader(INPUT.as_bytes()).unwrap();
    let oracle = Oracle::new(&group);

    let truth: Vec<_> = oracle.truth().iter().cloned().collect();
    let text = format_lines(&truth);
    assert_eq!(text, CORRECT);

    let report = oracle.validate(&parse_output(&text));
    assert_eq!(report.status, ValidationStatus::Pass);
    assert_eq!(report.coverage.percentage(), 100.0);
}
