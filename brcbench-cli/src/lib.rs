//! BRCBench CLI Library
//!
//! Command-line front end of the harness. `brcbench::run()` (or
//! `brcbench_cli::run()`) parses arguments, loads `brc.toml` and dispatches:
//!
//! - `bench` (default): build, run, validate, time and rank every candidate
//! - `validate`: check a saved output file, optionally against its input
//! - `check`: build and run one candidate once with strict validation
//! - `list`: show configured candidates and whether a solution exists
//! - `init`: print a default `brc.toml`

mod command;
mod config;
mod executor;
mod planner;
mod supervisor;

pub use command::{Language, TemplateVars, Toolchain, expand};
pub use config::*;
pub use executor::{
    CandidateExecution, CandidateState, ExecutionConfig, Executor, IterationOutcome, SessionInfo,
    build_report, compute_candidate_stats, compute_statistics, format_check_output,
    format_human_output, format_validation_output, rank_candidates, system_info,
    validate_saved_output, verify_iteration,
};
pub use planner::{Candidate, ExecutionPlan, build_plan, resolve_candidates};
pub use supervisor::*;

use anyhow::Context;
use brcbench_core::{MeasurementGroup, check_input_precondition};
use brcbench_logic::{Oracle, OutputParser};
use brcbench_report::{OutputFormat, Report, generate_json_report, generate_validation_json, write_json};
use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// BRCBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "brcbench")]
#[command(author, version, about = "BRCBench - Billion Row Challenge validator and benchmark harness")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Optional subcommand; defaults to `bench`
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments of the default `bench` command
    #[command(flatten)]
    pub bench: BenchArgs,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: nearest brc.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Benchmark session arguments; unset values fall back to `brc.toml`
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Measurement file fed to every candidate
    #[arg(short, long, default_value = "data/test_measurements.txt")]
    pub input: PathBuf,

    /// Iterations per candidate
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Per-iteration timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Write the JSON report to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only benchmark these languages
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Vec<Language>,

    /// Only benchmark candidates whose id matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Candidates benchmarked concurrently
    #[arg(long)]
    pub jobs: Option<usize>,

    /// How oracle mismatches affect iteration success
    #[arg(long, value_enum)]
    pub value_check: Option<ValueCheck>,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark all candidates (default)
    Bench(BenchArgs),
    /// Validate a saved output file
    Validate {
        /// Output file produced by a solution
        output: PathBuf,
        /// Input the output was computed from; enables value checks
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Write the JSON validation report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Output format: human, json
        #[arg(long)]
        format: Option<String>,
    },
    /// Build and run one candidate once with strict validation
    Check {
        /// Candidate id
        candidate: String,
        /// Measurement file
        #[arg(short, long, default_value = "data/test_measurements.txt")]
        input: PathBuf,
        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<f64>,
    },
    /// List configured candidates
    List,
    /// Print a default brc.toml
    Init,
}

/// Run the BRCBench CLI with process arguments.
pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the BRCBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(cli.verbose);

    if let Some(Commands::Init) = cli.command {
        print!("{}", BrcConfig::default_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let config = BrcConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Bench(ref args)) => run_bench(args, &config),
        None => run_bench(&cli.bench, &config),
        Some(Commands::Validate {
            ref output,
            ref input,
            ref report,
            ref format,
        }) => run_validate(output, input.as_deref(), report.as_deref(), format.as_deref(), &config),
        Some(Commands::Check {
            ref candidate,
            ref input,
            timeout,
        }) => run_check(candidate, input, timeout, &config),
        Some(Commands::List) => {
            list_candidates(&config);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Init) => Ok(ExitCode::SUCCESS),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "brcbench=debug"
    } else {
        "brcbench=info"
    };
    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn output_format(flag: Option<&str>, config: &BrcConfig) -> anyhow::Result<OutputFormat> {
    flag.unwrap_or(&config.output.format)
        .parse()
        .map_err(anyhow::Error::msg)
}

fn timeout_from_secs(secs: Option<f64>, fallback: Duration) -> anyhow::Result<Duration> {
    match secs {
        Some(s) if s > 0.0 => {
            Duration::try_from_secs_f64(s).map_err(|_| anyhow::anyhow!("Invalid timeout: {} seconds", s))
        }
        Some(s) => Err(anyhow::anyhow!("Invalid timeout: {} seconds", s)),
        None => Ok(fallback),
    }
}

fn load_oracle(input: &Path, config: &BrcConfig) -> anyhow::Result<Oracle> {
    let group = MeasurementGroup::load(input)
        .with_context(|| format!("Failed to load input {}", input.display()))?;
    let summary = group.summary();
    tracing::info!(
        stations = group.len(),
        readings = summary.readings,
        skipped = summary.skipped,
        "ground truth computed"
    );
    Ok(Oracle::new(&group).with_tolerances(config.validation.tolerances()))
}

fn run_bench(args: &BenchArgs, config: &BrcConfig) -> anyhow::Result<ExitCode> {
    let format = output_format(args.format.as_deref(), config)?;
    let iterations = args.iterations.unwrap_or(config.runner.iterations);
    anyhow::ensure!(iterations > 0, "iterations must be at least 1");
    let timeout = timeout_from_secs(args.timeout, config.timeout()?)?;
    let value_check = args.value_check.unwrap_or(config.runner.value_check);
    let jobs = args.jobs.or(config.runner.jobs).unwrap_or(1).max(1);

    // Fatal before any candidate work
    check_input_precondition(&args.input)?;

    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter pattern")?;
    let plan = build_plan(resolve_candidates(config), &args.languages, filter.as_ref());
    if plan.candidates.is_empty() {
        eprintln!("No candidates matched.");
        return Ok(ExitCode::FAILURE);
    }

    let oracle = if value_check.is_enabled() {
        Some(load_oracle(&args.input, config)?)
    } else {
        None
    };

    eprintln!(
        "Benchmarking {} candidates ({} found), {} iterations each, {} job(s)...\n",
        plan.candidates.len(),
        plan.found().count(),
        iterations,
        jobs
    );

    let exec_config = ExecutionConfig {
        iterations,
        timeout,
        build_timeout: config.build_timeout()?,
        value_check,
        jobs,
        show_progress: true,
    };
    let runner = ExecutionRunner::new(OutputParser::new(config.validation.grammar()));
    let executions = Executor::new(exec_config, runner, oracle.as_ref()).execute(&plan, &args.input)?;

    let report = build_report(
        &executions,
        &SessionInfo {
            data_file: args.input.clone(),
            iterations,
            timeout,
            value_check,
        },
    );

    match format {
        OutputFormat::Json => println!("{}", generate_json_report(&report)?),
        OutputFormat::Human => print!("{}", format_human_output(&report)),
    }

    if let Some(path) = report_path(args.output.as_deref(), config, &report) {
        write_json(&path, &report)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        eprintln!("Report written to: {}", path.display());
    }

    if report.has_results() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("\nNo candidate produced a successful iteration");
        Ok(ExitCode::FAILURE)
    }
}

/// Explicit `--output`, else a timestamped file in the configured directory
fn report_path(explicit: Option<&Path>, config: &BrcConfig, report: &Report) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        config.output.directory.as_ref().map(|dir| {
            dir.join(format!(
                "benchmark_{}.json",
                report.benchmark_info.timestamp.format("%Y%m%d_%H%M%S")
            ))
        })
    })
}

fn run_validate(
    output: &Path,
    input: Option<&Path>,
    report_path: Option<&Path>,
    format: Option<&str>,
    config: &BrcConfig,
) -> anyhow::Result<ExitCode> {
    let format = output_format(format, config)?;
    if let Some(input) = input {
        check_input_precondition(input)?;
    }

    let doc = validate_saved_output(output, input, &config.validation)?;
    match format {
        OutputFormat::Json => println!("{}", generate_validation_json(&doc)?),
        OutputFormat::Human => print!("{}", format_validation_output(&doc)),
    }

    if let Some(path) = report_path {
        write_json(path, &doc)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        eprintln!("Validation report written to: {}", path.display());
    }

    Ok(if doc.report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_check(
    id: &str,
    input: &Path,
    timeout: Option<f64>,
    config: &BrcConfig,
) -> anyhow::Result<ExitCode> {
    let candidates = resolve_candidates(config);
    let Some(candidate) = candidates.iter().find(|c| c.id == id) else {
        let known: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        anyhow::bail!("Unknown candidate '{}'. Known: {}", id, known.join(", "));
    };

    check_input_precondition(input)?;
    let oracle = load_oracle(input, config)?;

    let exec_config = ExecutionConfig {
        iterations: 1,
        timeout: timeout_from_secs(timeout, config.timeout()?)?,
        build_timeout: config.build_timeout()?,
        value_check: ValueCheck::Strict,
        jobs: 1,
        show_progress: false,
    };
    let runner = ExecutionRunner::new(OutputParser::new(config.validation.grammar()));
    let exec = Executor::new(exec_config, runner, Some(&oracle)).execute_candidate(
        candidate,
        input,
        &ProgressBar::hidden(),
    );

    print!("{}", format_check_output(&exec));
    if !candidate.is_found() {
        eprintln!(
            "No {} sources found in {}",
            candidate.toolchain.extension,
            candidate.dir.display()
        );
    }

    Ok(if exec.success_count() == 1 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_candidates(config: &BrcConfig) {
    println!("BRCBench Candidates:");

    let plan = build_plan(resolve_candidates(config), &[], None);
    for candidate in &plan.candidates {
        let state = if candidate.is_found() {
            format!("{} source(s)", candidate.sources.len())
        } else {
            "not found".to_string()
        };
        println!(
            "├── {} [{}] {} ({})",
            candidate.id,
            candidate.language,
            candidate.dir.display(),
            state
        );
    }

    println!(
        "{} candidates configured, {} found.",
        plan.candidates.len(),
        plan.found().count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_bench() {
        let cli = Cli::try_parse_from(["brcbench", "-n", "5", "-l", "cpp,go"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.bench.iterations, Some(5));
        assert_eq!(cli.bench.languages, vec![Language::Cpp, Language::Go]);
        assert_eq!(cli.bench.input, PathBuf::from("data/test_measurements.txt"));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "brcbench",
            "validate",
            "out.txt",
            "--input",
            "in.txt",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Validate { output, input, .. }) => {
                assert_eq!(output, PathBuf::from("out.txt"));
                assert_eq!(input, Some(PathBuf::from("in.txt")));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["brcbench", "bench", "--value-check", "strict"]).unwrap();
        match cli.command {
            Some(Commands::Bench(args)) => assert_eq!(args.value_check, Some(ValueCheck::Strict)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_language_rejected() {
        assert!(Cli::try_parse_from(["brcbench", "-l", "cobol"]).is_err());
    }

    #[test]
    fn test_timeout_from_secs() {
        let fallback = Duration::from_secs(300);
        assert_eq!(timeout_from_secs(None, fallback).unwrap(), fallback);
        assert_eq!(
            timeout_from_secs(Some(1.5), fallback).unwrap(),
            Duration::from_millis(1500)
        );
        assert!(timeout_from_secs(Some(0.0), fallback).is_err());
        assert!(timeout_from_secs(Some(f64::NAN), fallback).is_err());
        assert!(timeout_from_secs(Some(f64::INFINITY), fallback).is_err());
        assert!(timeout_from_secs(Some(1e20), fallback).is_err());
    }

    #[test]
    fn test_report_path_prefers_explicit() {
        let mut config = BrcConfig::default();
        let report = Report::default();
        assert_eq!(report_path(None, &config, &report), None);

        config.output.directory = Some(PathBuf::from("results"));
        let generated = report_path(None, &config, &report).unwrap();
        assert!(generated.starts_with("results"));
        assert!(generated.to_string_lossy().ends_with(".json"));

        let explicit = report_path(Some(Path::new("r.json")), &config, &report).unwrap();
        assert_eq!(explicit, PathBuf::from("r.json"));
    }
}
