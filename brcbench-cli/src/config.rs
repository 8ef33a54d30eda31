//! Configuration loading from brc.toml
//!
//! BRCBench configuration can be specified in a `brc.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use crate::command::{Language, Toolchain};
use brcbench_logic::{GrammarConfig, Tolerances};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name searched for by [`BrcConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "brc.toml";

/// BRCBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrcConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Where submissions live
    #[serde(default)]
    pub submissions: SubmissionsConfig,
    /// Per-language toolchain overrides
    #[serde(default)]
    pub languages: LanguagesConfig,
    /// Explicit candidate list; empty means discover one per language
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
    /// Oracle and grammar thresholds
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// How mismatching values affect an iteration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ValueCheck {
    /// Skip ground truth entirely
    Off,
    /// Record mismatches as warnings
    #[default]
    Report,
    /// A mismatch fails the iteration
    Strict,
}

impl ValueCheck {
    /// Whether ground truth is needed
    pub fn is_enabled(self) -> bool {
        !matches!(self, ValueCheck::Off)
    }
}

impl fmt::Display for ValueCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueCheck::Off => "off",
            ValueCheck::Report => "report",
            ValueCheck::Strict => "strict",
        })
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Wall-clock limit for one iteration (e.g., "300s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Wall-clock limit for one build
    #[serde(default = "default_build_timeout")]
    pub build_timeout: String,
    /// Iterations per candidate
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Candidates benchmarked concurrently
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Value checking mode
    #[serde(default)]
    pub value_check: ValueCheck,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            build_timeout: default_build_timeout(),
            iterations: default_iterations(),
            jobs: None,
            value_check: ValueCheck::default(),
        }
    }
}

fn default_timeout() -> String {
    "300s".to_string()
}
fn default_build_timeout() -> String {
    "60s".to_string()
}
fn default_iterations() -> usize {
    3
}

/// Submission discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionsConfig {
    /// Directory holding one subdirectory per language
    #[serde(default = "default_submissions_root")]
    pub root: PathBuf,
}

impl Default for SubmissionsConfig {
    fn default() -> Self {
        Self {
            root: default_submissions_root(),
        }
    }
}

fn default_submissions_root() -> PathBuf {
    PathBuf::from("submissions")
}

/// Partial override of a language's toolchain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainOverride {
    /// Source extension
    pub extension: Option<String>,
    /// Build argv; an empty list disables the build step
    pub build: Option<Vec<String>>,
    /// Run argv
    pub run: Option<Vec<String>>,
}

/// `[languages.<tag>]` tables; unknown tags are rejected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguagesConfig {
    #[serde(default)]
    pub java: Option<ToolchainOverride>,
    #[serde(default)]
    pub python: Option<ToolchainOverride>,
    #[serde(default)]
    pub cpp: Option<ToolchainOverride>,
    #[serde(default)]
    pub go: Option<ToolchainOverride>,
    #[serde(default)]
    pub rust: Option<ToolchainOverride>,
}

impl LanguagesConfig {
    fn get(&self, language: Language) -> Option<&ToolchainOverride> {
        match language {
            Language::Java => self.java.as_ref(),
            Language::Python => self.python.as_ref(),
            Language::Cpp => self.cpp.as_ref(),
            Language::Go => self.go.as_ref(),
            Language::Rust => self.rust.as_ref(),
        }
    }

    /// Built-in toolchain with any configured override applied
    pub fn toolchain(&self, language: Language) -> Toolchain {
        let mut toolchain = language.default_toolchain();
        if let Some(over) = self.get(language) {
            if let Some(extension) = &over.extension {
                toolchain.extension = extension.trim_start_matches('.').to_string();
            }
            if let Some(build) = &over.build {
                toolchain.build = (!build.is_empty()).then(|| build.clone());
            }
            if let Some(run) = &over.run {
                toolchain.run = run.clone();
            }
        }
        toolchain
    }
}

/// Explicit candidate entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    /// Unique id; defaults to the language tag
    pub id: Option<String>,
    /// Language tag
    pub language: Language,
    /// Directory holding the sources
    pub path: PathBuf,
}

/// Oracle and grammar thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Tolerance for min and max
    #[serde(default = "default_min_max_tolerance")]
    pub min_max_tolerance: f64,
    /// Tolerance for mean
    #[serde(default = "default_mean_tolerance")]
    pub mean_tolerance: f64,
    /// Lower plausibility bound (warning only)
    #[serde(default = "default_sanity_min")]
    pub sanity_min: f64,
    /// Upper plausibility bound (warning only)
    #[serde(default = "default_sanity_max")]
    pub sanity_max: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_max_tolerance: default_min_max_tolerance(),
            mean_tolerance: default_mean_tolerance(),
            sanity_min: default_sanity_min(),
            sanity_max: default_sanity_max(),
        }
    }
}

fn default_min_max_tolerance() -> f64 {
    0.1
}
fn default_mean_tolerance() -> f64 {
    0.01
}
fn default_sanity_min() -> f64 {
    -100.0
}
fn default_sanity_max() -> f64 {
    100.0
}

impl ValidationConfig {
    /// Oracle tolerances
    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            min_max: self.min_max_tolerance,
            mean: self.mean_tolerance,
        }
    }

    /// Tolerances must be finite and non-negative, and the plausibility
    /// bounds must form a range
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("min_max_tolerance", self.min_max_tolerance),
            ("mean_tolerance", self.mean_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow::anyhow!("Invalid {}: {}", name, value));
            }
        }
        if !self.sanity_min.is_finite() || !self.sanity_max.is_finite() || self.sanity_min > self.sanity_max {
            return Err(anyhow::anyhow!(
                "Invalid sanity range: {} to {}",
                self.sanity_min,
                self.sanity_max
            ));
        }
        Ok(())
    }

    /// Parser settings
    pub fn grammar(&self) -> GrammarConfig {
        GrammarConfig {
            sanity_min: self.sanity_min,
            sanity_max: self.sanity_max,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory for timestamped reports when `--output` is not given
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl BrcConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validation.validate()?;
        Ok(config)
    }

    /// Walk up from the current directory looking for `brc.toml`
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Explicit path, else discovered file, else defaults
    ///
    /// A discovered file that fails to parse is an error, not a silent fallback.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_path(),
        };
        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
                    .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))
            }
            None => Ok(Self::default()),
        }
    }

    /// Iteration timeout
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        Self::parse_timeout(&self.runner.timeout)
    }

    /// Build timeout
    pub fn build_timeout(&self) -> anyhow::Result<Duration> {
        Self::parse_timeout(&self.runner.build_timeout)
    }

    /// A zero timeout would kill every child at spawn
    fn parse_timeout(s: &str) -> anyhow::Result<Duration> {
        match Self::parse_duration(s)? {
            0 => Err(anyhow::anyhow!("Invalid timeout: {}", s)),
            nanos => Ok(Duration::from_nanos(nanos)),
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# BRCBench Configuration

[runner]
# Wall-clock limit for one iteration
timeout = "300s"
# Wall-clock limit for one build
build_timeout = "60s"
# Iterations per candidate
iterations = 3
# Candidates benchmarked concurrently (uncomment to enable)
# jobs = 2
# Value checking: off, report, strict
value_check = "report"

[submissions]
# One subdirectory per language tag
root = "submissions"

[validation]
min_max_tolerance = 0.1
mean_tolerance = 0.01
sanity_min = -100.0
sanity_max = 100.0

[output]
# Default output format: human, json
format = "human"
# Directory for timestamped JSON reports (uncomment to enable)
# directory = "results"

# Toolchain overrides. Placeholders: {dir} {sources} {input} {id}
# [languages.cpp]
# build = ["clang++", "-std=c++20", "-O3", "-march=native", "-o", "{dir}/solution", "{sources}"]
# run = ["{dir}/solution"]

# Explicit candidates replace per-language discovery
# [[candidates]]
# id = "cpp-simd"
# language = "cpp"
# path = "submissions/cpp-simd"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrcConfig::default();
        assert_eq!(config.runner.timeout, "300s");
        assert_eq!(config.runner.iterations, 3);
        assert_eq!(config.runner.value_check, ValueCheck::Report);
        assert_eq!(config.submissions.root, PathBuf::from("submissions"));
        assert_eq!(config.validation.tolerances(), Tolerances::default());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(BrcConfig::parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(BrcConfig::parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(BrcConfig::parse_duration("100us").unwrap(), 100_000);
        assert_eq!(BrcConfig::parse_duration("1000ns").unwrap(), 1000);
        assert_eq!(BrcConfig::parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(BrcConfig::parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(BrcConfig::parse_duration("30").unwrap(), 30_000_000_000);
        assert!(BrcConfig::parse_duration("5h").is_err());
        assert!(BrcConfig::parse_duration("").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            timeout = "10s"
            value_check = "strict"

            [languages.cpp]
            build = ["clang++", "-O3", "-o", "{dir}/solution", "{sources}"]

            [languages.python]
            run = ["pypy3", "{dir}/solution.py"]

            [[candidates]]
            id = "fast"
            language = "cpp"
            path = "work/fast"
        "#;

        let config: BrcConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(config.runner.value_check, ValueCheck::Strict);
        // Defaults should still apply
        assert_eq!(config.runner.iterations, 3);
        assert_eq!(config.output.format, "human");

        let cpp = config.languages.toolchain(Language::Cpp);
        assert_eq!(cpp.build.unwrap()[0], "clang++");
        assert_eq!(cpp.run, vec!["{dir}/solution"]);

        let python = config.languages.toolchain(Language::Python);
        assert_eq!(python.run[0], "pypy3");
        assert!(python.build.is_none());

        assert_eq!(config.candidates.len(), 1);
        assert_eq!(config.candidates[0].language, Language::Cpp);
    }

    #[test]
    fn test_unknown_language_rejected() {
        let unknown_table = "[languages.cobol]\nrun = [\"cobc\"]\n";
        assert!(toml::from_str::<BrcConfig>(unknown_table).is_err());

        let unknown_candidate = "[[candidates]]\nlanguage = \"cobol\"\npath = \"x\"\n";
        assert!(toml::from_str::<BrcConfig>(unknown_candidate).is_err());
    }

    #[test]
    fn test_empty_build_disables_step() {
        let config: BrcConfig = toml::from_str("[languages.go]\nbuild = []\nrun = [\"go\", \"run\", \"{sources}\"]\n").unwrap();
        assert!(config.languages.toolchain(Language::Go).build.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config: BrcConfig = toml::from_str("[runner]\ntimeout = \"0s\"\nbuild_timeout = \"0ms\"\n").unwrap();
        assert!(config.timeout().is_err());
        assert!(config.build_timeout().is_err());

        let config: BrcConfig = toml::from_str("[runner]\ntimeout = \"1ns\"\n").unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_nanos(1));
    }

    #[test]
    fn test_load_rejects_bad_tolerances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let cases = [
            "[validation]\nmin_max_tolerance = -0.1\n",
            "[validation]\nmean_tolerance = nan\n",
            "[validation]\nmean_tolerance = inf\n",
            "[validation]\nsanity_min = 50.0\nsanity_max = -50.0\n",
        ];
        for case in cases {
            std::fs::write(&path, case).unwrap();
            assert!(BrcConfig::load(&path).is_err(), "accepted {case:?}");
        }

        std::fs::write(&path, "[validation]\nmin_max_tolerance = 0.0\nmean_tolerance = 0.05\n").unwrap();
        let config = BrcConfig::load(&path).unwrap();
        assert_eq!(config.validation.tolerances().mean, 0.05);
        assert!(BrcConfig::default().validation.validate().is_ok());
    }

    #[test]
    fn test_default_toml_parses() {
        let config: BrcConfig = toml::from_str(&BrcConfig::default_toml()).unwrap();
        assert_eq!(config.runner.timeout, "300s");
        assert_eq!(config.build_timeout().unwrap(), Duration::from_secs(60));
        assert!(config.candidates.is_empty());
    }
}
