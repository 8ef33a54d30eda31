//! Language Toolchains
//!
//! Each supported language maps to a `{build, run}` pair of argv templates.
//! Templates are expanded once per candidate with these placeholders:
//!
//! | Placeholder | Expands to                                   |
//! |-------------|----------------------------------------------|
//! | `{dir}`     | candidate directory                          |
//! | `{sources}` | every source file (one argv entry per file)  |
//! | `{input}`   | measurement file path                        |
//! | `{id}`      | candidate id                                 |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported solution languages
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Cpp,
    Go,
    Rust,
}

impl Language {
    /// All languages, in discovery order
    pub const ALL: [Language; 5] = [
        Language::Java,
        Language::Python,
        Language::Cpp,
        Language::Go,
        Language::Rust,
    ];

    /// Lowercase tag, also the default submission subdirectory
    pub fn tag(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Built-in toolchain commands
    pub fn default_toolchain(self) -> Toolchain {
        fn argv(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }

        match self {
            Language::Java => Toolchain {
                extension: "java".to_string(),
                build: Some(argv(&["javac", "-d", "{dir}", "{sources}"])),
                run: argv(&["java", "-Xmx8g", "-cp", "{dir}", "Solution"]),
            },
            Language::Python => Toolchain {
                extension: "py".to_string(),
                build: None,
                run: argv(&["python3", "{dir}/solution.py"]),
            },
            Language::Cpp => Toolchain {
                extension: "cpp".to_string(),
                build: Some(argv(&[
                    "g++",
                    "-std=c++20",
                    "-O2",
                    "-o",
                    "{dir}/solution",
                    "{sources}",
                ])),
                run: argv(&["{dir}/solution"]),
            },
            Language::Go => Toolchain {
                extension: "go".to_string(),
                build: Some(argv(&["go", "build", "-o", "{dir}/solution", "{sources}"])),
                run: argv(&["{dir}/solution"]),
            },
            Language::Rust => Toolchain {
                extension: "rs".to_string(),
                build: Some(argv(&[
                    "cargo",
                    "build",
                    "--release",
                    "--quiet",
                    "--manifest-path",
                    "{dir}/Cargo.toml",
                ])),
                run: argv(&["{dir}/target/release/solution"]),
            },
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown language: {}", s))
    }
}

/// Build and run templates for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Source file extension, without the dot
    pub extension: String,
    /// Build argv; `None` for interpreted languages
    pub build: Option<Vec<String>>,
    /// Run argv
    pub run: Vec<String>,
}

/// Values substituted into templates
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub dir: &'a Path,
    pub sources: &'a [PathBuf],
    pub input: &'a Path,
    pub id: &'a str,
}

/// Expand an argv template
///
/// An argument that is exactly `{sources}` becomes one argument per source
/// file; embedded inside a longer argument the sources are space-joined.
pub fn expand(template: &[String], vars: &TemplateVars<'_>) -> Vec<String> {
    let mut argv = Vec::with_capacity(template.len() + vars.sources.len());
    for arg in template {
        if arg == "{sources}" {
            argv.extend(vars.sources.iter().map(|s| s.display().to_string()));
            continue;
        }
        let sources = vars
            .sources
            .iter()
            .map(|s| s.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        argv.push(
            arg.replace("{dir}", &vars.dir.display().to_string())
                .replace("{input}", &vars.input.display().to_string())
                .replace("{id}", vars.id)
                .replace("{sources}", &sources),
        );
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(sources: &'a [PathBuf]) -> TemplateVars<'a> {
        TemplateVars {
            dir: Path::new("submissions/cpp"),
            sources,
            input: Path::new("data/m.txt"),
            id: "cpp",
        }
    }

    #[test]
    fn test_expand_sources_splice() {
        let sources = vec![
            PathBuf::from("submissions/cpp/a.cpp"),
            PathBuf::from("submissions/cpp/b.cpp"),
        ];
        let argv = expand(
            &Language::Cpp.default_toolchain().build.unwrap(),
            &vars(&sources),
        );
        assert_eq!(
            argv,
            vec![
                "g++",
                "-std=c++20",
                "-O2",
                "-o",
                "submissions/cpp/solution",
                "submissions/cpp/a.cpp",
                "submissions/cpp/b.cpp",
            ]
        );
    }

    #[test]
    fn test_expand_embedded_placeholders() {
        let sources = vec![PathBuf::from("x.cpp")];
        let template = vec!["--tag={id}:{input}".to_string(), "[{sources}]".to_string()];
        assert_eq!(
            expand(&template, &vars(&sources)),
            vec!["--tag=cpp:data/m.txt", "[x.cpp]"]
        );
    }

    #[test]
    fn test_language_tags() {
        for lang in Language::ALL {
            assert_eq!(lang.tag().parse::<Language>(), Ok(lang));
        }
        assert!("cobol".parse::<Language>().is_err());
        assert!(Language::Python.default_toolchain().build.is_none());
    }
}
