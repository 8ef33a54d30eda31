//! Output Grammar Parser
//!
//! Two surface forms map onto one [`StationAggregate`] representation:
//!
//! ```text
//! Lines (canonical)            Map (legacy)
//! ──────────────────           ─────────────────────────────────
//! Abha=-1.2/18.0/41.9          {Abha=-1.2/18.0/41.9, Oslo=...}
//! Oslo=-20.3/5.9/29.0
//! ```
//!
//! The form is sniffed from a leading `{`. Every rule is checked for every
//! line so one pass reports all problems; ordering is enforced only for the
//! line form.

use brcbench_core::StationAggregate;
use fxhash::FxHashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Longest slice of offending text quoted in a diagnostic
const MAX_QUOTED_LEN: usize = 120;

/// Keys shown when an ordering summary lists the actual/expected sequences
const ORDER_PREVIEW_LEN: usize = 10;

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        const NUM: &str = r"([-+]?[0-9]+(?:\.[0-9]+)?)";
        Regex::new(&format!(r"^([^=]+)={NUM}/{NUM}/{NUM}$")).expect("entry grammar is valid")
    })
}

/// Which output grammar a text uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceForm {
    /// One `KEY=MIN/MEAN/MAX` per line, ascending keys
    Lines,
    /// `{KEY=MIN/MEAN/MAX, ...}`, order not significant
    Map,
}

impl SurfaceForm {
    fn unit(self) -> &'static str {
        match self {
            SurfaceForm::Lines => "line",
            SurfaceForm::Map => "entry",
        }
    }
}

/// A positioned finding
///
/// `position` is the 1-based line (line form) or entry (map form); 0 means
/// the finding concerns the output as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line or entry number, 0 for whole-output findings
    pub position: usize,
    /// Description of the problem
    pub message: String,
}

impl Diagnostic {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Parser tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrammarConfig {
    /// Lower bound of the plausibility band; values below only warn
    pub sanity_min: f64,
    /// Upper bound of the plausibility band; values above only warn
    pub sanity_max: f64,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            sanity_min: -100.0,
            sanity_max: 100.0,
        }
    }
}

/// Result of parsing a candidate's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutput {
    /// Surface form detected
    pub form: SurfaceForm,
    /// Accepted aggregates, in output order, keys distinct
    pub aggregates: Vec<StationAggregate>,
    /// Hard failures
    pub errors: Vec<Diagnostic>,
    /// Findings that never affect validity
    pub warnings: Vec<Diagnostic>,
}

impl ParsedOutput {
    /// No grammar errors were found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Aggregate for one key
    pub fn get(&self, key: &str) -> Option<&StationAggregate> {
        self.aggregates.iter().find(|a| a.key == key)
    }

    /// Keys in output order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.aggregates.iter().map(|a| a.key.as_str())
    }

    /// Errors rendered as `line N: message`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|d| self.render(d)).collect()
    }

    /// Warnings rendered as `line N: message`
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|d| self.render(d)).collect()
    }

    fn render(&self, d: &Diagnostic) -> String {
        if d.position == 0 {
            d.message.clone()
        } else {
            format!("{} {}: {}", self.form.unit(), d.position, d.message)
        }
    }
}

/// Parse with the default [`GrammarConfig`]
pub fn parse_output(text: &str) -> ParsedOutput {
    OutputParser::default().parse(text)
}

/// Output grammar parser
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser {
    config: GrammarConfig,
}

/// Raw numeric fields of one entry, kept for fractional-digit warnings
struct RawEntry<'a> {
    key: &'a str,
    fields: [(&'static str, &'a str, f64); 3],
}

impl OutputParser {
    /// Create a parser
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    /// Parse `text`, sniffing the surface form from a leading `{`
    pub fn parse(&self, text: &str) -> ParsedOutput {
        let trimmed = text.trim();
        let form = if trimmed.starts_with('{') {
            SurfaceForm::Map
        } else {
            SurfaceForm::Lines
        };

        let mut out = ParsedOutput {
            form,
            aggregates: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        if trimmed.is_empty() {
            out.errors.push(Diagnostic::new(0, "empty output"));
            return out;
        }

        let entries: Vec<(usize, &str)> = match form {
            SurfaceForm::Lines => trimmed
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .enumerate()
                .map(|(i, line)| (i + 1, line))
                .collect(),
            SurfaceForm::Map => {
                let inner = trimmed.strip_prefix('{').unwrap_or(trimmed);
                let inner = match inner.strip_suffix('}') {
                    Some(inner) => inner,
                    None => {
                        out.errors
                            .push(Diagnostic::new(0, "map output must end with '}'"));
                        inner
                    }
                };
                if inner.trim().is_empty() {
                    out.errors.push(Diagnostic::new(0, "empty output"));
                    return out;
                }
                inner
                    .split(", ")
                    .enumerate()
                    .map(|(i, entry)| (i + 1, entry))
                    .collect()
            }
        };

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        // Every distinct well-formed key, including relation-rejected ones
        let mut sequence: Vec<(usize, &str)> = Vec::with_capacity(entries.len());

        for (position, entry) in entries {
            if entry.trim().is_empty() {
                out.errors.push(Diagnostic::new(
                    position,
                    format!("empty {} not allowed", form.unit()),
                ));
                continue;
            }

            let Some(raw) = Self::match_entry(entry) else {
                out.errors.push(Diagnostic::new(
                    position,
                    format!(
                        "invalid format {:?}, expected STATION=MIN/MEAN/MAX",
                        quote(entry)
                    ),
                ));
                continue;
            };

            let [(_, _, min), (_, _, mean), (_, _, max)] = raw.fields;
            let mut ordered = true;
            for (holds, relation, lhs, rhs) in [
                (min <= mean, "min > mean", min, mean),
                (mean <= max, "mean > max", mean, max),
                (min <= max, "min > max", min, max),
            ] {
                if !holds {
                    ordered = false;
                    out.errors.push(Diagnostic::new(
                        position,
                        format!("station {:?}: {relation} ({lhs} > {rhs})", raw.key),
                    ));
                }
            }

            if !seen.insert(raw.key) {
                out.errors.push(Diagnostic::new(
                    position,
                    format!("duplicate key {:?}", raw.key),
                ));
                continue;
            }
            sequence.push((position, raw.key));
            if !ordered {
                continue;
            }

            self.push_warnings(&mut out.warnings, position, &raw);
            out.aggregates
                .push(StationAggregate::new(raw.key, min, mean, max));
        }

        if form == SurfaceForm::Lines {
            check_order(&sequence, &mut out.errors);
        }

        out
    }

    fn match_entry(entry: &str) -> Option<RawEntry<'_>> {
        let caps = entry_regex().captures(entry)?;
        let key = caps.get(1)?.as_str();
        let mut fields = [("min", "", 0.0), ("mean", "", 0.0), ("max", "", 0.0)];
        for (slot, group) in fields.iter_mut().zip(2..=4) {
            let raw = caps.get(group)?.as_str();
            *slot = (slot.0, raw, raw.parse().ok()?);
        }
        Some(RawEntry { key, fields })
    }

    fn push_warnings(&self, warnings: &mut Vec<Diagnostic>, position: usize, raw: &RawEntry<'_>) {
        let GrammarConfig {
            sanity_min,
            sanity_max,
        } = self.config;

        for (name, text, value) in raw.fields {
            if !(sanity_min..=sanity_max).contains(&value) {
                warnings.push(Diagnostic::new(
                    position,
                    format!(
                        "station {:?}: {name} {value} outside plausible range [{sanity_min}, {sanity_max}]",
                        raw.key
                    ),
                ));
            }
            let digits = text.split_once('.').map_or(0, |(_, frac)| frac.len());
            if digits > 1 {
                warnings.push(Diagnostic::new(
                    position,
                    format!(
                        "station {:?}: {name} {text} has {digits} fractional digits, expected 1",
                        raw.key
                    ),
                ));
            }
        }
    }
}

/// Flag every key that follows a greater one, then summarize the sequence
fn check_order(sequence: &[(usize, &str)], errors: &mut Vec<Diagnostic>) {
    let mut greatest: Option<&str> = None;
    let mut out_of_order = false;

    for &(position, key) in sequence {
        match greatest {
            Some(prev) if key < prev => {
                out_of_order = true;
                errors.push(Diagnostic::new(
                    position,
                    format!("key {key:?} is out of order: it appears after {prev:?}"),
                ));
            }
            _ => greatest = Some(key),
        }
    }

    if out_of_order {
        let actual: Vec<&str> = sequence.iter().map(|&(_, key)| key).collect();
        let mut expected = actual.clone();
        expected.sort_unstable();
        errors.push(Diagnostic::new(
            0,
            format!(
                "stations are not in ascending order. Got: {}, Expected: {}",
                preview(&actual),
                preview(&expected)
            ),
        ));
    }
}

fn preview(keys: &[&str]) -> String {
    let mut s = String::from("[");
    for (i, key) in keys.iter().take(ORDER_PREVIEW_LEN).enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        s.push_str(key);
    }
    if keys.len() > ORDER_PREVIEW_LEN {
        let _ = write!(s, ", ... {} more", keys.len() - ORDER_PREVIEW_LEN);
    }
    s.push(']');
    s
}

fn quote(text: &str) -> &str {
    if text.len() <= MAX_QUOTED_LEN {
        return text;
    }
    let mut end = MAX_QUOTED_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Render aggregates in the canonical line form, one fractional digit
pub fn format_lines(aggregates: &[StationAggregate]) -> String {
    let mut out = String::new();
    for a in aggregates {
        let _ = writeln!(out, "{}={:.1}/{:.1}/{:.1}", a.key, a.min, a.mean, a.max);
    }
    out
}

/// Render aggregates in the legacy map form
pub fn format_map(aggregates: &[StationAggregate]) -> String {
    let entries: Vec<String> = aggregates
        .iter()
        .map(|a| format!("{}={:.1}/{:.1}/{:.1}", a.key, a.min, a.mean, a.max))
        .collect();
    format!("{{{}}}", entries.join(", "))
}
