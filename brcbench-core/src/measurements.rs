//! Measurement Source
//!
//! Streams a `STATION=TEMPERATURE` file into an in-memory grouping of
//! station → readings. Lines that fail the input grammar are skipped and
//! counted; only the first [`MAX_RECORDED_WARNINGS`] are kept verbatim so a
//! badly broken billion-row file cannot exhaust memory with diagnostics.

use crate::LoadError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Upper bound on warnings kept in a [`LoadSummary`]
pub const MAX_RECORDED_WARNINGS: usize = 100;

/// A skipped input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadWarning {
    /// 1-based line number
    pub line: usize,
    /// Why the line was skipped
    pub message: String,
}

/// Bookkeeping from a load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    /// Physical lines read, including blank ones
    pub lines_read: usize,
    /// Readings accepted into the group
    pub readings: usize,
    /// Lines skipped because they failed the grammar
    pub skipped: usize,
    /// First skipped lines, in file order
    pub warnings: Vec<LoadWarning>,
}

impl LoadSummary {
    fn skip(&mut self, line: usize, message: String) {
        self.skipped += 1;
        if self.warnings.len() < MAX_RECORDED_WARNINGS {
            self.warnings.push(LoadWarning { line, message });
        }
    }
}

/// Why a single input line was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingError {
    /// No `=` separator
    MissingSeparator,
    /// Empty station name
    EmptyStation,
    /// Temperature is not a decimal with at most one fractional digit
    InvalidTemperature(String),
}

impl std::fmt::Display for ReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingError::MissingSeparator => write!(f, "missing '=' separator"),
            ReadingError::EmptyStation => write!(f, "empty station name"),
            ReadingError::InvalidTemperature(t) => write!(f, "invalid temperature {t:?}"),
        }
    }
}

/// Parse one `STATION=TEMPERATURE` line (already trimmed).
///
/// The station is everything before the first `=`; the temperature must be an
/// optionally signed decimal with a mandatory integer part and at most one
/// fractional digit.
pub fn parse_reading(line: &str) -> Result<(&str, f64), ReadingError> {
    let (station, temperature) = line
        .split_once('=')
        .ok_or(ReadingError::MissingSeparator)?;
    if station.is_empty() {
        return Err(ReadingError::EmptyStation);
    }
    if !is_temperature(temperature) {
        return Err(ReadingError::InvalidTemperature(temperature.to_string()));
    }
    temperature
        .parse::<f64>()
        .map(|value| (station, value))
        .map_err(|_| ReadingError::InvalidTemperature(temperature.to_string()))
}

fn is_temperature(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        None => true,
        Some(f) => f.len() == 1 && f.as_bytes()[0].is_ascii_digit(),
    }
}

/// Check that `path` exists and its first line has the `KEY=VALUE` shape.
///
/// This is the cheap precondition the orchestrator runs before any candidate
/// work; it does not read past the first line.
pub fn check_input_precondition(path: &Path) -> Result<(), LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingInput(path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut first = Vec::new();
    if reader.read_until(b'\n', &mut first)? == 0 {
        return Err(LoadError::EmptyInput(path.to_path_buf()));
    }

    let line = String::from_utf8_lossy(&first).trim().to_string();
    let well_formed = line
        .split_once('=')
        .is_some_and(|(key, value)| !key.is_empty() && !value.is_empty());
    if well_formed {
        Ok(())
    } else {
        Err(LoadError::MalformedFirstLine {
            path: path.to_path_buf(),
            line,
        })
    }
}

/// Station → readings, in station order
#[derive(Debug, Clone, Default)]
pub struct MeasurementGroup {
    stations: BTreeMap<String, Vec<f64>>,
    summary: LoadSummary,
}

impl MeasurementGroup {
    /// Load a measurement file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoadError::MissingInput(path.to_path_buf()));
        }
        let group = Self::from_reader(BufReader::with_capacity(1 << 20, File::open(path)?))?;
        tracing::debug!(
            path = %path.display(),
            stations = group.len(),
            readings = group.summary.readings,
            skipped = group.summary.skipped,
            "loaded measurements"
        );
        Ok(group)
    }

    /// Load from any buffered reader
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, LoadError> {
        let mut group = Self::default();
        let mut buf = Vec::with_capacity(128);
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            group.summary.lines_read += 1;

            let Ok(text) = std::str::from_utf8(&buf) else {
                group.summary.skip(line_no, "line is not valid UTF-8".to_string());
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            match parse_reading(text) {
                Ok((station, value)) => group.push(station, value),
                Err(e) => group.summary.skip(line_no, format!("{e}: {text}")),
            }
        }

        Ok(group)
    }

    /// Build a group directly from `(station, reading)` pairs
    pub fn from_readings<K, I>(readings: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let mut group = Self::default();
        for (station, value) in readings {
            group.summary.lines_read += 1;
            group.push(station.as_ref(), value);
        }
        group
    }

    fn push(&mut self, station: &str, value: f64) {
        // Lookup first so the common case does not allocate a key
        match self.stations.get_mut(station) {
            Some(readings) => readings.push(value),
            None => {
                self.stations.insert(station.to_string(), vec![value]);
            }
        }
        self.summary.readings += 1;
    }

    /// Readings for one station
    pub fn get(&self, station: &str) -> Option<&[f64]> {
        self.stations.get(station).map(Vec::as_slice)
    }

    /// Whether the station occurs in the input
    pub fn contains(&self, station: &str) -> bool {
        self.stations.contains_key(station)
    }

    /// Iterate stations in ascending byte order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.stations
            .iter()
            .map(|(station, readings)| (station.as_str(), readings.as_slice()))
    }

    /// Station names in ascending byte order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }

    /// Number of distinct stations
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether no reading was accepted
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Load bookkeeping
    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading("Paris=10.0"), Ok(("Paris", 10.0)));
        assert_eq!(parse_reading("Addis Ababa=-3.5"), Ok(("Addis Ababa", -3.5)));
        assert_eq!(parse_reading("Oslo=7"), Ok(("Oslo", 7.0)));
        assert_eq!(parse_reading("Oslo"), Err(ReadingError::MissingSeparator));
        assert_eq!(parse_reading("=1.0"), Err(ReadingError::EmptyStation));
        assert!(matches!(
            parse_reading("Oslo=1.25"),
            Err(ReadingError::InvalidTemperature(_))
        ));
        assert!(matches!(
            parse_reading("Oslo=.5"),
            Err(ReadingError::InvalidTemperature(_))
        ));
        assert!(matches!(
            parse_reading("Oslo=abc"),
            Err(ReadingError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn test_load_groups_readings() {
        let input = "Paris=10.0\nParis=20.0\nTokyo=5.0\n";
        let group = MeasurementGroup::from_reader(Cursor::new(input)).unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(group.get("Paris"), Some(&[10.0, 20.0][..]));
        assert_eq!(group.get("Tokyo"), Some(&[5.0][..]));
        assert_eq!(group.summary().readings, 3);
        assert_eq!(group.summary().skipped, 0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let input = "Paris=10.0\ngarbage\n\nParis=1.55\r\nTokyo=5.0\r\n";
        let group = MeasurementGroup::from_reader(Cursor::new(input)).unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(group.summary().lines_read, 5);
        assert_eq!(group.summary().skipped, 2);
        assert_eq!(group.summary().warnings[0].line, 2);
        assert_eq!(group.summary().warnings[1].line, 4);
    }

    #[test]
    fn test_warning_cap() {
        let input = "bad\n".repeat(MAX_RECORDED_WARNINGS + 10);
        let group = MeasurementGroup::from_reader(Cursor::new(input)).unwrap();

        assert!(group.is_empty());
        assert_eq!(group.summary().skipped, MAX_RECORDED_WARNINGS + 10);
        assert_eq!(group.summary().warnings.len(), MAX_RECORDED_WARNINGS);
    }

    #[test]
    fn test_keys_are_byte_ordered() {
        let group = MeasurementGroup::from_readings([("b", 1.0), ("B", 1.0), ("a", 1.0)]);
        let keys: Vec<_> = group.keys().collect();
        assert_eq!(keys, vec!["B", "a", "b"]);
    }

    #[test]
    fn test_precondition() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            check_input_precondition(&missing),
            Err(LoadError::MissingInput(_))
        ));

        let empty = dir.path().join("empty.txt");
        File::create(&empty).unwrap();
        assert!(matches!(
            check_input_precondition(&empty),
            Err(LoadError::EmptyInput(_))
        ));

        let bad = dir.path().join("bad.txt");
        writeln!(File::create(&bad).unwrap(), "no separator here").unwrap();
        assert!(matches!(
            check_input_precondition(&bad),
            Err(LoadError::MalformedFirstLine { .. })
        ));

        let good = dir.path().join("good.txt");
        writeln!(File::create(&good).unwrap(), "Paris=10.0").unwrap();
        assert!(check_input_precondition(&good).is_ok());
    }
}
