//! JSON Output

use crate::report::{Report, ValidationDocument};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a prettified JSON benchmark report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Generate a prettified JSON validation report.
pub fn generate_validation_json(doc: &ValidationDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Serialize `value` as pretty JSON into `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
