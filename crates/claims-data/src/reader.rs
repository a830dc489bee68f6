//! Claim record loading.
//!
//! Reads claim rows from JSON documents (an array of objects, or an object
//! wrapping one under `data`, `records` or `rows`) and from JSONL files with
//! one object per line. A directory is scanned recursively for both.

use std::path::{Path, PathBuf};

use claims_core::error::{ClaimsError, Result};
use claims_core::models::ClaimRecord;
use serde_json::Value;
use tracing::{debug, warn};

/// Keys under which an envelope object may carry the record array.
const ENVELOPE_KEYS: &[&str] = &["data", "records", "rows"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` / `.jsonl` files under `data_path`, sorted by path.
///
/// A path naming a single file is returned as-is, whatever its extension.
pub fn find_data_files(data_path: &Path) -> Result<Vec<PathBuf>> {
    if !data_path.exists() {
        return Err(ClaimsError::DataPathNotFound(data_path.to_path_buf()));
    }
    if data_path.is_file() {
        return Ok(vec![data_path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_data_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        return Err(ClaimsError::NoDataFiles(data_path.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Load every claim record found at `data_path`, in file then row order.
pub fn load_claim_records(data_path: &Path) -> Result<Vec<ClaimRecord>> {
    let files = find_data_files(data_path)?;
    let mut records = Vec::new();

    for file in &files {
        let loaded = load_file(file)?;
        debug!("Loaded {} records from {}", loaded.len(), file.display());
        records.extend(loaded);
    }

    debug!(
        "Loaded {} records from {} files",
        records.len(),
        files.len()
    );
    Ok(records)
}

/// Validate an in-memory JSON payload as a sequence of claim records.
///
/// Anything other than an array of objects (optionally wrapped in an
/// envelope object) is rejected: a payload that is not a record set at all
/// is a hard failure, unlike field-level problems inside a record.
pub fn records_from_value(value: Value) -> Result<Vec<ClaimRecord>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(ClaimRecord::new(map)),
                other => Err(ClaimsError::InvalidDataset(format!(
                    "element {} is {}, expected an object",
                    index,
                    json_type_name(&other)
                ))),
            })
            .collect(),
        Value::Object(mut map) => {
            for key in ENVELOPE_KEYS {
                if let Some(inner @ Value::Array(_)) = map.remove(*key) {
                    return records_from_value(inner);
                }
            }
            Err(ClaimsError::InvalidDataset(
                "object has no data, records or rows array".to_string(),
            ))
        }
        other => Err(ClaimsError::InvalidDataset(format!(
            "top-level value is {}, expected an array",
            json_type_name(&other)
        ))),
    }
}

/// Parse JSONL text, one object per line.
///
/// Blank lines, malformed lines and non-object lines are skipped.
pub fn records_from_jsonl(content: &str, source: &Path) -> Vec<ClaimRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => records.push(ClaimRecord::new(map)),
            Ok(other) => {
                skipped += 1;
                debug!(
                    "Skipping line {} in {}: {} is not a record",
                    line_no + 1,
                    source.display(),
                    json_type_name(&other)
                );
            }
            Err(e) => {
                skipped += 1;
                debug!(
                    "Failed to parse JSON line {} in {}: {}",
                    line_no + 1,
                    source.display(),
                    e
                );
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unreadable lines in {}", skipped, source.display());
    }
    records
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn load_file(path: &Path) -> Result<Vec<ClaimRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| ClaimsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    if has_extension(path, "jsonl") {
        return Ok(records_from_jsonl(&content, path));
    }

    let value: Value = serde_json::from_str(&content)?;
    records_from_value(value)
}

fn is_data_file(path: &Path) -> bool {
    has_extension(path, "json") || has_extension(path, "jsonl")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
