//! JSON Lines → CSV export with spreadsheet formula-injection escaping.
//!
//! Spreadsheet applications evaluate a cell that starts with `=`, `+`, `-`
//! or `@` as a formula (and tab / CR can smuggle one in after leading
//! whitespace). Every header and every string cell is passed through
//! [`sanitize_csv_field`], which prefixes such values with `'`.
//!
//! Input lines that are blank, not valid JSON, or valid JSON but not an
//! object are skipped and counted; they never stop the export.

use crate::error::ExportError;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::debug;

/// Fields exported when none are requested.
pub const DEFAULT_FIELDS: &str = "ts,input,output,status,reason";

const FORMULA_TRIGGERS: &[char] = &['=', '+', '-', '@', '\t', '\r'];

/// Counts from one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Data rows written (header excluded).
    pub rows: usize,
    /// Non-blank input lines skipped as malformed or non-object.
    pub skipped: usize,
}

/// Split a comma-separated field list, trimming and dropping empty names.
pub fn parse_fields(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prefix `value` with `'` if a spreadsheet would read it as a formula.
///
/// The check is made on the left-trimmed value, except that a leading tab
/// or CR counts as a trigger itself. A value already starting with `'`
/// (after left-trim) is returned unchanged.
pub fn sanitize_csv_field(value: &str) -> Cow<'_, str> {
    let Some(first) = value.chars().next() else {
        return Cow::Borrowed(value);
    };
    if first == '\t' || first == '\r' {
        return Cow::Owned(format!("'{value}"));
    }
    match value.trim_start().chars().next() {
        Some(c) if FORMULA_TRIGGERS.contains(&c) => Cow::Owned(format!("'{value}")),
        _ => Cow::Borrowed(value),
    }
}

/// Sanitize each header and suffix duplicates with `_1`, `_2`, …
///
/// The result has exactly one entry per requested field, in order.
pub fn unique_headers(fields: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(fields.len());
    fields
        .iter()
        .map(|field| {
            let base = sanitize_csv_field(field).into_owned();
            let mut candidate = base.clone();
            let mut n = 1usize;
            while used.contains(&candidate) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Render one JSON value as a CSV cell.
///
/// `null` and missing values are empty. Strings are sanitized; numbers and
/// booleans use their JSON text (a negative number is data, not a formula);
/// arrays and objects become compact JSON, then sanitized.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => sanitize_csv_field(s).into_owned(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => sanitize_csv_field(&other.to_string()).into_owned(),
    }
}

/// Export JSON Lines from `reader` to CSV on `writer`.
pub fn export_records<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    fields: &[String],
) -> Result<ExportStats, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(unique_headers(fields))?;

    let mut stats = ExportStats::default();
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                stats.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                stats.skipped += 1;
                continue;
            }
        };
        wtr.write_record(fields.iter().map(|f| render_value(record.get(f))))?;
        stats.rows += 1;
    }

    wtr.flush()?;
    debug!("Exported {} row(s), skipped {}", stats.rows, stats.skipped);
    Ok(stats)
}

/// Export the JSON Lines file at `input` to a CSV file at `output`.
pub fn export_file(input: &Path, output: &Path, fields: &[String]) -> Result<ExportStats, ExportError> {
    let reader = File::open(input).map(BufReader::new).map_err(|e| ExportError::Input {
        path: input.to_path_buf(),
        source: e,
    })?;
    let writer = File::create(output).map(BufWriter::new).map_err(|e| ExportError::Output {
        path: output.to_path_buf(),
        source: e,
    })?;
    export_records(reader, writer, fields)
}
