//! CSV import of sample tables.
//!
//! Turns a two-column `flow_rate,pressure` CSV into editable session rows.
//!
//! Design goals:
//! - **Tolerant headers** (common aliases, case-insensitive, BOM stripped)
//! - **Row-level coercion** (unparseable cells become missing, and are reported)
//! - **No fitting logic here**: incomplete rows are kept and dropped later by the session

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::ErrorKind;
use crate::session::{SampleRow, parse_cell};

const FLOW_HEADERS: &[&str] = &["flow_rate", "flow rate", "flowrate", "flow", "flow rate (m³/s)", "q"];
const PRESSURE_HEADERS: &[&str] = &["pressure", "pressure (pa)", "static_pressure", "static pressure", "p"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to open CSV '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read CSV headers: {0}")]
    Headers(#[from] csv::Error),

    #[error("CSV has no {column} column (accepted headers: {accepted}).")]
    MissingColumn { column: &'static str, accepted: String },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Open { .. } => ErrorKind::PreconditionViolation,
            IngestError::Headers(_) | IngestError::MissingColumn { .. } => ErrorKind::ValidationWarning,
        }
    }
}

/// A row-level problem encountered during import.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ImportedSamples {
    pub rows: Vec<SampleRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl ImportedSamples {
    /// Rows with both cells present.
    pub fn complete_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.sample().is_some()).count()
    }
}

pub fn read_samples_csv(path: &Path) -> Result<ImportedSamples, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_samples_csv(file)
}

pub fn parse_samples_csv<R: Read>(input: R) -> Result<ImportedSamples, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);
    let flow_col = find_column(&header_map, "flow rate", FLOW_HEADERS)?;
    let pressure_col = find_column(&header_map, "pressure", PRESSURE_HEADERS)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Records start on line 2, after the header.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let flow_text = record.get(flow_col).unwrap_or("");
        let pressure_text = record.get(pressure_col).unwrap_or("");
        if flow_text.is_empty() && pressure_text.is_empty() {
            continue;
        }

        let row = SampleRow {
            flow_rate: coerce(flow_text, "flow_rate", line, &mut row_errors),
            pressure: coerce(pressure_text, "pressure", line, &mut row_errors),
        };
        rows.push(row);
    }

    Ok(ImportedSamples {
        rows,
        row_errors,
        rows_read,
    })
}

fn coerce(text: &str, column: &str, line: usize, errors: &mut Vec<RowError>) -> Option<f64> {
    let value = parse_cell(text);
    if value.is_none() {
        let message = if text.is_empty() {
            format!("missing {column}")
        } else {
            format!("{column} '{text}' is not a finite number")
        };
        errors.push(RowError { line, message });
    }
    value
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn find_column(
    header_map: &HashMap<String, usize>,
    column: &'static str,
    aliases: &[&str],
) -> Result<usize, IngestError> {
    aliases
        .iter()
        .find_map(|a| header_map.get(*a).copied())
        .ok_or_else(|| IngestError::MissingColumn {
            column,
            accepted: aliases.join(", "),
        })
}
