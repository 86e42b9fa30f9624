//! CSV ingest for I-V measurements.
//!
//! Loads a two-column (or wider) CSV into an `IvTable` and extracts a
//! `MeasurementSeries` from it:
//! - **Column resolution**: explicit names first, then well-known header
//!   names, then the first two columns
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: rows keep their file order

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::MeasurementSeries;
use crate::error::AppError;

const VOLTAGE_ALIASES: [&str; 2] = ["v", "voltage"];
const CURRENT_ALIASES: [&str; 4] = ["j", "i", "current", "current_density"];

/// Caller overrides for which columns hold voltage and current.
#[derive(Debug, Clone, Default)]
pub struct ColumnSelection {
    pub voltage: Option<String>,
    pub current: Option<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the usable samples plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: MeasurementSeries,
    pub voltage_column: String,
    pub current_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// A loaded CSV: every column of every row, untyped.
///
/// Extra columns are kept; `series` picks the voltage/current pair.
#[derive(Debug, Clone)]
pub struct IvTable {
    pub headers: StringRecord,
    /// `(line, record)` for each row that the CSV reader could split.
    pub rows: Vec<(usize, StringRecord)>,
    /// Rows the CSV reader itself rejected.
    pub read_errors: Vec<RowError>,
}

impl IvTable {
    pub fn rows_read(&self) -> usize {
        self.rows.len() + self.read_errors.len()
    }

    /// Extract the numeric voltage/current pair.
    pub fn series(&self, columns: &ColumnSelection) -> Result<IngestedSeries, AppError> {
        let (v_idx, j_idx) = resolve_columns(&self.headers, columns)?;

        let mut voltage = Vec::with_capacity(self.rows.len());
        let mut current = Vec::with_capacity(self.rows.len());
        let mut row_errors = self.read_errors.clone();

        for (line, record) in &self.rows {
            let parsed = parse_field(record, v_idx, "voltage")
                .and_then(|v| parse_field(record, j_idx, "current").map(|j| (v, j)));
            match parsed {
                Ok((v, j)) => {
                    voltage.push(v);
                    current.push(j);
                }
                Err(message) => row_errors.push(RowError { line: *line, message }),
            }
        }
        row_errors.sort_by_key(|e| e.line);

        if voltage.is_empty() {
            return Err(AppError::new(3, "No valid rows found in CSV."));
        }

        let rows_read = self.rows_read();
        if !row_errors.is_empty() {
            log::warn!("ingest: skipped {} of {rows_read} rows", row_errors.len());
        }

        Ok(IngestedSeries {
            series: MeasurementSeries::new(voltage, current),
            voltage_column: header_label(&self.headers, v_idx),
            current_column: header_label(&self.headers, j_idx),
            row_errors,
            rows_read,
        })
    }
}

/// Load a CSV file into an `IvTable`.
pub fn load_iv_csv(path: &Path) -> Result<IvTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_iv_csv(file)
}

/// Read an `IvTable` from any CSV source.
pub fn read_iv_csv<R: Read>(source: R) -> Result<IvTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let mut rows = Vec::new();
    let mut read_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        match result {
            Ok(record) => rows.push((line, record)),
            Err(e) => read_errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    Ok(IvTable {
        headers,
        rows,
        read_errors,
    })
}

/// Load a CSV file and extract its measurement series in one step.
pub fn load_measurements(path: &Path, columns: &ColumnSelection) -> Result<IngestedSeries, AppError> {
    load_iv_csv(path)?.series(columns)
}

fn resolve_columns(headers: &StringRecord, columns: &ColumnSelection) -> Result<(usize, usize), AppError> {
    let header_map = build_header_map(headers);

    let explicit = |name: &Option<String>| -> Result<Option<usize>, AppError> {
        match name {
            Some(n) => header_map
                .get(&normalize_header_name(n))
                .copied()
                .map(Some)
                .ok_or_else(|| AppError::new(2, format!("Missing requested column: `{n}`"))),
            None => Ok(None),
        }
    };
    let by_alias = |aliases: &[&str]| aliases.iter().find_map(|a| header_map.get(*a).copied());

    let v_idx = explicit(&columns.voltage)?.or_else(|| by_alias(&VOLTAGE_ALIASES[..]));
    let j_idx = explicit(&columns.current)?.or_else(|| by_alias(&CURRENT_ALIASES[..]));

    // Fall back to positional columns, skipping whichever one is already taken.
    let first_free = |taken: Option<usize>| (0..headers.len()).find(|i| Some(*i) != taken);
    let v_idx = match v_idx {
        Some(i) => i,
        None => first_free(j_idx)
            .ok_or_else(|| AppError::new(2, "CSV needs at least two columns (voltage, current)."))?,
    };
    let j_idx = match j_idx {
        Some(i) => i,
        None => first_free(Some(v_idx))
            .ok_or_else(|| AppError::new(2, "CSV needs at least two columns (voltage, current)."))?,
    };

    if v_idx == j_idx {
        return Err(AppError::new(
            2,
            "Voltage and current resolve to the same column; use `--v-col` / `--j-col`.",
        ));
    }

    Ok((v_idx, j_idx))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    // First occurrence wins for duplicated header names.
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn header_label(headers: &StringRecord, idx: usize) -> String {
    headers
        .get(idx)
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .unwrap_or_default()
}

fn parse_field(record: &StringRecord, idx: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing {what} value."))?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid {what} value '{raw}'."))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Non-finite {what} value '{raw}'."))
    }
}
