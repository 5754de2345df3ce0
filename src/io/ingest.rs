//! Dataset ingest from CSV or JSON.
//!
//! Both formats describe the same thing: named numeric columns, one of which is
//! the independent variable (`x` by default) and the rest entities.
//!
//! - **CSV**: header row of column names, one observation per row.
//! - **JSON**: an object `{ "x": [..], "plantA": [..] }`, keys in input order.
//!
//! Rows stay aligned across columns. A row whose `x` is blank or unparseable is
//! dropped from every column. A blank (CSV) or `null` (JSON) entity cell is
//! kept as a NaN placeholder, never imputed, so that entity fails with
//! `InvalidDataset` when it is analyzed. Unparseable cells are also recorded as
//! `RowError`s.
//!
//! No fitting logic here.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde_json::Value;

use crate::domain::Dataset;
use crate::error::{AppError, EXIT_DATASET, EXIT_INPUT};

/// A cell-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// 1-based line number (CSV) or 1-based array position (JSON).
    pub line: usize,
    pub column: Option<String>,
    pub message: String,
}

/// Ingest output: the dataset plus what was dropped on the way.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a dataset file, choosing the parser from the extension (`.json` or CSV).
pub fn load_dataset(path: &Path, x_key: &str) -> Result<IngestedData, AppError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read JSON '{}': {e}", path.display())))?;
        parse_json_dataset(&text, x_key)
    } else {
        let file = File::open(path)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;
        read_csv_dataset(file, x_key)
    }
}

/// Read a column-oriented CSV dataset.
pub fn read_csv_dataset<R: Read>(reader: R, x_key: &str) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let names = header_names(&headers);
    ensure_unique(&names)?;
    if !names.iter().any(|n| n == x_key) {
        return Err(AppError::new(
            EXIT_DATASET,
            format!("CSV is missing the x column '{x_key}'"),
        ));
    }

    let mut columns: Vec<(String, Vec<Option<f64>>)> = names.iter().map(|n| (n.clone(), Vec::new())).collect();
    let mut lines = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    column: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        // One entry per column for every record keeps the rows aligned.
        lines.push(line);
        for (col, (name, values)) in columns.iter_mut().enumerate() {
            let cell = record.get(col).unwrap_or("");
            if cell.is_empty() {
                values.push(None);
                continue;
            }
            let parsed = parse_cell(cell);
            if parsed.is_none() {
                row_errors.push(RowError {
                    line,
                    column: Some(name.clone()),
                    message: format!("not a number: '{cell}'"),
                });
            }
            values.push(parsed);
        }
    }

    let dataset = align_columns(columns, x_key, &lines, &mut row_errors)?;
    if !row_errors.is_empty() {
        tracing::warn!(count = row_errors.len(), "CSV cells skipped during ingest");
    }
    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
    })
}

/// Parse a JSON object of `key -> [numbers]`.
///
/// `null` entries are treated like blank CSV cells; other non-numbers are row errors.
pub fn parse_json_dataset(text: &str, x_key: &str) -> Result<IngestedData, AppError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to parse JSON dataset: {e}")))?;
    let object = root
        .as_object()
        .ok_or_else(|| AppError::new(EXIT_DATASET, "JSON dataset must be an object of key -> array"))?;

    let mut columns = Vec::with_capacity(object.len());
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (key, value) in object {
        let items = value
            .as_array()
            .ok_or_else(|| AppError::new(EXIT_DATASET, format!("JSON column '{key}' is not an array")))?;
        rows_read = rows_read.max(items.len());

        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let parsed = match item {
                Value::Null => None,
                Value::Number(n) => {
                    let v = n.as_f64().filter(|v| v.is_finite());
                    if v.is_none() {
                        row_errors.push(RowError {
                            line: i + 1,
                            column: Some(key.clone()),
                            message: format!("number out of range: {n}"),
                        });
                    }
                    v
                }
                other => {
                    row_errors.push(RowError {
                        line: i + 1,
                        column: Some(key.clone()),
                        message: format!("not a number: {other}"),
                    });
                    None
                }
            };
            values.push(parsed);
        }
        columns.push((key.clone(), values));
    }

    let lines: Vec<usize> = (1..=rows_read).collect();
    let dataset = align_columns(columns, x_key, &lines, &mut row_errors)?;
    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
    })
}

/// Build the dataset from row-aligned cells.
///
/// Rows without a usable `x` are dropped from every column and reported. Missing
/// entity cells become NaN so the entity is rejected at analysis time instead
/// of being shifted onto another row's `x`. A column shorter than `x` (JSON
/// only) stays shorter and is rejected the same way.
fn align_columns(
    columns: Vec<(String, Vec<Option<f64>>)>,
    x_key: &str,
    lines: &[usize],
    row_errors: &mut Vec<RowError>,
) -> Result<Dataset, AppError> {
    let x_cells = columns
        .iter()
        .find(|(name, _)| name == x_key)
        .map(|(_, cells)| cells.clone())
        .unwrap_or_default();

    let mut keep = Vec::with_capacity(x_cells.len());
    for (row, cell) in x_cells.iter().enumerate() {
        if cell.is_some() {
            keep.push(row);
        } else {
            row_errors.push(RowError {
                line: lines.get(row).copied().unwrap_or(row + 1),
                column: Some(x_key.to_string()),
                message: format!("missing '{x_key}' value; row dropped"),
            });
        }
    }

    let aligned = columns
        .into_iter()
        .map(|(name, cells)| {
            let values = keep
                .iter()
                .map_while(|&row| cells.get(row).map(|c| c.unwrap_or(f64::NAN)))
                .collect();
            (name, values)
        })
        .collect();
    Ok(Dataset::from_columns(aligned, x_key)?)
}

fn header_names(headers: &StringRecord) -> Vec<String> {
    headers.iter().map(normalize_header_name).collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn ensure_unique(names: &[String]) -> Result<(), AppError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(AppError::new(EXIT_DATASET, format!("CSV header {} is empty", idx + 1)));
        }
        if let Some(prev) = seen.insert(name.as_str(), idx) {
            return Err(AppError::new(
                EXIT_DATASET,
                format!("duplicate CSV column '{name}' (columns {} and {})", prev + 1, idx + 1),
            ));
        }
    }
    Ok(())
}

fn parse_cell(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
