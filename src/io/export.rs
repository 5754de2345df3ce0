//! Export result tables to CSV or JSON.
//!
//! CSV layout: a header row of `"", key1, key2, ...` followed by one row per
//! table row, `label, v1, v2, ...`. Spreadsheets read that as a labelled grid.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{AppError, EXIT_INPUT};
use crate::report::Table;

/// Write `table` as CSV into any writer.
pub fn write_table_csv<W: Write>(writer: W, table: &Table) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![String::new()];
    header.extend(table.keys().map(str::to_string));
    wtr.write_record(&header)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV header: {e}")))?;

    for (row, label) in table.row_labels.iter().enumerate() {
        let mut record = Vec::with_capacity(table.columns.len() + 1);
        record.push(label.clone());
        record.extend(
            table
                .columns
                .iter()
                .map(|c| c.values.get(row).map(f64::to_string).unwrap_or_default()),
        );
        wtr.write_record(&record)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV row: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Render `table` as a CSV string.
pub fn table_to_csv_string(table: &Table) -> Result<String, AppError> {
    let mut buf = Vec::new();
    write_table_csv(&mut buf, table)?;
    String::from_utf8(buf).map_err(|e| AppError::new(EXIT_INPUT, format!("Export CSV is not UTF-8: {e}")))
}

/// Write `table` to `path`: JSON for a `.json` extension, CSV otherwise.
pub fn write_table_file(path: &Path, table: &Table) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export '{}': {e}", path.display())))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::to_writer_pretty(file, table)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export JSON: {e}")))
    } else {
        write_table_csv(file, table)
    }
}
