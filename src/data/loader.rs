use std::io::Read;
use std::path::Path;

use crate::data::parser::{self, HEADER_SCAN_ROWS};
use crate::error::{Result, SpcError};

/// Raw tabular data as read from disk, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    /// Column-major: `column_data[col_idx][row_idx]`.
    pub column_data: Vec<Vec<String>>,
    pub row_count: usize,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.column_data[idx].as_slice())
    }
}

/// Load a CSV or Excel file into a `RawTable`.
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" | "txt" => load_csv(std::fs::File::open(path)?, b',')?,
        "xls" | "xlsx" => load_excel(path)?,
        _ => return Err(SpcError::UnsupportedFormat(ext)),
    };
    tracing::info!(
        "Loaded {:?}: {} columns, {} rows",
        path,
        table.columns.len(),
        table.row_count
    );
    Ok(table)
}

/// Read delimited text. Unreadable lines and lines wider than the header are
/// skipped, short rows are padded.
/// Non-UTF-8 input is decoded as Latin-1.
pub fn load_csv<R: Read>(mut input: R, delimiter: u8) -> Result<RawTable> {
    let mut content = Vec::new();
    input.read_to_end(&mut content)?;
    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        match result {
            Ok(record) => rows.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping unreadable line: {e}");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!("Skipped {skipped} unreadable lines");
    }

    into_table(rows)
}

fn load_excel(path: &Path) -> Result<RawTable> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook =
        open_workbook_auto(path).map_err(|e| SpcError::Excel(format!("Cannot open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SpcError::Excel("No sheets found".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SpcError::Excel(format!("Cannot read sheet {sheet_name}: {e}")))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    Data::String(s) => s.clone(),
                    Data::Float(f) => f.to_string(),
                    Data::Int(i) => i.to_string(),
                    Data::Bool(b) => b.to_string(),
                    Data::DateTime(dt) => dt
                        .as_datetime()
                        .map(crate::data::datetime::format_timestamp)
                        .unwrap_or_else(|| dt.to_string()),
                    Data::DateTimeIso(s) => s.clone(),
                    Data::DurationIso(s) => s.clone(),
                    Data::Error(e) => format!("{e:?}"),
                })
                .collect()
        })
        .collect();

    into_table(rows)
}

fn into_table(rows: Vec<Vec<String>>) -> Result<RawTable> {
    let header_row = parser::detect_header_row(&rows, HEADER_SCAN_ROWS);
    let Some(header) = rows.get(header_row) else {
        return Err(SpcError::NoData("file contains no rows".to_string()));
    };

    let columns: Vec<String> = header.iter().map(|s| s.trim().to_string()).collect();

    // Rows wider than the header cannot be mapped onto it and are dropped.
    let (data_rows, too_wide): (Vec<&Vec<String>>, Vec<&Vec<String>>) = rows[header_row + 1..]
        .iter()
        .partition(|row| row.len() <= columns.len());
    if !too_wide.is_empty() {
        tracing::warn!(
            "Skipped {} lines with more than {} fields",
            too_wide.len(),
            columns.len()
        );
    }

    let mut column_data: Vec<Vec<String>> = vec![Vec::with_capacity(data_rows.len()); columns.len()];
    for row in &data_rows {
        for (col_idx, col) in column_data.iter_mut().enumerate() {
            col.push(row.get(col_idx).cloned().unwrap_or_default());
        }
    }

    Ok(RawTable {
        columns,
        column_data,
        row_count: data_rows.len(),
    })
}
