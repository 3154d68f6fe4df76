use chrono::NaiveDateTime;

use crate::config::Settings;
use crate::data::datetime::{detect_date_format, parse_timestamp};
use crate::data::loader::RawTable;
use crate::error::{Result, SpcError};
use crate::state::dataset::{Column, ColumnData, Dataset};

/// Share of non-empty cells that must parse as numbers for a column to be numeric.
pub const NUMERIC_THRESHOLD: f64 = 0.7;

/// Turn a raw log into a timestamp-indexed dataset.
///
/// Rows with unparsable or duplicate timestamps are dropped, the remaining
/// rows are put in chronological order, numeric gaps and negatives become 0,
/// text gaps become empty strings, and a cumulative throughput column is
/// appended when the throughput channel is present.
pub fn clean(raw: &RawTable, settings: &Settings) -> Result<Dataset> {
    let date_idx = raw
        .columns
        .iter()
        .position(|c| *c == settings.date_column)
        .ok_or_else(|| SpcError::MissingColumn(settings.date_column.clone()))?;
    let date_cells = &raw.column_data[date_idx];

    let format = detect_date_format(date_cells).ok_or_else(|| {
        SpcError::NoData(format!("no parseable timestamps in column {}", settings.date_column))
    })?;
    tracing::debug!("Timestamp format for {}: {format}", settings.date_column);

    let mut rows: Vec<(usize, NaiveDateTime)> = date_cells
        .iter()
        .enumerate()
        .filter_map(|(row, cell)| parse_timestamp(cell, format).map(|ts| (row, ts)))
        .collect();
    let invalid = raw.row_count - rows.len();

    rows.sort_by_key(|&(_, ts)| ts);
    let before_dedup = rows.len();
    rows.dedup_by_key(|(_, ts)| *ts);
    let duplicates = before_dedup - rows.len();

    if invalid > 0 || duplicates > 0 {
        tracing::warn!("Dropped {invalid} rows with invalid timestamps and {duplicates} duplicate timestamps");
    }
    if rows.is_empty() {
        return Err(SpcError::NoData("no rows left after timestamp cleaning".to_string()));
    }

    let mut columns: Vec<Column> = raw
        .columns
        .iter()
        .zip(&raw.column_data)
        .enumerate()
        .filter(|&(idx, _)| idx != date_idx)
        .map(|(_, (name, cells))| Column {
            name: name.clone(),
            data: clean_column(cells, &rows),
        })
        .collect();

    if let Some(cumulative) = cumulative_column(&columns, settings) {
        columns.push(cumulative);
    }

    let dataset = Dataset {
        date_column: settings.date_column.clone(),
        index: rows.iter().map(|&(_, ts)| ts).collect(),
        columns,
    };
    tracing::info!(
        "Cleaned dataset: {} rows, {} value columns",
        dataset.len(),
        dataset.columns.len()
    );
    Ok(dataset)
}

fn clean_column(cells: &[String], rows: &[(usize, NaiveDateTime)]) -> ColumnData {
    let picked: Vec<&str> = rows.iter().map(|&(row, _)| cells[row].trim()).collect();

    let non_empty = picked.iter().filter(|s| !s.is_empty()).count();
    let numeric = picked.iter().filter(|s| parse_number(s).is_some()).count();
    let is_numeric = non_empty == 0 || numeric as f64 / non_empty as f64 >= NUMERIC_THRESHOLD;

    if is_numeric {
        ColumnData::Numeric(
            picked
                .iter()
                .map(|s| parse_number(s).map_or(0.0, |v| v.max(0.0)))
                .collect(),
        )
    } else {
        ColumnData::Text(picked.iter().map(|s| s.to_string()).collect())
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cumulative_column(columns: &[Column], settings: &Settings) -> Option<Column> {
    let source = columns.iter().find(|c| c.name == settings.throughput_column);
    let Some(ColumnData::Numeric(values)) = source.map(|c| &c.data) else {
        tracing::warn!(
            "Column '{}' not found or not numeric. Skipping cumulative throughput.",
            settings.throughput_column
        );
        return None;
    };

    let running: Vec<f64> = values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect();

    Some(Column {
        name: settings.cumulative_column.clone(),
        data: ColumnData::Numeric(running),
    })
}
