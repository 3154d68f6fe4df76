use std::collections::HashMap;

use crate::data::datetime::is_date_like;

/// Rows inspected when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 50;

/// Find the header row of an instrument log that may start with preamble lines
/// (machine id, export date, ...). Returns a 0-based row index.
///
/// The header is the last row, within the first `max_rows`, that has the most
/// common cell count and consists only of non-empty, non-numeric, non-date cells.
pub fn detect_header_row(rows: &[Vec<String>], max_rows: usize) -> usize {
    let scanned = &rows[..rows.len().min(max_rows)];

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in scanned.iter().filter(|r| !r.is_empty()) {
        *counts.entry(row.len()).or_insert(0) += 1;
    }
    // Ties go to the wider row so a one-cell preamble never wins.
    let Some(most_common) = counts
        .into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)
    else {
        return 0;
    };

    scanned
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, row)| row.len() == most_common)
        .find(|(_, row)| row.iter().all(|cell| is_label(cell)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_label(cell: &str) -> bool {
    let trimmed = cell.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_err() && !is_date_like(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_on_first_line() {
        let data = rows(&[
            &["Date", "Extruder 1: Screw torque"],
            &["2024-05-01 08:00:00", "41.2"],
            &["2024-05-01 08:00:10", "40.9"],
        ]);
        assert_eq!(detect_header_row(&data, HEADER_SCAN_ROWS), 0);
    }

    #[test]
    fn header_after_preamble() {
        let data = rows(&[
            &["ActVal export"],
            &["Line 3", "Recipe PP-12"],
            &["Date", "Pressure", "Torque"],
            &["2024-05-01 08:00:00", "120", "41"],
            &["2024-05-01 08:00:10", "121", "40"],
            &["2024-05-01 08:00:20", "119", "42"],
        ]);
        assert_eq!(detect_header_row(&data, HEADER_SCAN_ROWS), 2);
    }

    #[test]
    fn falls_back_to_first_row() {
        let data = rows(&[&["1", "2"], &["3", "4"]]);
        assert_eq!(detect_header_row(&data, HEADER_SCAN_ROWS), 0);
        assert_eq!(detect_header_row(&[], HEADER_SCAN_ROWS), 0);
    }
}
