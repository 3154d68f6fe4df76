//! Error types shared across loading, cleaning, analysis and storage.

use chrono::NaiveDateTime;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, SpcError>;

/// Error type for every fallible operation in the crate
#[derive(Debug, thiserror::Error)]
pub enum SpcError {
    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Nothing to analyze: series is empty")]
    EmptySeries,

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("No sample at {0} to attach the label to")]
    AnnotationNotFound(NaiveDateTime),

    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid logbook entry: {0}")]
    InvalidEntry(String),
}

impl SpcError {
    /// Errors the command layer downgrades to a warning instead of failing.
    pub fn is_soft(&self) -> bool {
        matches!(self, SpcError::EmptySeries | SpcError::AnnotationNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_errors_are_empty_series_and_missing_annotation() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert!(SpcError::EmptySeries.is_soft());
        assert!(SpcError::AnnotationNotFound(ts).is_soft());
        assert!(!SpcError::MissingColumn("Torque".into()).is_soft());
        assert!(!SpcError::InvalidWindow { start: ts, end: ts }.is_soft());
    }

    #[test]
    fn messages_name_the_offending_column() {
        let err = SpcError::MissingColumn("Extruder 1: Screw torque".into());
        assert_eq!(err.to_string(), "Column not found: Extruder 1: Screw torque");
    }
}
