//! Operator logbook: machine settings typed in by the operator, kept in an
//! append-only store owned by the application.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Result, SpcError};

pub const ZONE_COUNT: usize = 10;
pub const MAX_ZONE_TEMP: f64 = 400.0;
pub const MAX_SCREW_SPEED: f64 = 500.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column layout of a logbook file.
pub fn headers() -> Vec<String> {
    let mut headers = vec!["Timestamp".to_string(), "Screw Speed".to_string()];
    headers.extend((1..=ZONE_COUNT).map(|i| format!("Zone {i}")));
    headers.push("Die Temp".to_string());
    headers.push("Comments".to_string());
    headers
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    /// rpm
    pub screw_speed: f64,
    /// Barrel heating zones 1..=10, °C
    pub zones: [f64; ZONE_COUNT],
    pub die_temp: f64,
    pub comments: String,
}

impl LogEntry {
    /// Check the values against the bounds of the input form.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_SCREW_SPEED).contains(&self.screw_speed) {
            return Err(SpcError::InvalidEntry(format!(
                "screw speed {} outside 0..={MAX_SCREW_SPEED} rpm",
                self.screw_speed
            )));
        }
        if let Some((i, t)) = self
            .zones
            .iter()
            .enumerate()
            .find(|(_, t)| !(0.0..=MAX_ZONE_TEMP).contains(*t))
        {
            return Err(SpcError::InvalidEntry(format!(
                "zone {} temperature {t} outside 0..={MAX_ZONE_TEMP} \u{00B0}C",
                i + 1
            )));
        }
        if !self.die_temp.is_finite() {
            return Err(SpcError::InvalidEntry("die temperature must be a number".to_string()));
        }
        Ok(())
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.screw_speed.to_string(),
        ];
        record.extend(self.zones.iter().map(|t| t.to_string()));
        record.push(self.die_temp.to_string());
        record.push(self.comments.clone());
        record
    }

    pub fn from_record(record: &csv::StringRecord) -> Result<Self> {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let number = |idx: usize| -> Result<f64> {
            let raw = field(idx);
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f64>()
                .map_err(|_| SpcError::InvalidEntry(format!("'{raw}' in column {} is not a number", idx + 1)))
        };

        let timestamp = NaiveDateTime::parse_from_str(field(0), TIMESTAMP_FORMAT)
            .map_err(|e| SpcError::InvalidEntry(format!("bad timestamp '{}': {e}", field(0))))?;
        let mut zones = [0.0; ZONE_COUNT];
        for (i, zone) in zones.iter_mut().enumerate() {
            *zone = number(2 + i)?;
        }

        Ok(LogEntry {
            timestamp,
            screw_speed: number(1)?,
            zones,
            die_temp: number(2 + ZONE_COUNT)?,
            comments: record.get(3 + ZONE_COUNT).unwrap_or("").to_string(),
        })
    }
}

/// Append-only storage for logbook entries.
pub trait LogbookStore {
    fn append(&mut self, entry: LogEntry) -> Result<()>;
    fn list_all(&self) -> Result<Vec<LogEntry>>;
}

/// Latest entry, or an all-zero entry for pre-filling the first one.
pub fn last_entry_or_default(store: &dyn LogbookStore) -> Result<LogEntry> {
    Ok(store.list_all()?.pop().unwrap_or_default())
}

/// Session-scoped history that disappears with the process.
#[derive(Debug, Default)]
pub struct MemoryLogbook {
    entries: Vec<LogEntry>,
}

impl LogbookStore for MemoryLogbook {
    fn append(&mut self, entry: LogEntry) -> Result<()> {
        entry.validate()?;
        self.entries.push(entry);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<LogEntry>> {
        Ok(self.entries.clone())
    }
}

/// Logbook kept in a local CSV file.
#[derive(Debug, Clone)]
pub struct CsvLogbook {
    path: PathBuf,
}

impl CsvLogbook {
    /// Open (or create) the file, making sure its first row is the expected header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let logbook = Self { path: path.into() };
        logbook.ensure_headers()?;
        Ok(logbook)
    }

    fn ensure_headers(&self) -> Result<()> {
        let expected = headers();

        if !self.path.exists() {
            let mut writer = csv::Writer::from_path(&self.path)?;
            writer.write_record(&expected)?;
            writer.flush()?;
            tracing::info!("Created logbook {:?}", self.path);
            return Ok(());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        let mut rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

        if rows.first().is_some_and(|first| first.iter().eq(expected.iter().map(String::as_str))) {
            return Ok(());
        }

        // The first row is replaced, not shifted down.
        tracing::warn!("Logbook {:?} has unexpected headers, rewriting them", self.path);
        if !rows.is_empty() {
            rows.remove(0);
        }
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&self.path)?;
        writer.write_record(&expected)?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl LogbookStore for CsvLogbook {
    fn append(&mut self, entry: LogEntry) -> Result<()> {
        entry.validate()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(entry.to_record())?;
        writer.flush()?;
        tracing::info!("Appended logbook entry at {}", entry.timestamp);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<LogEntry>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&self.path)?;
        reader
            .records()
            .map(|record| LogEntry::from_record(&record?))
            .collect()
    }
}

/// Write entries as a CSV history export.
pub fn write_entries<W: Write>(entries: &[LogEntry], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(headers())?;
    for entry in entries {
        writer.write_record(entry.to_record())?;
    }
    writer.flush()?;
    Ok(())
}
