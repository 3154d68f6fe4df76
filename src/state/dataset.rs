use chrono::NaiveDateTime;

use crate::error::{Result, SpcError};
use crate::state::series::{Sample, TimeSeries, Window};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    /// Cell rendered for CSV output.
    pub fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v.get(row).map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Text(v) => v.get(row).cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// A cleaned log: one timestamp index plus equally long value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub date_column: String,
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<Column>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    /// Observed timestamp range, `None` when the dataset has no rows.
    pub fn time_range(&self) -> Option<Window> {
        Some(Window::new(*self.index.first()?, *self.index.last()?))
    }

    /// Extract one numeric column as a time series.
    pub fn series(&self, name: &str) -> Result<TimeSeries> {
        let values = self.numeric(name).ok_or_else(|| {
            if self.has_column(name) {
                SpcError::MissingColumn(format!("{name} (not a numeric column)"))
            } else {
                SpcError::MissingColumn(name.to_string())
            }
        })?;

        Ok(self
            .index
            .iter()
            .zip(values)
            .map(|(&timestamp, &value)| Sample::new(timestamp, value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        Dataset {
            date_column: "Date".into(),
            index: vec![t0, t0 + chrono::Duration::seconds(10)],
            columns: vec![
                Column {
                    name: "Extruder 1: Screw torque".into(),
                    data: ColumnData::Numeric(vec![41.0, 42.5]),
                },
                Column {
                    name: "Operator".into(),
                    data: ColumnData::Text(vec!["ak".into(), "".into()]),
                },
            ],
        }
    }

    #[test]
    fn numeric_column_becomes_series() {
        let series = dataset().series("Extruder 1: Screw torque").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[1].value, 42.5);
    }

    #[test]
    fn absent_or_text_columns_are_missing() {
        let ds = dataset();
        assert!(matches!(ds.series("Torque"), Err(SpcError::MissingColumn(name)) if name == "Torque"));
        assert!(matches!(ds.series("Operator"), Err(SpcError::MissingColumn(_))));
    }

    #[test]
    fn time_range_spans_index() {
        let ds = dataset();
        let range = ds.time_range().unwrap();
        assert_eq!(range.start, ds.index[0]);
        assert_eq!(range.end, ds.index[1]);
        assert_eq!(ds.column("Operator").unwrap().data.cell(0), "ak");
    }
}
