use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};

/// One process measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Chronologically ordered measurements with unique, finite samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Build a series, sorting by timestamp. For duplicate timestamps the first
    /// sample wins; non-finite values are dropped.
    pub fn new(mut samples: Vec<Sample>) -> Self {
        let before = samples.len();
        samples.retain(|s| s.value.is_finite());
        samples.sort_by_key(|s| s.timestamp);
        samples.dedup_by_key(|s| s.timestamp);
        if samples.len() != before {
            tracing::warn!(
                "Dropped {} duplicate or non-finite samples",
                before - samples.len()
            );
        }
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Inclusive range covering every sample, `None` for an empty series.
    pub fn full_range(&self) -> Option<Window> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some(Window::new(first.timestamp, last.timestamp))
    }

    /// Samples with `start <= timestamp <= end`. Empty when `start > end`.
    pub fn within(&self, window: &Window) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.timestamp < window.start);
        let hi = self.samples.partition_point(|s| s.timestamp <= window.end);
        if lo >= hi {
            &[]
        } else {
            &self.samples[lo..hi]
        }
    }

    /// Exact-timestamp lookup.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.samples
            .binary_search_by_key(&timestamp, |s| s.timestamp)
            .ok()
            .map(|idx| self.samples[idx].value)
    }

    /// The latest `n` samples.
    pub fn tail(&self, n: usize) -> TimeSeries {
        let start = self.samples.len().saturating_sub(n);
        TimeSeries {
            samples: self.samples[start..].to_vec(),
        }
    }
}

impl FromIterator<Sample> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        TimeSeries::new(iter.into_iter().collect())
    }
}

/// Inclusive time range used to select the samples under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(SpcError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Restrict to `bounds`, the way a range slider pins its handles to the data.
    pub fn clamp_to(&self, bounds: &Window) -> Window {
        Window {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Free-text marker attached to one sample of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLabel {
    pub timestamp: NaiveDateTime,
    pub text: String,
}

impl EventLabel {
    pub fn new(timestamp: NaiveDateTime, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}
