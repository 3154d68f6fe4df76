//! Individuals control chart for one process channel.
//!
//! Limits are `mean ± k·sd` over the samples inside the analysis window, with
//! the sample standard deviation. A negative lower limit is meaningless for
//! temperatures, pressures and throughputs, so it is replaced by the smallest
//! positive sample in the window (or 0 when there is none). The upper limit is
//! never adjusted.

use std::slice;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::processing::statistics::{mean, sample_std_dev};
use crate::state::series::{Sample, TimeSeries, Window};

pub const DEFAULT_SIGMA_MULTIPLIER: f64 = 3.0;

/// Where a sample falls relative to the control limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Normal,
    AboveUcl,
    BelowLcl,
}

impl Category {
    /// Strict comparison: a sample sitting exactly on a limit is in control.
    pub fn of(value: f64, stats: &ControlChartStats) -> Self {
        if value > stats.ucl {
            Category::AboveUcl
        } else if value < stats.lcl {
            Category::BelowLcl
        } else {
            Category::Normal
        }
    }
}

/// Snapshot of the control chart for one series and window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlChartStats {
    pub window: Window,
    pub mean: f64,
    pub stddev: f64,
    pub ucl: f64,
    pub lcl: f64,
    /// True when the lower limit was lifted off a negative value.
    pub lcl_clamped: bool,
    pub above_count: usize,
    pub below_count: usize,
    pub total_count: usize,
    pub pct_out_of_control: f64,
}

impl ControlChartStats {
    fn empty(window: Window) -> Self {
        Self {
            window,
            mean: 0.0,
            stddev: 0.0,
            ucl: 0.0,
            lcl: 0.0,
            lcl_clamped: false,
            above_count: 0,
            below_count: 0,
            total_count: 0,
            pct_out_of_control: 0.0,
        }
    }

    pub fn out_of_control_count(&self) -> usize {
        self.above_count + self.below_count
    }
}

/// One windowed sample tagged with its control-chart category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifiedSample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub category: Category,
}

/// Lazy classification over the samples of a window. Cloning restarts it.
#[derive(Debug, Clone)]
pub struct Classified<'a> {
    samples: slice::Iter<'a, Sample>,
    stats: &'a ControlChartStats,
}

impl Iterator for Classified<'_> {
    type Item = ClassifiedSample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.samples.next()?;
        Some(ClassifiedSample {
            timestamp: sample.timestamp,
            value: sample.value,
            category: Category::of(sample.value, self.stats),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

impl ExactSizeIterator for Classified<'_> {}

/// Computes control limits and violation counts. Stateless apart from the band width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpcAnalyzer {
    pub sigma_multiplier: f64,
}

impl Default for SpcAnalyzer {
    fn default() -> Self {
        Self {
            sigma_multiplier: DEFAULT_SIGMA_MULTIPLIER,
        }
    }
}

impl SpcAnalyzer {
    pub fn new(sigma_multiplier: f64) -> Self {
        Self { sigma_multiplier }
    }

    /// Compute the control chart for the samples of `series` inside `window`.
    ///
    /// Fails with `InvalidWindow` when `window.start > window.end` and with
    /// `EmptySeries` when `series` has no samples at all. A window that selects
    /// nothing yields an all-zero snapshot.
    pub fn compute(&self, series: &TimeSeries, window: &Window) -> Result<ControlChartStats> {
        window.validate()?;
        if series.is_empty() {
            return Err(SpcError::EmptySeries);
        }

        let values: Vec<f64> = series.within(window).iter().map(|s| s.value).collect();
        let Some(mean) = mean(&values) else {
            tracing::debug!("Window {:?} selects no samples", window);
            return Ok(ControlChartStats::empty(*window));
        };
        let stddev = sample_std_dev(&values);

        let ucl = mean + self.sigma_multiplier * stddev;
        let raw_lcl = mean - self.sigma_multiplier * stddev;
        let lcl_clamped = raw_lcl < 0.0;
        let lcl = if lcl_clamped {
            values
                .iter()
                .copied()
                .filter(|&v| v > 0.0)
                .min_by(f64::total_cmp)
                .unwrap_or(0.0)
        } else {
            raw_lcl
        };

        let above_count = values.iter().filter(|&&v| v > ucl).count();
        let below_count = values.iter().filter(|&&v| v < lcl).count();
        let total_count = values.len();
        let pct_out_of_control = (above_count + below_count) as f64 / total_count as f64 * 100.0;

        Ok(ControlChartStats {
            window: *window,
            mean,
            stddev,
            ucl,
            lcl,
            lcl_clamped,
            above_count,
            below_count,
            total_count,
            pct_out_of_control,
        })
    }

    /// Tag every sample of `stats.window` as normal, above UCL or below LCL.
    pub fn classify<'a>(
        &self,
        series: &'a TimeSeries,
        stats: &'a ControlChartStats,
    ) -> Classified<'a> {
        classify(series, stats)
    }
}

/// `SpcAnalyzer::default().compute(..)`: the classic three-sigma chart.
pub fn compute(series: &TimeSeries, window: &Window) -> Result<ControlChartStats> {
    SpcAnalyzer::default().compute(series, window)
}

pub fn classify<'a>(series: &'a TimeSeries, stats: &'a ControlChartStats) -> Classified<'a> {
    Classified {
        samples: series.within(&stats.window).iter(),
        stats,
    }
}
