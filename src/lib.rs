//! Control-chart analysis for extruder process logs.
//!
//! Raw sensor exports are loaded and cleaned into a timestamp-indexed
//! [`state::dataset::Dataset`], one channel is pulled out as a
//! [`state::series::TimeSeries`], and [`processing::control_chart`] derives
//! the mean, control limits and out-of-control counts for a time window.

pub mod app;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod logbook;
pub mod monitor;
pub mod processing;
pub mod state;

pub use error::{Result, SpcError};
pub use processing::control_chart::{
    classify, compute, Category, ClassifiedSample, ControlChartStats, SpcAnalyzer,
};
pub use state::series::{EventLabel, Sample, TimeSeries, Window};
