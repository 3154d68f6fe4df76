use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};

pub const DEFAULT_DATE_COLUMN: &str = "Date";
pub const DEFAULT_THROUGHPUT_COLUMN: &str = "Dosing station 1: Total throughput";
pub const DEFAULT_CUMULATIVE_COLUMN: &str = "Cumulative Throughput";
pub const DEFAULT_ZONE_MARKER: &str = "Extruder 1: temperature zone";

/// Runtime settings. Every field has a default so a partial TOML file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Column holding the sample timestamps.
    pub date_column: String,
    /// Width of the control band in standard deviations.
    pub sigma_multiplier: f64,
    pub throughput_column: String,
    /// Name of the running-sum column appended during cleaning.
    pub cumulative_column: String,
    /// Substring identifying barrel heating-zone columns.
    pub zone_marker: String,
    pub max_chart_points: usize,
    pub logbook_path: String,
    /// Samples retained by the live monitor.
    pub monitor_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            sigma_multiplier: 3.0,
            throughput_column: DEFAULT_THROUGHPUT_COLUMN.to_string(),
            cumulative_column: DEFAULT_CUMULATIVE_COLUMN.to_string(),
            zone_marker: DEFAULT_ZONE_MARKER.to_string(),
            max_chart_points: 2000,
            logbook_path: "input_history.csv".to_string(),
            monitor_window: 100,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let parsed = Self::from_toml(&text)?;
                tracing::info!("Loaded settings from {:?}", path);
                parsed
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SpcError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sigma_multiplier.is_finite() || self.sigma_multiplier <= 0.0 {
            return Err(SpcError::Config(format!(
                "sigma_multiplier must be a positive number, got {}",
                self.sigma_multiplier
            )));
        }
        if self.date_column.trim().is_empty() {
            return Err(SpcError::Config("date_column must not be empty".to_string()));
        }
        if self.monitor_window == 0 {
            return Err(SpcError::Config("monitor_window must be at least 1".to_string()));
        }
        Ok(())
    }
}
