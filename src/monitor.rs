//! Live monitoring: re-read a growing log on a fixed interval and recompute
//! the control chart from scratch each time.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::config::Settings;
use crate::data::{cleaning, loader};
use crate::error::{Result, SpcError};
use crate::processing::control_chart::{ControlChartStats, SpcAnalyzer};
use crate::processing::parameters;
use crate::state::series::TimeSeries;

/// One monitored channel of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub series: TimeSeries,
}

/// Supplies a fresh snapshot of every monitored channel on each call.
pub trait SampleSource {
    fn snapshot(&mut self) -> Result<Vec<Channel>>;
}

/// Reads parameters from a CSV/Excel log on disk. With no parameters named,
/// every channel of the catalog is followed (main channels and heating zones).
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    parameters: Vec<String>,
    settings: Settings,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, parameters: Vec<String>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            parameters,
            settings,
        }
    }
}

impl SampleSource for FileSource {
    fn snapshot(&mut self) -> Result<Vec<Channel>> {
        let raw = loader::load_file(&self.path)?;
        let dataset = cleaning::clean(&raw, &self.settings)?;
        let zone_marker = &self.settings.zone_marker;

        let params = if self.parameters.is_empty() {
            parameters::catalog(&dataset, zone_marker)
        } else {
            self.parameters
                .iter()
                .map(|name| parameters::resolve(&dataset, zone_marker, name))
                .collect::<Result<Vec<_>>>()?
        };
        if params.is_empty() {
            return Err(SpcError::NoData(format!(
                "no known extruder parameters in {:?}",
                self.path
            )));
        }

        params
            .into_iter()
            .map(|param| {
                Ok(Channel {
                    series: dataset.series(&param.column)?,
                    name: param.display,
                })
            })
            .collect()
    }
}

/// Control chart of one channel at one tick.
#[derive(Debug)]
pub struct ChannelStats {
    pub name: String,
    pub stats: Result<ControlChartStats>,
}

pub struct Monitor<S> {
    source: S,
    analyzer: SpcAnalyzer,
    retain: usize,
}

impl<S: SampleSource> Monitor<S> {
    pub fn new(source: S, analyzer: SpcAnalyzer, retain: usize) -> Self {
        Self {
            source,
            analyzer,
            retain: retain.max(1),
        }
    }

    /// One refresh: snapshot, keep the latest `retain` samples of each channel,
    /// analyze them all. A channel with no samples fails on its own.
    pub fn tick(&mut self) -> Result<Vec<ChannelStats>> {
        let channels = self.source.snapshot()?;
        Ok(channels
            .into_iter()
            .map(|channel| ChannelStats {
                stats: self.analyze(&channel.series),
                name: channel.name,
            })
            .collect())
    }

    fn analyze(&self, series: &TimeSeries) -> Result<ControlChartStats> {
        let recent = series.tail(self.retain);
        let window = recent.full_range().ok_or(SpcError::EmptySeries)?;
        self.analyzer.compute(&recent, &window)
    }

    /// Tick `ticks` times (forever when `None`), sleeping `interval` in between.
    /// Every outcome, failures included, goes to `on_tick`, which may stop the loop.
    pub fn run<F>(&mut self, ticks: Option<usize>, interval: Duration, mut on_tick: F)
    where
        F: FnMut(usize, Result<Vec<ChannelStats>>) -> ControlFlow<()>,
    {
        let mut n = 0usize;
        while !ticks.is_some_and(|limit| n >= limit) {
            if n > 0 {
                thread::sleep(interval);
            }
            let outcome = self.tick();
            if let Err(e) = &outcome {
                tracing::warn!("Monitor tick {n} failed: {e}");
            }
            let flow = on_tick(n, outcome);
            n += 1;
            if flow.is_break() {
                break;
            }
        }
        tracing::info!("Monitor stopped after {n} ticks");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::series::Sample;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    /// Appends one reading per snapshot, like a sensor writing to a log.
    struct Growing {
        values: Vec<f64>,
        served: usize,
    }

    impl SampleSource for Growing {
        fn snapshot(&mut self) -> Result<Vec<Channel>> {
            self.served = (self.served + 1).min(self.values.len());
            let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
            let series = self.values[..self.served]
                .iter()
                .enumerate()
                .map(|(i, &v)| Sample::new(t0 + ChronoDuration::seconds(15 * i as i64), v))
                .collect();
            Ok(vec![Channel {
                name: "Pressure".into(),
                series,
            }])
        }
    }

    /// Two channels, one of which never reports anything.
    struct ZonesWithDeadSensor;

    impl SampleSource for ZonesWithDeadSensor {
        fn snapshot(&mut self) -> Result<Vec<Channel>> {
            let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
            let zone1 = (0..3)
                .map(|i| Sample::new(t0 + ChronoDuration::seconds(i), 200.0 + i as f64))
                .collect();
            Ok(vec![
                Channel {
                    name: "Heating Zone 1".into(),
                    series: zone1,
                },
                Channel {
                    name: "Heating Zone 2".into(),
                    series: TimeSeries::default(),
                },
            ])
        }
    }

    #[test]
    fn each_tick_sees_only_the_retained_tail() {
        let source = Growing {
            values: vec![100.0, 200.0, 300.0, 400.0],
            served: 0,
        };
        let mut monitor = Monitor::new(source, SpcAnalyzer::default(), 2);
        let mut seen = Vec::new();
        monitor.run(Some(4), Duration::ZERO, |_, outcome| {
            let channels = outcome.unwrap();
            assert_eq!(channels.len(), 1);
            let stats = channels[0].stats.as_ref().unwrap();
            seen.push((stats.total_count, stats.mean));
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![(1, 100.0), (2, 150.0), (2, 250.0), (2, 350.0)]);
    }

    #[test]
    fn empty_snapshot_is_reported_and_loop_can_stop() {
        let source = Growing {
            values: Vec::new(),
            served: 0,
        };
        let mut monitor = Monitor::new(source, SpcAnalyzer::default(), 10);
        let mut calls = 0;
        monitor.run(None, Duration::ZERO, |_, outcome| {
            calls += 1;
            let channels = outcome.unwrap();
            assert!(matches!(channels[0].stats, Err(SpcError::EmptySeries)));
            if calls == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_ticks_never_touch_the_source() {
        let source = Growing {
            values: vec![100.0],
            served: 0,
        };
        let mut monitor = Monitor::new(source, SpcAnalyzer::default(), 10);
        let mut calls = 0;
        monitor.run(Some(0), Duration::ZERO, |_, _| {
            calls += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(calls, 0);
        assert_eq!(monitor.source.served, 0);
    }

    #[test]
    fn each_channel_is_analyzed_separately() {
        let mut monitor = Monitor::new(ZonesWithDeadSensor, SpcAnalyzer::default(), 10);
        let channels = monitor.tick().unwrap();
        let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Heating Zone 1", "Heating Zone 2"]);

        let zone1 = channels[0].stats.as_ref().unwrap();
        assert_eq!(zone1.total_count, 3);
        assert_eq!(zone1.mean, 201.0);
        assert!(matches!(channels[1].stats, Err(SpcError::EmptySeries)));
    }
}
