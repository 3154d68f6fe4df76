//! Command handlers behind the CLI. Each handler writes its human-readable
//! output to the supplied writer and returns the computed value so callers
//! (and tests) can inspect it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::chart::ChartData;
use crate::config::Settings;
use crate::data::{cleaning, loader};
use crate::error::Result;
use crate::export;
use crate::logbook::{self, LogEntry, LogbookStore};
use crate::monitor::{FileSource, Monitor};
use crate::processing::control_chart::{ControlChartStats, SpcAnalyzer};
use crate::processing::parameters::{self, Parameter};
use crate::processing::statistics::SeriesStats;
use crate::state::dataset::Dataset;
use crate::state::series::{EventLabel, Window};

/// Load and clean a log file.
pub fn load_dataset(input: &Path, settings: &Settings) -> Result<Dataset> {
    let raw = loader::load_file(input)?;
    cleaning::clean(&raw, settings)
}

/// `<stem>_cleaned.csv` next to the input.
pub fn default_cleaned_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data");
    input.with_file_name(format!("{stem}_cleaned.csv"))
}

pub fn clean_file<W: Write>(
    input: &Path,
    output: Option<&Path>,
    settings: &Settings,
    out: &mut W,
) -> Result<Dataset> {
    let dataset = load_dataset(input, settings)?;
    let target = output.map_or_else(|| default_cleaned_path(input), Path::to_path_buf);
    export::write_dataset(&dataset, BufWriter::new(File::create(&target)?))?;
    writeln!(out, "Cleaned {} rows -> {}", dataset.len(), target.display())?;
    Ok(dataset)
}

/// Print every chartable parameter with a short summary of its values.
pub fn list_parameters<W: Write>(input: &Path, settings: &Settings, out: &mut W) -> Result<Vec<Parameter>> {
    let dataset = load_dataset(input, settings)?;
    let catalog = parameters::catalog(&dataset, &settings.zone_marker);
    if catalog.is_empty() {
        writeln!(out, "No known extruder parameters in {}", input.display())?;
    }
    for param in &catalog {
        let summary = dataset
            .numeric(&param.column)
            .and_then(SeriesStats::compute)
            .map(|s| s.report())
            .unwrap_or_else(|| "no data".to_string());
        writeln!(out, "{:<18} {:<40} {}", param.display, param.column, summary)?;
    }
    Ok(catalog)
}

/// `stats_out` value that names the table after the parameter, next to the input.
pub const AUTO_STATS_PATH: &str = "auto";

#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub input: PathBuf,
    pub parameter: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub label: Option<EventLabel>,
    pub stats_out: Option<PathBuf>,
    pub chart_out: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub parameter: Parameter,
    pub stats: ControlChartStats,
    pub chart: ChartData,
}

/// Run the control chart for one parameter and print the statistics table.
/// Requested window bounds are pinned to the range the log actually covers.
pub fn analyze<W: Write>(request: &AnalyzeRequest, settings: &Settings, out: &mut W) -> Result<Analysis> {
    let dataset = load_dataset(&request.input, settings)?;
    let parameter = parameters::resolve(&dataset, &settings.zone_marker, &request.parameter)?;
    let series = dataset.series(&parameter.column)?;

    let bounds = series.full_range().ok_or(crate::SpcError::EmptySeries)?;
    let requested = Window::new(
        request.start.unwrap_or(bounds.start),
        request.end.unwrap_or(bounds.end),
    );
    // Clamping can fold a reversed window into a single point.
    requested.validate()?;
    let window = requested.clamp_to(&bounds);

    let analyzer = SpcAnalyzer::new(settings.sigma_multiplier);
    let stats = analyzer.compute(&series, &window)?;
    let chart = ChartData::build(
        &parameter,
        &series,
        &stats,
        request.label.as_ref(),
        settings.max_chart_points,
    );

    writeln!(out, "{}", chart.title)?;
    writeln!(out, "Window: {} .. {}", window.start, window.end)?;
    print_stats(&stats, out)?;
    if let Some(annotation) = &chart.annotation {
        writeln!(out, "Label '{}' at {} ({:.2})", annotation.text, annotation.timestamp, annotation.value)?;
    }

    if let Some(path) = &request.stats_out {
        let path = if path.as_os_str() == AUTO_STATS_PATH {
            request
                .input
                .with_file_name(export::stats_file_name(&parameter.display))
        } else {
            path.clone()
        };
        export::write_stats(&stats, BufWriter::new(File::create(&path)?))?;
        tracing::info!("Exported statistics to {:?}", path);
    }
    if let Some(path) = &request.chart_out {
        std::fs::write(path, chart.to_json()?)?;
        tracing::info!("Exported chart data to {:?}", path);
    }

    Ok(Analysis {
        parameter,
        stats,
        chart,
    })
}

fn print_stats<W: Write>(stats: &ControlChartStats, out: &mut W) -> Result<()> {
    for (name, value) in export::stats_rows(stats) {
        writeln!(out, "  {name:<18} {value:>12}")?;
    }
    Ok(())
}

/// Poll `input` and print one status line per channel per tick. An empty
/// `parameters` list follows every known channel.
pub fn monitor<W: Write>(
    input: &Path,
    parameters: &[String],
    interval: Duration,
    ticks: Option<usize>,
    settings: &Settings,
    out: &mut W,
) -> Result<()> {
    let source = FileSource::new(input, parameters.to_vec(), settings.clone());
    let analyzer = SpcAnalyzer::new(settings.sigma_multiplier);
    let mut monitor = Monitor::new(source, analyzer, settings.monitor_window);

    let mut write_error = None;
    monitor.run(ticks, interval, |tick, outcome| {
        let lines: Vec<String> = match outcome {
            Ok(channels) => channels
                .into_iter()
                .map(|channel| match channel.stats {
                    Ok(stats) => format!(
                        "[{tick}] {}: n={} mean={:.2} UCL={:.2} LCL={:.2} above={} below={} out={:.2}%",
                        channel.name,
                        stats.total_count,
                        stats.mean,
                        stats.ucl,
                        stats.lcl,
                        stats.above_count,
                        stats.below_count,
                        stats.pct_out_of_control
                    ),
                    Err(e) => format!("[{tick}] {}: {e}", channel.name),
                })
                .collect(),
            Err(e) => vec![format!("[{tick}] {e}")],
        };
        let written = lines
            .iter()
            .try_for_each(|line| writeln!(out, "{line}"))
            .and_then(|_| out.flush());
        match written {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                write_error = Some(e);
                ControlFlow::Break(())
            }
        }
    });
    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Append an entry to the logbook, filling unspecified fields from the last entry.
pub fn log_add<W: Write>(
    store: &mut dyn LogbookStore,
    update: LogUpdate,
    now: NaiveDateTime,
    out: &mut W,
) -> Result<LogEntry> {
    let mut entry = logbook::last_entry_or_default(store)?;
    entry.timestamp = now;
    entry.comments = update.comments.unwrap_or_default();
    if let Some(speed) = update.screw_speed {
        entry.screw_speed = speed;
    }
    for (zone, temp) in update.zones {
        match entry.zones.get_mut(zone.wrapping_sub(1)) {
            Some(slot) => *slot = temp,
            None => {
                return Err(crate::SpcError::InvalidEntry(format!(
                    "zone {zone} does not exist (1..={})",
                    logbook::ZONE_COUNT
                )))
            }
        }
    }
    if let Some(die) = update.die_temp {
        entry.die_temp = die;
    }

    store.append(entry.clone())?;
    writeln!(out, "Entry submitted at {}", entry.timestamp)?;
    Ok(entry)
}

/// Changes relative to the previous logbook entry.
#[derive(Debug, Clone, Default)]
pub struct LogUpdate {
    pub screw_speed: Option<f64>,
    /// (zone number starting at 1, temperature)
    pub zones: Vec<(usize, f64)>,
    pub die_temp: Option<f64>,
    pub comments: Option<String>,
}

pub fn log_list<W: Write>(store: &dyn LogbookStore, out: &mut W) -> Result<()> {
    let entries = store.list_all()?;
    if entries.is_empty() {
        writeln!(out, "No input history available.")?;
        return Ok(());
    }
    logbook::write_entries(&entries, out)
}

pub fn log_export(store: &dyn LogbookStore, target: &Path) -> Result<usize> {
    let entries = store.list_all()?;
    logbook::write_entries(&entries, BufWriter::new(File::create(target)?))?;
    tracing::info!("Exported {} logbook entries to {:?}", entries.len(), target);
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logbook::MemoryLogbook;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(14, 30, 0).unwrap()
    }

    #[test]
    fn log_add_carries_previous_settings() {
        let mut store = MemoryLogbook::default();
        let mut out = Vec::new();
        log_add(
            &mut store,
            LogUpdate {
                screw_speed: Some(50.0),
                zones: vec![(1, 180.0), (10, 200.0)],
                die_temp: Some(210.0),
                comments: Some("first".into()),
            },
            now(),
            &mut out,
        )
        .unwrap();
        let second = log_add(
            &mut store,
            LogUpdate {
                zones: vec![(1, 185.0)],
                ..LogUpdate::default()
            },
            now(),
            &mut out,
        )
        .unwrap();

        assert_eq!(second.screw_speed, 50.0);
        assert_eq!(second.zones[0], 185.0);
        assert_eq!(second.zones[9], 200.0);
        assert_eq!(second.die_temp, 210.0);
        assert_eq!(second.comments, "");
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let mut store = MemoryLogbook::default();
        let update = LogUpdate {
            zones: vec![(11, 180.0)],
            ..LogUpdate::default()
        };
        assert!(log_add(&mut store, update, now(), &mut Vec::new()).is_err());
        let update = LogUpdate {
            zones: vec![(0, 180.0)],
            ..LogUpdate::default()
        };
        assert!(log_add(&mut store, update, now(), &mut Vec::new()).is_err());
    }

    #[test]
    fn empty_history_message() {
        let store = MemoryLogbook::default();
        let mut out = Vec::new();
        log_list(&store, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No input history available.\n");
    }

    #[test]
    fn cleaned_path_sits_next_to_input() {
        assert_eq!(
            default_cleaned_path(Path::new("/data/ActVal.csv")),
            PathBuf::from("/data/ActVal_cleaned.csv")
        );
    }
}
