use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use extruder_spc::app::{self, AnalyzeRequest, LogUpdate};
use extruder_spc::config::Settings;
use extruder_spc::data::datetime::parse_any;
use extruder_spc::logbook::CsvLogbook;
use extruder_spc::{EventLabel, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extruder-spc")]
#[command(about = "Clean extruder sensor logs and compute control charts")]
#[command(version)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw log and write it as CSV
    Clean {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the parameters available in a log
    Parameters { input: PathBuf },
    /// Compute the control chart for one parameter
    Analyze {
        input: PathBuf,
        #[arg(short, long)]
        parameter: String,
        #[arg(long, value_parser = parse_time)]
        start: Option<chrono::NaiveDateTime>,
        #[arg(long, value_parser = parse_time)]
        end: Option<chrono::NaiveDateTime>,
        /// Timestamp of the sample to label
        #[arg(long, value_parser = parse_time)]
        label_at: Option<chrono::NaiveDateTime>,
        #[arg(long, default_value = "Custom Event")]
        label: String,
        /// Width of the control band in standard deviations
        #[arg(long)]
        sigma: Option<f64>,
        /// Write the statistics table here ("auto" writes <Parameter>_stats.csv next to the input)
        #[arg(long)]
        stats_out: Option<PathBuf>,
        /// Write the chart payload as JSON
        #[arg(long)]
        chart_out: Option<PathBuf>,
    },
    /// Recompute the control chart on a timer as the log grows
    Monitor {
        input: PathBuf,
        /// Channel to follow, repeatable (every known channel when omitted)
        #[arg(short, long)]
        parameter: Vec<String>,
        #[arg(long, default_value_t = 15)]
        interval_secs: u64,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<usize>,
        /// Samples kept per refresh
        #[arg(long)]
        window: Option<usize>,
    },
    /// Operator logbook
    Log {
        /// Logbook file (defaults to the configured path)
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Add an entry; omitted values repeat the previous entry
    Add {
        #[arg(long)]
        screw_speed: Option<f64>,
        /// Zone temperature as N=TEMP, repeatable
        #[arg(long = "zone", value_parser = parse_zone)]
        zones: Vec<(usize, f64)>,
        #[arg(long)]
        die_temp: Option<f64>,
        #[arg(long)]
        comments: Option<String>,
    },
    /// Print the history as CSV
    List,
    /// Write the history to a CSV file
    Export { output: PathBuf },
}

fn parse_time(s: &str) -> std::result::Result<chrono::NaiveDateTime, String> {
    parse_any(s).ok_or_else(|| format!("unrecognized timestamp '{s}'"))
}

fn parse_zone(s: &str) -> std::result::Result<(usize, f64), String> {
    let (zone, temp) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=TEMP, got '{s}'"))?;
    let zone = zone.trim().parse().map_err(|e| format!("bad zone number: {e}"))?;
    let temp = temp.trim().parse().map_err(|e| format!("bad temperature: {e}"))?;
    Ok((zone, temp))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_soft() => {
            tracing::warn!("{e}");
            eprintln!("Warning: {e}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Clean { input, output } => {
            app::clean_file(&input, output.as_deref(), &settings, &mut out)?;
        }
        Commands::Parameters { input } => {
            app::list_parameters(&input, &settings, &mut out)?;
        }
        Commands::Analyze {
            input,
            parameter,
            start,
            end,
            label_at,
            label,
            sigma,
            stats_out,
            chart_out,
        } => {
            if let Some(sigma) = sigma {
                settings.sigma_multiplier = sigma;
                settings.validate()?;
            }
            let request = AnalyzeRequest {
                input,
                parameter,
                start,
                end,
                label: label_at.map(|at| EventLabel::new(at, label)),
                stats_out,
                chart_out,
            };
            app::analyze(&request, &settings, &mut out)?;
        }
        Commands::Monitor {
            input,
            parameter,
            interval_secs,
            ticks,
            window,
        } => {
            if let Some(window) = window {
                settings.monitor_window = window;
                settings.validate()?;
            }
            app::monitor(
                &input,
                &parameter,
                Duration::from_secs(interval_secs),
                ticks,
                &settings,
                &mut out,
            )?;
        }
        Commands::Log { file, action } => {
            let path = file.unwrap_or_else(|| PathBuf::from(&settings.logbook_path));
            let mut store = CsvLogbook::open(path)?;
            match action {
                LogAction::Add {
                    screw_speed,
                    zones,
                    die_temp,
                    comments,
                } => {
                    let update = LogUpdate {
                        screw_speed,
                        zones,
                        die_temp,
                        comments,
                    };
                    let now = chrono::Local::now().naive_local();
                    app::log_add(&mut store, update, now, &mut out)?;
                }
                LogAction::List => app::log_list(&store, &mut out)?,
                LogAction::Export { output } => {
                    let count = app::log_export(&store, &output)?;
                    writeln!(out, "Exported {count} entries to {}", output.display())?;
                }
            }
        }
    }
    Ok(())
}
