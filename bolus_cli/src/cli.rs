//! CLI argument definitions and shared statics.

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "bolus", version, about = "Time-segmented insulin dosing")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides [logging] level, default warn
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that every period set in a settings file covers the day
    Validate {
        /// Settings document (.json or .toml)
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
    },
    /// Show which coefficient of each set applies at an hour
    Resolve {
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
        /// Hour of day 0..=23; defaults to the current local hour
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
    },
    /// Compute a meal and correction dose
    Dose {
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
        /// Carbohydrate in grams
        #[arg(long, value_name = "GRAMS")]
        carbs: f64,
        /// Current glucose (mmol/L); no correction without it
        #[arg(long, value_name = "MMOL")]
        bg: Option<f64>,
        /// Insulin still on board (units)
        #[arg(long, value_name = "UNITS", default_value_t = 0.0)]
        iob: f64,
        /// Hour of day 0..=23; defaults to the current local hour
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
    },
    /// Run the adaptive tuner over a readings CSV
    Tune {
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
        /// Readings CSV with header timestamp,value[,source]
        #[arg(long, value_name = "CSV")]
        readings: PathBuf,
        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<DateTime<Utc>>,
        /// Rewrite the settings file when coefficients change
        #[arg(long, action = ArgAction::SetTrue)]
        write: bool,
    },
    /// Store one new reading on top of a history and run the tuning cycle
    Ingest {
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
        /// Existing history (header timestamp,value[,source])
        #[arg(long, value_name = "CSV")]
        readings: Option<PathBuf>,
        /// New glucose value (mmol/L)
        #[arg(long, value_name = "MMOL")]
        value: f64,
        /// Free-form source tag stored with the reading
        #[arg(long)]
        source: Option<String>,
        /// Timestamp the new reading with this RFC 3339 instant instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<DateTime<Utc>>,
        /// Rewrite the settings file when coefficients change
        #[arg(long, action = ArgAction::SetTrue)]
        write: bool,
    },
}
