mod cli;
mod commands;
mod error_fmt;

use std::path::Path;

use bolus_core::EngineCfg;
use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: Option<&Path>) -> Result<bolus_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            bolus_config::load_toml(&text)
                .map_err(|e| eyre::eyre!("parse config {}: {e}", p.display()))?
        }
        None => bolus_config::Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays machine-readable; the optional
/// file sink always writes JSON lines.
fn init_tracing(cli: &Cli, logging: &bolus_config::Logging) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("warn");
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(EnvFilter::new(level))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    let engine_cfg = EngineCfg::try_from(&cfg)?;
    tracing::debug!(?engine_cfg, "configuration loaded");
    let json = cli.json;

    match cli.cmd {
        Commands::Validate { settings } => commands::run_validate(&engine_cfg, json, &settings),
        Commands::Resolve { settings, hour } => {
            commands::run_resolve(&engine_cfg, json, &settings, hour)
        }
        Commands::Dose {
            settings,
            carbs,
            bg,
            iob,
            hour,
        } => commands::run_dose(&engine_cfg, json, &settings, carbs, bg, iob, hour),
        Commands::Tune {
            settings,
            readings,
            at,
            write,
        } => commands::run_tune(&engine_cfg, json, &settings, &readings, at, write),
        Commands::Ingest {
            settings,
            readings,
            value,
            source,
            at,
            write,
        } => commands::run_ingest(
            &engine_cfg,
            json,
            &settings,
            readings.as_deref(),
            value,
            source,
            at,
            write,
        ),
    }
}
