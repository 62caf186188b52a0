#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, settings documents and readings CSV parsing.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `SettingsDoc` is the per-user settings record in its wire shape
//!   (JSON or TOML), see the `settings` module.
//! - The readings CSV loader enforces headers before any row is accepted.
use serde::Deserialize;

pub mod readings;
pub mod settings;

pub use readings::{ReadingRow, load_readings_csv};
pub use settings::{
    CarbRatioPeriodRecord, InsulinPeriodRecord, SensitivityPeriodRecord, SettingsDoc, SpanRecord,
    format_start_time, load_settings_file, load_settings_json, load_settings_toml,
    parse_start_time, save_settings_file,
};

/// Largest UTC offset accepted for local-hour computations (minutes).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClockCfg {
    /// Offset of the user's wall clock from UTC, in minutes. Drives both the
    /// "current hour" used for dosing and the hour-of-day bucketing of readings.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TunerCfg {
    /// Trailing window of readings considered by the tuner (days).
    pub window_days: u32,
    /// Minimum readings in the window before any bucket is considered.
    pub min_readings: usize,
    /// Minimum readings in a single bucket before it may be adjusted.
    pub min_bucket_readings: usize,
    /// Bucket averages closer than this to target (mmol/L) are left alone.
    pub tolerance_mmol: f64,
    /// Lower clamp on the per-cycle adjustment factor.
    pub min_factor: f64,
    /// Upper clamp on the per-cycle adjustment factor.
    pub max_factor: f64,
}

impl Default for TunerCfg {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_readings: 5,
            min_bucket_readings: 3,
            tolerance_mmol: 1.0,
            min_factor: 0.8,
            max_factor: 1.2,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValidationCfg {
    /// Absolute tolerance (hours) when comparing a period set's total to 24.
    /// 0.0 demands exact equality.
    pub tolerance_hours: f64,
    /// Also reject sets whose boundaries do not meet end to start.
    pub strict_tiling: bool,
}

impl Default for ValidationCfg {
    fn default() -> Self {
        Self {
            tolerance_hours: 1e-9,
            strict_tiling: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub clock: ClockCfg,
    pub tuner: TunerCfg,
    pub validation: ValidationCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Clock
        if self.clock.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            eyre::bail!("clock.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}");
        }

        // Tuner
        if self.tuner.window_days == 0 {
            eyre::bail!("tuner.window_days must be >= 1");
        }
        if self.tuner.window_days > 366 {
            eyre::bail!("tuner.window_days is unreasonably large (>1 year)");
        }
        if self.tuner.min_readings == 0 {
            eyre::bail!("tuner.min_readings must be >= 1");
        }
        if self.tuner.min_bucket_readings == 0 {
            eyre::bail!("tuner.min_bucket_readings must be >= 1");
        }
        if !self.tuner.tolerance_mmol.is_finite() || self.tuner.tolerance_mmol < 0.0 {
            eyre::bail!("tuner.tolerance_mmol must be >= 0.0");
        }
        let (lo, hi) = (self.tuner.min_factor, self.tuner.max_factor);
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= 1.0 && hi >= 1.0) {
            eyre::bail!("tuner factors must satisfy 0.0 < min_factor <= 1.0 <= max_factor");
        }

        // Validation
        if !self.validation.tolerance_hours.is_finite() || self.validation.tolerance_hours < 0.0 {
            eyre::bail!("validation.tolerance_hours must be >= 0.0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_toml("").expect("parse empty TOML");
        assert_eq!(cfg.tuner.min_readings, 5);
        assert_eq!(cfg.tuner.min_bucket_readings, 3);
        assert_eq!(cfg.tuner.window_days, 7);
        assert!((cfg.tuner.max_factor - 1.2).abs() < f64::EPSILON);
        assert_eq!(cfg.clock.utc_offset_minutes, 0);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_tuner_section_keeps_other_defaults() {
        let cfg = load_toml("[tuner]\nmin_readings = 10\n").expect("parse");
        assert_eq!(cfg.tuner.min_readings, 10);
        assert!((cfg.tuner.tolerance_mmol - 1.0).abs() < f64::EPSILON);
    }
}
