//! Runtime configuration for the engine and the tuner.
//!
//! These are separate from the TOML-deserialized config in `bolus_config`;
//! see `conversions` for the bridge.

use chrono::{FixedOffset, Offset, TimeDelta, Utc};

use crate::validator::HOURS_TOLERANCE;

/// Adaptive tuning thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerCfg {
    /// Trailing window of readings considered, in days.
    pub window_days: u32,
    /// Readings required in the window before any bucket is looked at.
    pub min_readings: usize,
    /// Readings required inside one bucket before it may be adjusted.
    pub min_bucket_readings: usize,
    /// Bucket averages closer than this to target (mmol/L) are left alone.
    pub tolerance_mmol: f64,
    /// Lower clamp of the per-run correction factor.
    pub min_factor: f64,
    /// Upper clamp of the per-run correction factor.
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

impl TunerCfg {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.window_days))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineCfg {
    /// Offset used to turn instants into wall-clock hours.
    pub utc_offset: FixedOffset,
    pub tuner: TunerCfg,
    /// Hours tolerance for coverage checks; 0.0 means exact equality.
    pub tolerance_hours: f64,
    /// Also require period boundaries to tile the day.
    pub strict_tiling: bool,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            tuner: TunerCfg::default(),
            tolerance_hours: HOURS_TOLERANCE,
            strict_tiling: false,
        }
    }
}
