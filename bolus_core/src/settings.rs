//! Per-user dosing settings and glucose readings.

use chrono::{DateTime, Utc};

use crate::error::SettingsError;
use crate::period::{PeriodKind, PeriodSet};

pub const DEFAULT_TARGET_MIN: f64 = 4.0;
pub const DEFAULT_TARGET_MAX: f64 = 8.0;
pub const DEFAULT_IOB_DURATION_H: f64 = 4.0;
/// Night, morning, afternoon, evening.
pub const DEFAULT_DOSING_QUADRANTS: [f64; 4] = [1.0, 1.2, 1.0, 0.8];
pub const DEFAULT_SENSITIVITY: f64 = 2.0;
pub const DEFAULT_CARB_RATIO: f64 = 1.0;

/// Settings are replaced wholesale on update; there is no partial patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Lower bound of the target range (mmol/L); also the dosing target.
    pub target_min: f64,
    pub target_max: f64,
    /// Insulin action duration in hours.
    pub iob_duration: f64,
    pub dosing: PeriodSet,
    pub sensitivity: PeriodSet,
    pub carb_ratio: PeriodSet,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_min: DEFAULT_TARGET_MIN,
            target_max: DEFAULT_TARGET_MAX,
            iob_duration: DEFAULT_IOB_DURATION_H,
            dosing: PeriodSet::quadrants(PeriodKind::DosingCoefficient, DEFAULT_DOSING_QUADRANTS),
            sensitivity: PeriodSet::quadrants(PeriodKind::Sensitivity, [DEFAULT_SENSITIVITY; 4]),
            carb_ratio: PeriodSet::quadrants(PeriodKind::CarbRatio, [DEFAULT_CARB_RATIO; 4]),
            updated_at: None,
        }
    }
}

impl Settings {
    /// Target glucose used by dosing and tuning.
    #[inline]
    pub fn target_bg(&self) -> f64 {
        self.target_min
    }

    /// Apply one coverage tolerance (hours) to all three period sets.
    pub fn with_tolerance(mut self, tolerance_hours: f64) -> Self {
        self.dosing = self.dosing.with_tolerance(tolerance_hours);
        self.sensitivity = self.sensitivity.with_tolerance(tolerance_hours);
        self.carb_ratio = self.carb_ratio.with_tolerance(tolerance_hours);
        self
    }

    pub fn period_sets(&self) -> [&PeriodSet; 3] {
        [&self.dosing, &self.sensitivity, &self.carb_ratio]
    }

    /// Check everything that must hold before settings may be stored.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.validate_with(false)
    }

    /// `strict` additionally requires each set's boundaries to tile the day.
    pub fn validate_with(&self, strict: bool) -> Result<(), SettingsError> {
        if !(self.target_min.is_finite() && self.target_min > 0.0) {
            return Err(SettingsError::Target(format!(
                "target_min must be > 0, got {}",
                self.target_min
            )));
        }
        if !(self.target_max.is_finite() && self.target_max >= self.target_min) {
            return Err(SettingsError::Target(format!(
                "target_max ({}) must be >= target_min ({})",
                self.target_max, self.target_min
            )));
        }
        if !(self.iob_duration.is_finite() && self.iob_duration > 0.0) {
            return Err(SettingsError::IobDuration(self.iob_duration));
        }
        for set in self.period_sets() {
            set.check_with(strict)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseReading {
    /// mmol/L
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,
}

impl GlucoseReading {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            source: None,
        }
    }
}

/// Coarse classification reported back when a reading is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseStatus {
    Low,
    Normal,
    SlightlyElevated,
    High,
}

impl GlucoseStatus {
    pub fn classify(value: f64) -> Self {
        if value < 3.9 {
            GlucoseStatus::Low
        } else if value > 10.0 {
            GlucoseStatus::High
        } else if value > 7.0 {
            GlucoseStatus::SlightlyElevated
        } else {
            GlucoseStatus::Normal
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            GlucoseStatus::Low => "Low blood sugar (hypoglycemia)",
            GlucoseStatus::Normal => "Normal range",
            GlucoseStatus::SlightlyElevated => "Slightly elevated",
            GlucoseStatus::High => "High blood sugar (hyperglycemia)",
        }
    }
}
