//! Day-partitioned coefficients.
//!
//! A `Period` is one span of the day with a scalar coefficient. A `PeriodSet`
//! groups the periods governing one quantity (dosing coefficient, sensitivity
//! or carb ratio) and re-validates itself after every structural edit.

use std::fmt;

use crate::error::SettingsError;
use crate::resolver::{Resolution, resolve};
use crate::validator::{HOURS_IN_DAY, HOURS_TOLERANCE, ValidationReport, validate_tiling, validate_with};

/// Which quantity a period set governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKind {
    /// Multiplier applied to carb-derived meal insulin.
    DosingCoefficient,
    /// Glucose drop (mmol/L) per unit of insulin.
    Sensitivity,
    /// Grams of carbohydrate covered by one unit of insulin.
    CarbRatio,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PeriodKind::DosingCoefficient => "dosing-coefficient",
            PeriodKind::Sensitivity => "sensitivity",
            PeriodKind::CarbRatio => "carb-ratio",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// Start of the span, fractional hours in [0, 24).
    pub start_hour: f64,
    /// Length of the span in hours, > 0.
    pub duration_hours: f64,
    /// Scalar applied while this period is active, > 0.
    pub coefficient: f64,
    pub label: Option<String>,
}

impl Period {
    pub fn new(start_hour: f64, duration_hours: f64, coefficient: f64) -> Self {
        Self {
            start_hour,
            duration_hours,
            coefficient,
            label: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[inline]
    pub fn end_hour(&self) -> f64 {
        self.start_hour + self.duration_hours
    }

    /// Whole-hour span `[start, end)`: start floored, duration truncated.
    /// Only the quadrant projection works at this granularity.
    pub fn hour_span(&self) -> (i64, i64) {
        let start = self.start_hour.floor() as i64;
        (start, start + self.duration_hours.trunc() as i64)
    }

    /// True when `hour` (0..24) lies in `[start_hour, start_hour + duration_hours)`.
    /// Spans running past midnight also answer for the early hours of the day.
    pub fn contains_hour(&self, hour: u32) -> bool {
        let h = f64::from(hour);
        let end = self.end_hour();
        (h >= self.start_hour && h < end)
            || (h + HOURS_IN_DAY >= self.start_hour && h + HOURS_IN_DAY < end)
    }

    /// Per-period sanity: finite positive coefficient, start in [0,24), duration > 0.
    pub fn check(&self) -> std::result::Result<(), String> {
        if !(self.start_hour.is_finite() && (0.0..HOURS_IN_DAY).contains(&self.start_hour)) {
            return Err(format!("start hour must be in [0, 24), got {}", self.start_hour));
        }
        if !(self.duration_hours.is_finite() && self.duration_hours > 0.0) {
            return Err(format!("duration must be > 0, got {}", self.duration_hours));
        }
        if !(self.coefficient.is_finite() && self.coefficient > 0.0) {
            return Err(format!("coefficient must be > 0, got {}", self.coefficient));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSet {
    kind: PeriodKind,
    periods: Vec<Period>,
    tolerance_hours: f64,
}

impl PeriodSet {
    pub fn new(kind: PeriodKind, periods: Vec<Period>) -> Self {
        Self {
            kind,
            periods,
            tolerance_hours: HOURS_TOLERANCE,
        }
    }

    /// Four 6-hour quadrants starting at midnight: night, morning, afternoon, evening.
    pub fn quadrants(kind: PeriodKind, [night, morning, afternoon, evening]: [f64; 4]) -> Self {
        Self::new(
            kind,
            vec![
                Period::new(0.0, 6.0, night).labelled("night"),
                Period::new(6.0, 6.0, morning).labelled("morning"),
                Period::new(12.0, 6.0, afternoon).labelled("afternoon"),
                Period::new(18.0, 6.0, evening).labelled("evening"),
            ],
        )
    }

    /// Override the coverage tolerance (hours). `0.0` demands exact equality.
    pub fn with_tolerance(mut self, tolerance_hours: f64) -> Self {
        self.tolerance_hours = tolerance_hours;
        self
    }

    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn into_periods(self) -> Vec<Period> {
        self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Period> {
        self.periods.iter()
    }

    /// Coverage report for the current contents.
    pub fn validate(&self) -> ValidationReport {
        validate_with(&self.periods, self.tolerance_hours)
    }

    /// Coverage plus contiguous-boundary report.
    pub fn validate_tiling(&self) -> ValidationReport {
        validate_tiling(&self.periods, self.tolerance_hours)
    }

    /// Add a period and report the new coverage.
    pub fn push(&mut self, period: Period) -> ValidationReport {
        self.periods.push(period);
        self.validate()
    }

    /// Remove the period at `index`, returning it with the new coverage.
    pub fn remove(&mut self, index: usize) -> Option<(Period, ValidationReport)> {
        if index >= self.periods.len() {
            return None;
        }
        let removed = self.periods.remove(index);
        Some((removed, self.validate()))
    }

    /// Move the boundary in front of period `index` to `hour`.
    ///
    /// Periods are first ordered by start. The preceding period (wrapping to the
    /// last one for index 0) absorbs or gives up the difference so the total
    /// stays unchanged; the moved period's start becomes `hour`.
    pub fn set_boundary(
        &mut self,
        index: usize,
        hour: f64,
    ) -> std::result::Result<ValidationReport, SettingsError> {
        let n = self.periods.len();
        if index >= n || n < 2 {
            return Err(SettingsError::InvalidPeriod {
                kind: self.kind,
                index,
                reason: format!("no boundary to move in a set of {n} periods"),
            });
        }
        if !(hour.is_finite() && (0.0..HOURS_IN_DAY).contains(&hour)) {
            return Err(SettingsError::InvalidPeriod {
                kind: self.kind,
                index,
                reason: format!("boundary must be in [0, 24), got {hour}"),
            });
        }
        self.sort_by_start();
        let prev = if index == 0 { n - 1 } else { index - 1 };
        let mut shift = hour - self.periods[index].start_hour;
        // Moving the first boundary past midnight wraps around the day.
        if index == 0 && shift > HOURS_IN_DAY / 2.0 {
            shift -= HOURS_IN_DAY;
        }
        let prev_duration = self.periods[prev].duration_hours + shift;
        let cur_duration = self.periods[index].duration_hours - shift;
        if prev_duration <= 0.0 || cur_duration <= 0.0 {
            return Err(SettingsError::InvalidPeriod {
                kind: self.kind,
                index,
                reason: format!("boundary at {hour} would collapse a neighbouring period"),
            });
        }
        self.periods[prev].duration_hours = prev_duration;
        self.periods[index].duration_hours = cur_duration;
        self.periods[index].start_hour = hour;
        Ok(self.validate())
    }

    /// Stable sort by start hour; equal starts keep their relative order.
    pub fn sort_by_start(&mut self) {
        self.periods
            .sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));
    }

    /// Coefficient active at `hour`, see [`resolve`].
    pub fn resolve(&self, hour: u32) -> Resolution {
        resolve(&self.periods, hour)
    }

    /// Full check used before persisting: non-empty, per-period sanity, coverage.
    pub fn check(&self) -> std::result::Result<(), SettingsError> {
        self.check_with(false)
    }

    /// Like [`check`](Self::check); with `strict` the boundaries must also tile the day.
    pub fn check_with(&self, strict: bool) -> std::result::Result<(), SettingsError> {
        if self.periods.is_empty() {
            return Err(SettingsError::Empty { kind: self.kind });
        }
        for (index, p) in self.periods.iter().enumerate() {
            p.check().map_err(|reason| SettingsError::InvalidPeriod {
                kind: self.kind,
                index,
                reason,
            })?;
        }
        let report = if strict {
            self.validate_tiling()
        } else {
            self.validate()
        };
        if !report.ok {
            return Err(SettingsError::Coverage {
                kind: self.kind,
                total_hours: report.total_hours,
                message: report.message,
            });
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PeriodSet {
    type Item = &'a Period;
    type IntoIter = std::slice::Iter<'a, Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}
