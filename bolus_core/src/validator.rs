//! Full-day coverage checks for period sets.
//!
//! `validate` is the coverage check run after every edit and before every
//! settings write: the durations must add up to 24 hours. `validate_tiling`
//! additionally walks the boundaries and reports the first gap or overlap.

use crate::period::Period;

pub const HOURS_IN_DAY: f64 = 24.0;

/// Absolute tolerance when comparing a total against 24 hours.
/// Ten periods of 2.4 h sum to 23.999999999999996. `0.0` demands exact equality.
pub const HOURS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub ok: bool,
    pub total_hours: f64,
    pub message: String,
}

impl ValidationReport {
    fn pass(total_hours: f64) -> Self {
        Self {
            ok: true,
            total_hours,
            message: format!("periods cover {total_hours} hours"),
        }
    }

    fn fail(total_hours: f64, message: String) -> Self {
        Self {
            ok: false,
            total_hours,
            message,
        }
    }
}

/// Coverage check with the default tolerance.
pub fn validate(periods: &[Period]) -> ValidationReport {
    validate_with(periods, HOURS_TOLERANCE)
}

/// Coverage check: ok only if the durations sum to 24 hours (within `tolerance`).
pub fn validate_with(periods: &[Period], tolerance: f64) -> ValidationReport {
    let total_hours: f64 = periods.iter().map(|p| p.duration_hours).sum();
    if periods.is_empty() {
        return ValidationReport::fail(total_hours, "no periods defined".to_string());
    }
    let deviation = total_hours - HOURS_IN_DAY;
    // NaN durations land here too: NaN never compares <= tolerance.
    if deviation.abs() <= tolerance {
        return ValidationReport::pass(total_hours);
    }
    let message = if deviation < 0.0 {
        format!(
            "periods cover {total_hours} hours, {} short of {HOURS_IN_DAY}",
            -deviation
        )
    } else if deviation > 0.0 {
        format!("periods cover {total_hours} hours, {deviation} over {HOURS_IN_DAY}")
    } else {
        format!("periods cover {total_hours} hours, expected {HOURS_IN_DAY}")
    };
    ValidationReport::fail(total_hours, message)
}

/// Stricter check: coverage plus contiguous boundaries.
///
/// Periods are ordered by start hour; each period must end where the next
/// begins, and the last must wrap around to the first.
pub fn validate_tiling(periods: &[Period], tolerance: f64) -> ValidationReport {
    let coverage = validate_with(periods, tolerance);
    if !coverage.ok {
        return coverage;
    }
    let mut ordered: Vec<&Period> = periods.iter().collect();
    ordered.sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));

    for (i, cur) in ordered.iter().enumerate() {
        let next = ordered[(i + 1) % ordered.len()];
        let mut next_start = next.start_hour;
        if i + 1 == ordered.len() {
            next_start += HOURS_IN_DAY;
        }
        let diff = next_start - cur.end_hour();
        if diff.abs() <= tolerance {
            continue;
        }
        let message = if diff > 0.0 {
            format!(
                "gap of {diff} hours between {} and {}",
                cur.end_hour() % HOURS_IN_DAY,
                next.start_hour
            )
        } else {
            format!(
                "overlap of {} hours where period starting at {} begins",
                -diff, next.start_hour
            )
        };
        return ValidationReport::fail(coverage.total_hours, message);
    }
    coverage
}
