//! Small numeric and time helpers shared across bolus_core.

use chrono::FixedOffset;

/// Seconds in one minute.
pub const SECS_PER_MINUTE: i32 = 60;

/// Arithmetic mean; 0.0 for an empty slice.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fixed offset east of UTC from minutes. `None` outside +/-24h.
#[inline]
pub fn fixed_offset(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(SECS_PER_MINUTE)?)
}
