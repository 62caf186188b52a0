//! Which coefficient applies at a given hour.

use crate::period::Period;

/// Multiplier used when no period answers for the requested hour.
pub const DEFAULT_COEFFICIENT: f64 = 1.0;

/// Outcome of a lookup. Both variants carry a usable coefficient so dose
/// computation never aborts, but callers can tell a real match from the fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// `index` is the position of the matching period in the caller's slice.
    Matched { index: usize, coefficient: f64 },
    /// No period covers the hour; [`DEFAULT_COEFFICIENT`] applies.
    Defaulted,
}

impl Resolution {
    #[inline]
    pub fn coefficient(&self) -> f64 {
        match self {
            Resolution::Matched { coefficient, .. } => *coefficient,
            Resolution::Defaulted => DEFAULT_COEFFICIENT,
        }
    }

    #[inline]
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Resolution::Defaulted)
    }
}

/// Find the coefficient active at `hour` (0..24, wall-clock hour).
///
/// Periods are scanned in ascending start order; equal starts keep the
/// caller's order. The first period whose `[start, start + duration)` range
/// contains `hour` wins, which makes the answer deterministic even for
/// overlapping sets that have not been validated yet.
pub fn resolve(periods: &[Period], hour: u32) -> Resolution {
    let mut order: Vec<usize> = (0..periods.len()).collect();
    order.sort_by(|&a, &b| periods[a].start_hour.total_cmp(&periods[b].start_hour));

    for index in order {
        let p = &periods[index];
        if p.contains_hour(hour) {
            return Resolution::Matched {
                index,
                coefficient: p.coefficient,
            };
        }
    }
    tracing::debug!(hour, periods = periods.len(), "no period covers hour; using default coefficient");
    Resolution::Defaulted
}
