//! Adaptive tuning of the dosing coefficients from recent glucose history.
//!
//! Readings are bucketed by wall-clock hour into the four quadrants. A bucket
//! with enough readings whose average sits too far from target nudges its
//! coefficient by `target / average`, clamped to
//! `[min_factor, max_factor]`. Buckets are independent of each other.

use chrono::{FixedOffset, Timelike};

use crate::config::TunerCfg;
use crate::quadrants::{Quadrant, QuadrantCoefficients};
use crate::settings::GlucoseReading;
use crate::util::mean;

/// What happened to one quadrant during a tuning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BucketOutcome {
    /// Fewer than `min_bucket_readings` fell into the bucket.
    TooFewReadings { count: usize },
    /// Average closer to target than the tolerance.
    WithinTolerance { count: usize, average: f64 },
    Adjusted {
        count: usize,
        average: f64,
        /// Clamped `target / average`.
        factor: f64,
        previous: f64,
        adjusted: f64,
    },
}

impl BucketOutcome {
    pub fn is_adjusted(&self) -> bool {
        matches!(self, BucketOutcome::Adjusted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketReport {
    pub quadrant: Quadrant,
    pub outcome: BucketOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TunerOutcome {
    /// Not enough readings in the window; nothing was evaluated.
    InsufficientData { readings: usize, required: usize },
    Evaluated {
        coefficients: QuadrantCoefficients,
        /// Night, morning, afternoon, evening.
        buckets: [BucketReport; 4],
    },
}

impl TunerOutcome {
    /// True when at least one bucket changed its coefficient.
    pub fn any_adjusted(&self) -> bool {
        match self {
            TunerOutcome::InsufficientData { .. } => false,
            TunerOutcome::Evaluated { buckets, .. } => buckets.iter().any(|b| b.outcome.is_adjusted()),
        }
    }

    /// Tuned coefficients, or `None` when the run was skipped.
    pub fn coefficients(&self) -> Option<QuadrantCoefficients> {
        match self {
            TunerOutcome::InsufficientData { .. } => None,
            TunerOutcome::Evaluated { coefficients, .. } => Some(*coefficients),
        }
    }
}

/// Clamped correction factor for one bucket, or `None` when the average is
/// closer than `tolerance_mmol` to `target`. A distance of exactly the
/// tolerance is corrected.
pub fn correction_factor(average: f64, target: f64, cfg: &TunerCfg) -> Option<f64> {
    if (average - target).abs() < cfg.tolerance_mmol {
        return None;
    }
    Some((target / average).clamp(cfg.min_factor, cfg.max_factor))
}

/// Run one tuning pass over `readings` (already limited to the trailing window).
///
/// `offset` converts reading instants into the wall-clock hour used for
/// bucketing. `current` is the coefficient set the factors are applied to.
pub fn tune(
    readings: &[GlucoseReading],
    target: f64,
    current: QuadrantCoefficients,
    cfg: &TunerCfg,
    offset: FixedOffset,
) -> TunerOutcome {
    if readings.len() < cfg.min_readings {
        tracing::debug!(
            readings = readings.len(),
            required = cfg.min_readings,
            "not enough readings to tune"
        );
        return TunerOutcome::InsufficientData {
            readings: readings.len(),
            required: cfg.min_readings,
        };
    }

    let mut values: [Vec<f64>; 4] = Default::default();
    for r in readings {
        let hour = r.timestamp.with_timezone(&offset).hour();
        values[Quadrant::bucket_for_hour(hour).index()].push(r.value);
    }

    let mut coefficients = current;
    let buckets = std::array::from_fn(|i| {
        let quadrant = Quadrant::ALL[i];
        let count = values[i].len();
        let outcome = if count < cfg.min_bucket_readings {
            BucketOutcome::TooFewReadings { count }
        } else {
            let average = mean(&values[i]);
            match correction_factor(average, target, cfg) {
                None => BucketOutcome::WithinTolerance { count, average },
                Some(factor) => {
                    let previous = current.get(quadrant);
                    let adjusted = previous * factor;
                    coefficients.set(quadrant, adjusted);
                    tracing::info!(
                        quadrant = %quadrant,
                        count,
                        average,
                        factor,
                        previous,
                        adjusted,
                        "dosing coefficient adjusted"
                    );
                    BucketOutcome::Adjusted {
                        count,
                        average,
                        factor,
                        previous,
                        adjusted,
                    }
                }
            }
        };
        BucketReport { quadrant, outcome }
    });

    TunerOutcome::Evaluated {
        coefficients,
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32, value: f64) -> GlucoseReading {
        GlucoseReading::new(value, Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap())
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn factor_is_clamped() {
        let cfg = TunerCfg::default();
        assert_eq!(correction_factor(10.0, 6.0, &cfg), Some(0.8));
        assert_eq!(correction_factor(3.0, 6.0, &cfg), Some(1.2));
        assert_eq!(correction_factor(6.5, 6.0, &cfg), None);
        assert_eq!(correction_factor(7.0, 6.0, &cfg), Some(6.0 / 7.0));
    }

    #[test]
    fn too_few_readings_overall() {
        let readings: Vec<_> = (0..4).map(|_| at(8, 12.0)).collect();
        let out = tune(&readings, 6.0, QuadrantCoefficients::default(), &TunerCfg::default(), utc());
        assert_eq!(
            out,
            TunerOutcome::InsufficientData {
                readings: 4,
                required: 5
            }
        );
        assert!(!out.any_adjusted());
    }

    #[test]
    fn sparse_bucket_is_left_alone() {
        let mut readings: Vec<_> = (0..4).map(|_| at(8, 12.0)).collect();
        readings.push(at(13, 20.0));
        readings.push(at(14, 20.0));
        let out = tune(&readings, 6.0, QuadrantCoefficients::default(), &TunerCfg::default(), utc());
        let TunerOutcome::Evaluated { coefficients, buckets } = out else {
            panic!("expected evaluation");
        };
        assert_eq!(coefficients.afternoon, 1.0);
        assert_eq!(buckets[2].outcome, BucketOutcome::TooFewReadings { count: 2 });
        assert!((coefficients.morning - 0.8).abs() < 1e-12);
    }

    #[test]
    fn late_evening_counts_as_night() {
        let readings: Vec<_> = (0..5).map(|_| at(22, 3.0)).collect();
        let out = tune(&readings, 6.0, QuadrantCoefficients::default(), &TunerCfg::default(), utc());
        let coefficients = out.coefficients().unwrap();
        assert!((coefficients.night - 1.2).abs() < 1e-12);
        assert_eq!(coefficients.evening, 1.0);
    }

    #[test]
    fn offset_shifts_bucket() {
        // 04:00 UTC is 07:00 at +03:00
        let readings: Vec<_> = (0..5).map(|_| at(4, 12.0)).collect();
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let out = tune(&readings, 6.0, QuadrantCoefficients::default(), &TunerCfg::default(), plus3);
        let coefficients = out.coefficients().unwrap();
        assert!((coefficients.morning - 0.8).abs() < 1e-12);
        assert_eq!(coefficients.night, 1.0);
    }
}
