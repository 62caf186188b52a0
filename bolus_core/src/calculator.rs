//! Dose arithmetic.
//!
//! The four building blocks are pure and do not guard their denominators:
//! a zero carb ratio or sensitivity yields whatever IEEE-754 produces.
//! [`plan_dose`] is the guarded composition used by request handling.

use crate::error::DoseError;
use crate::resolver::Resolution;
use crate::settings::Settings;

/// Insulin covering a meal: `(carb_grams / carb_ratio) * dosing_coefficient`.
#[inline]
pub fn meal_insulin(carb_grams: f64, carb_ratio: f64, dosing_coefficient: f64) -> f64 {
    (carb_grams / carb_ratio) * dosing_coefficient
}

/// Insulin bringing glucose back to target. Never negative.
#[inline]
pub fn correction_insulin(current_bg: f64, target_bg: f64, sensitivity: f64) -> f64 {
    ((current_bg - target_bg) / sensitivity).max(0.0)
}

/// Meal plus correction minus insulin on board, floored at zero.
#[inline]
pub fn total_insulin(meal_insulin: f64, correction_insulin: f64, insulin_on_board: f64) -> f64 {
    (meal_insulin + correction_insulin - insulin_on_board).max(0.0)
}

/// Sensitivity estimate (mmol/L per unit) from total daily insulin:
/// the 100 rule for mg/dL scaled by 1/18. Seeds a sensitivity, never overrides one.
#[inline]
pub fn sensitivity_from_total_daily_dose(total_daily_insulin: f64) -> f64 {
    100.0 / total_daily_insulin / 18.0
}

/// Inputs at the dose-request boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseRequest {
    pub carb_grams: f64,
    /// Latest glucose (mmol/L). No correction is computed without it.
    pub current_bg: Option<f64>,
    pub insulin_on_board: f64,
    /// Wall-clock hour (0..24) at the moment of calculation.
    pub now_hour: u32,
}

impl DoseRequest {
    pub fn new(carb_grams: f64, now_hour: u32) -> Self {
        Self {
            carb_grams,
            current_bg: None,
            insulin_on_board: 0.0,
            now_hour,
        }
    }

    pub fn with_current_bg(mut self, bg: f64) -> Self {
        self.current_bg = Some(bg);
        self
    }

    pub fn with_insulin_on_board(mut self, iob: f64) -> Self {
        self.insulin_on_board = iob;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseBreakdown {
    pub meal_insulin: f64,
    pub correction_insulin: f64,
    pub total_insulin: f64,
    pub active_dosing_coefficient: f64,
    /// How each of the three sets answered for `now_hour`.
    pub dosing: Resolution,
    pub sensitivity: Resolution,
    pub carb_ratio: Resolution,
}

/// Compose a dose from `settings` at `request.now_hour`.
///
/// Target glucose is `settings.target_min`. Denominators are checked here so
/// the arithmetic above only ever sees positive divisors.
pub fn plan_dose(request: &DoseRequest, settings: &Settings) -> Result<DoseBreakdown, DoseError> {
    if !(request.carb_grams.is_finite() && request.carb_grams >= 0.0) {
        return Err(DoseError::Carbs(request.carb_grams));
    }
    if !(request.insulin_on_board.is_finite() && request.insulin_on_board >= 0.0) {
        return Err(DoseError::InsulinOnBoard(request.insulin_on_board));
    }

    let dosing = settings.dosing.resolve(request.now_hour);
    let sensitivity = settings.sensitivity.resolve(request.now_hour);
    let carb_ratio = settings.carb_ratio.resolve(request.now_hour);

    let ratio = carb_ratio.coefficient();
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(DoseError::CarbRatio(ratio));
    }
    let meal = meal_insulin(request.carb_grams, ratio, dosing.coefficient());

    let correction = match request.current_bg {
        Some(bg) => {
            let isf = sensitivity.coefficient();
            if !(isf.is_finite() && isf > 0.0) {
                return Err(DoseError::Sensitivity(isf));
            }
            correction_insulin(bg, settings.target_min, isf)
        }
        None => 0.0,
    };

    let total = total_insulin(meal, correction, request.insulin_on_board);
    tracing::debug!(
        hour = request.now_hour,
        meal,
        correction,
        total,
        dosing_defaulted = dosing.is_defaulted(),
        "dose planned"
    );
    Ok(DoseBreakdown {
        meal_insulin: meal,
        correction_insulin: correction,
        total_insulin: total,
        active_dosing_coefficient: dosing.coefficient(),
        dosing,
        sensitivity,
        carb_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn meal_insulin_scales_by_coefficient() {
        assert!(close(meal_insulin(50.0, 10.0, 1.2), 6.0));
    }

    #[test]
    fn correction_above_target() {
        assert!(close(correction_insulin(9.0, 6.0, 2.0), 1.5));
    }

    #[test]
    fn correction_below_target_is_zero() {
        assert_eq!(correction_insulin(5.0, 6.0, 2.0), 0.0);
        assert_eq!(correction_insulin(6.0, 6.0, 2.0), 0.0);
    }

    #[test]
    fn total_subtracts_iob_and_floors() {
        assert!(close(total_insulin(6.0, 1.5, 2.0), 5.5));
        assert_eq!(total_insulin(1.0, 0.0, 4.0), 0.0);
    }

    #[test]
    fn sensitivity_from_tdd_matches_rule() {
        assert!(close(sensitivity_from_total_daily_dose(40.0), 100.0 / 40.0 / 18.0));
    }

    #[test]
    fn zero_ratio_propagates_ieee_result() {
        assert!(meal_insulin(10.0, 0.0, 1.0).is_infinite());
    }
}
