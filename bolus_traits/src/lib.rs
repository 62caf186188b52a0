pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::path::Path;

/// Carbohydrate estimate returned by an image-analysis backend.
///
/// Only `carbs` feeds the dosing math; the rest is carried through for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CarbEstimate {
    pub dish: String,
    pub carbs: f64,
    pub confidence: String,
    pub reasoning: String,
}

pub trait CarbEstimator {
    /// Estimate carbohydrates on the plate shown in `photo`.
    /// `weight_grams` is the optional portion weight entered by the user.
    fn estimate(
        &self,
        photo: &Path,
        weight_grams: Option<f64>,
    ) -> Result<CarbEstimate, Box<dyn std::error::Error + Send + Sync>>;
}
