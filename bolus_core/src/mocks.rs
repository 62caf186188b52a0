//! Test and helper mocks for bolus_core

use std::path::Path;

use bolus_traits::{CarbEstimate, CarbEstimator};

/// Estimator that returns the same estimate for every photo.
#[derive(Debug, Clone)]
pub struct FixedEstimator(pub CarbEstimate);

impl FixedEstimator {
    pub fn carbs(carbs: f64) -> Self {
        Self(CarbEstimate {
            dish: "test dish".into(),
            carbs,
            confidence: "high".into(),
            reasoning: "fixed".into(),
        })
    }
}

impl CarbEstimator for FixedEstimator {
    fn estimate(
        &self,
        _photo: &Path,
        _weight_grams: Option<f64>,
    ) -> Result<CarbEstimate, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0.clone())
    }
}

/// Estimator with no backend configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEstimator;

impl CarbEstimator for NoEstimator {
    fn estimate(
        &self,
        _photo: &Path,
        _weight_grams: Option<f64>,
    ) -> Result<CarbEstimate, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("no carbohydrate estimator configured")))
    }
}
