//! Request handling on top of the store: settings, readings, doses and the
//! tuner cycle that follows every stored reading.

use std::path::Path;

use bolus_traits::{CarbEstimate, CarbEstimator, Clock};
use chrono::{DateTime, Utc};

use crate::calculator::{DoseBreakdown, DoseRequest, plan_dose};
use crate::config::EngineCfg;
use crate::error::{EngineError, Result, StoreError};
use crate::period::{PeriodKind, PeriodSet};
use crate::quadrants::{ProjectionLoss, QuadrantCoefficients, same_schedule};
use crate::settings::{GlucoseReading, GlucoseStatus, Settings};
use crate::store::{ReadingQuery, Store};
use crate::tuner::{TunerOutcome, tune};

/// Result of storing one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub reading: GlucoseReading,
    pub status: GlucoseStatus,
    /// True when the stored dosing periods were rewritten.
    pub coefficients_adjusted: bool,
    /// Target glucose the tuner aimed for.
    pub target: f64,
    /// `None` when tuning was skipped because no target is set.
    pub tuner: Option<TunerOutcome>,
    /// Information lost folding the stored dosing periods onto quadrants.
    pub projection_losses: Vec<ProjectionLoss>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealDose {
    pub estimate: CarbEstimate,
    /// Newest reading inside the tuner window, used for correction.
    pub current_bg: Option<f64>,
    pub dose: DoseBreakdown,
}

pub struct Engine<S, C, E> {
    store: S,
    clock: C,
    estimator: E,
    cfg: EngineCfg,
}

impl<S, C, E> Engine<S, C, E>
where
    S: Store,
    C: Clock,
    E: CarbEstimator,
{
    pub fn new(store: S, clock: C, estimator: E, cfg: EngineCfg) -> Self {
        Self {
            store,
            clock,
            estimator,
            cfg,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineCfg {
        &self.cfg
    }

    /// Stored settings, or defaults for a user that has none. Defaults are not persisted.
    pub fn settings(&self, user: &str) -> Result<Settings> {
        Ok(self
            .store
            .settings(user)?
            .unwrap_or_default()
            .with_tolerance(self.cfg.tolerance_hours))
    }

    /// Validate and replace the user's settings. Nothing is written on error.
    pub fn update_settings(&self, user: &str, settings: Settings) -> Result<Settings> {
        let mut settings = settings.with_tolerance(self.cfg.tolerance_hours);
        settings.validate_with(self.cfg.strict_tiling)?;
        settings.updated_at = Some(self.clock.now());

        let lock = self.store.record_lock(user)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.store.save_settings(user, settings.clone())?;
        tracing::info!(user, "settings updated");
        Ok(settings)
    }

    /// Store a reading taken now and run one tuning cycle.
    pub fn ingest_reading(&self, user: &str, value: f64, source: Option<String>) -> Result<IngestOutcome> {
        if !(value.is_finite() && value > 0.0) {
            return Err(EngineError::InvalidReading(value).into());
        }
        let now = self.clock.now();
        let lock = self.store.record_lock(user)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut settings = match self.store.settings(user)? {
            Some(s) => s.with_tolerance(self.cfg.tolerance_hours),
            None => {
                let s = Settings::default().with_tolerance(self.cfg.tolerance_hours);
                self.store.save_settings(user, s.clone())?;
                tracing::info!(user, "new user created with default settings");
                s
            }
        };

        let reading = GlucoseReading {
            value,
            timestamp: now,
            source,
        };
        self.store.append_reading(user, reading.clone())?;
        let status = GlucoseStatus::classify(value);
        tracing::debug!(user, value, status = ?status, "reading stored");

        let target = settings.target_bg();
        let mut outcome = IngestOutcome {
            reading,
            status,
            coefficients_adjusted: false,
            target,
            tuner: None,
            projection_losses: Vec::new(),
        };
        if target <= 0.0 {
            return Ok(outcome);
        }

        let window = self
            .store
            .readings(user, &ReadingQuery::since(now - self.cfg.tuner.window()))?;
        let projection = QuadrantCoefficients::from_periods(settings.dosing.periods());
        if !projection.is_lossless() {
            tracing::warn!(
                user,
                losses = projection.losses.len(),
                "dosing periods do not map cleanly onto quadrants"
            );
        }
        let tuned = tune(
            &window,
            target,
            projection.coefficients,
            &self.cfg.tuner,
            self.cfg.utc_offset,
        );

        // Any evaluated run normalises the stored schedule to its quadrant form.
        if let Some(coefficients) = tuned.coefficients() {
            let replacement = coefficients.to_periods();
            if !same_schedule(settings.dosing.periods(), &replacement) {
                settings.dosing = PeriodSet::new(PeriodKind::DosingCoefficient, replacement)
                    .with_tolerance(self.cfg.tolerance_hours);
                settings.updated_at = Some(now);
                self.store.save_settings(user, settings)?;
                outcome.coefficients_adjusted = true;
                tracing::info!(user, ?coefficients, "dosing coefficients persisted");
            }
        }
        outcome.tuner = Some(tuned);
        outcome.projection_losses = projection.losses;
        Ok(outcome)
    }

    pub fn readings(&self, user: &str, query: &ReadingQuery) -> Result<Vec<GlucoseReading>> {
        Ok(self.store.readings(user, query)?)
    }

    pub fn delete_reading(&self, user: &str, at: DateTime<Utc>) -> Result<GlucoseReading> {
        let lock = self.store.record_lock(user)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.store.delete_reading(user, at)?)
    }

    /// Dose at the clock's current local hour.
    pub fn dose(
        &self,
        user: &str,
        carb_grams: f64,
        current_bg: Option<f64>,
        insulin_on_board: f64,
    ) -> Result<DoseBreakdown> {
        let settings = self.settings(user)?;
        let hour = self.clock.local_hour(self.cfg.utc_offset);
        let mut request = DoseRequest::new(carb_grams, hour).with_insulin_on_board(insulin_on_board);
        if let Some(bg) = current_bg {
            request = request.with_current_bg(bg);
        }
        Ok(plan_dose(&request, &settings)?)
    }

    /// Estimate carbs from a photo and dose for them, correcting with the
    /// newest reading in the tuner window when there is one.
    pub fn analyze_meal(
        &self,
        user: &str,
        photo: &Path,
        weight_grams: Option<f64>,
        insulin_on_board: f64,
    ) -> Result<MealDose> {
        let estimate = self
            .estimator
            .estimate(photo, weight_grams)
            .map_err(|e| EngineError::Estimator(e.to_string()))?;
        let since = self.clock.now() - self.cfg.tuner.window();
        let current_bg = self
            .store
            .readings(user, &ReadingQuery::since(since).with_limit(1))?
            .first()
            .map(|r| r.value);
        let dose = self.dose(user, estimate.carbs, current_bg, insulin_on_board)?;
        Ok(MealDose {
            estimate,
            current_bg,
            dose,
        })
    }
}
