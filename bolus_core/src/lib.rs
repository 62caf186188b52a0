#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Time-segmented insulin dosing.
//!
//! This crate holds the dosing model and everything that operates on it. Time
//! and carbohydrate estimation come in through `bolus_traits::Clock` and
//! `bolus_traits::CarbEstimator`; persistence goes through [`store::Store`].
//!
//! ## Architecture
//!
//! - **Periods**: day-partitioned coefficients and their sets (`period` module)
//! - **Validation**: 24-hour coverage checks (`validator`)
//! - **Resolution**: which coefficient applies at an hour (`resolver`)
//! - **Dosing**: meal, correction and total insulin (`calculator`)
//! - **Tuning**: quadrant coefficients nudged from glucose history (`tuner`, `quadrants`)
//! - **Engine**: settings, readings and doses for a user (`engine`, `store`)
//!
//! ## Units
//!
//! Glucose is in mmol/L, carbohydrate in grams, insulin in units and time of
//! day in fractional hours `[0, 24)`.

pub mod calculator;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod mocks;
pub mod period;
pub mod quadrants;
pub mod resolver;
pub mod settings;
pub mod store;
pub mod tuner;
pub mod util;
pub mod validator;

pub use calculator::{
    DoseBreakdown, DoseRequest, correction_insulin, meal_insulin, plan_dose,
    sensitivity_from_total_daily_dose, total_insulin,
};
pub use config::{EngineCfg, TunerCfg};
pub use engine::{Engine, IngestOutcome, MealDose};
pub use error::{DoseError, EngineError, Report, Result, SettingsError, StoreError};
pub use period::{Period, PeriodKind, PeriodSet};
pub use quadrants::{Projection, ProjectionLoss, Quadrant, QuadrantCoefficients};
pub use resolver::{DEFAULT_COEFFICIENT, Resolution};
pub use settings::{GlucoseReading, GlucoseStatus, Settings};
pub use store::{MemoryStore, ReadingQuery, Store};
pub use tuner::{BucketOutcome, BucketReport, TunerOutcome, tune};
pub use validator::{HOURS_IN_DAY, HOURS_TOLERANCE, ValidationReport};
