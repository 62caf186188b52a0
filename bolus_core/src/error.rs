use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::period::PeriodKind;

/// Rejected settings write. Settings are never persisted in this state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("{kind} periods: no periods defined")]
    Empty { kind: PeriodKind },
    #[error("{kind} periods: {message}")]
    Coverage {
        kind: PeriodKind,
        total_hours: f64,
        message: String,
    },
    #[error("{kind} period #{index}: {reason}")]
    InvalidPeriod {
        kind: PeriodKind,
        index: usize,
        reason: String,
    },
    #[error("invalid target range: {0}")]
    Target(String),
    #[error("iob_duration must be > 0, got {0}")]
    IobDuration(f64),
}

/// Precondition violated by a dose request before any arithmetic ran.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DoseError {
    #[error("carb grams must be finite and >= 0, got {0}")]
    Carbs(f64),
    #[error("active carb ratio must be > 0, got {0}")]
    CarbRatio(f64),
    #[error("active sensitivity must be > 0, got {0}")]
    Sensitivity(f64),
    #[error("insulin on board must be finite and >= 0, got {0}")]
    InsulinOnBoard(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("no reading found at {0}")]
    ReadingNotFound(DateTime<Utc>),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("glucose value must be finite and > 0, got {0}")]
    InvalidReading(f64),
    #[error("carbohydrate estimate failed: {0}")]
    Estimator(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
