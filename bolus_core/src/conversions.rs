//! Conversions bridging `bolus_config` types to `bolus_core` types.

use bolus_config::{
    CarbRatioPeriodRecord, InsulinPeriodRecord, ReadingRow, SensitivityPeriodRecord, SettingsDoc,
    SpanRecord,
};
use chrono::FixedOffset;
use eyre::WrapErr;

use crate::config::{EngineCfg, TunerCfg};
use crate::period::{Period, PeriodKind, PeriodSet};
use crate::settings::{GlucoseReading, Settings};
use crate::util::fixed_offset;

// ── TunerCfg ─────────────────────────────────────────────────────────────────

impl From<&bolus_config::TunerCfg> for TunerCfg {
    fn from(c: &bolus_config::TunerCfg) -> Self {
        Self {
            window_days: c.window_days,
            min_readings: c.min_readings,
            min_bucket_readings: c.min_bucket_readings,
            tolerance_mmol: c.tolerance_mmol,
            min_factor: c.min_factor,
            max_factor: c.max_factor,
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl TryFrom<&bolus_config::Config> for EngineCfg {
    type Error = eyre::Report;

    fn try_from(c: &bolus_config::Config) -> Result<Self, Self::Error> {
        let utc_offset: FixedOffset = fixed_offset(c.clock.utc_offset_minutes).ok_or_else(|| {
            eyre::eyre!(
                "clock.utc_offset_minutes out of range: {}",
                c.clock.utc_offset_minutes
            )
        })?;
        Ok(Self {
            utc_offset,
            tuner: TunerCfg::from(&c.tuner),
            tolerance_hours: c.validation.tolerance_hours,
            strict_tiling: c.validation.strict_tiling,
        })
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

fn period_from(kind: PeriodKind, index: usize, span: &SpanRecord, value: f64) -> eyre::Result<Period> {
    let start = span
        .start_hour()
        .wrap_err_with(|| format!("{kind} period #{index}"))?;
    let mut p = Period::new(start, span.hours, value);
    p.label = span.label.clone();
    Ok(p)
}

fn span_for(p: &Period) -> SpanRecord {
    let minutes = p.start_hour * 60.0;
    if minutes.fract() == 0.0 {
        SpanRecord::at(p.start_hour, p.duration_hours, p.label.clone())
    } else {
        SpanRecord {
            start_time: None,
            start_hour: Some(p.start_hour),
            hours: p.duration_hours,
            label: p.label.clone(),
        }
    }
}

impl TryFrom<&SettingsDoc> for Settings {
    type Error = eyre::Report;

    /// Structural conversion only; call [`Settings::validate`] before storing.
    fn try_from(doc: &SettingsDoc) -> Result<Self, Self::Error> {
        let dosing = doc
            .insulin_periods
            .iter()
            .enumerate()
            .map(|(i, r)| period_from(PeriodKind::DosingCoefficient, i, &r.span, r.coefficient))
            .collect::<eyre::Result<Vec<_>>>()?;
        let sensitivity = doc
            .sensitivity_periods
            .iter()
            .enumerate()
            .map(|(i, r)| period_from(PeriodKind::Sensitivity, i, &r.span, r.sensitivity))
            .collect::<eyre::Result<Vec<_>>>()?;
        let carb_ratio = doc
            .carb_ratio_periods
            .iter()
            .enumerate()
            .map(|(i, r)| period_from(PeriodKind::CarbRatio, i, &r.span, r.ratio))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self {
            target_min: doc.target_min,
            target_max: doc.target_max,
            iob_duration: doc.iob_duration,
            dosing: PeriodSet::new(PeriodKind::DosingCoefficient, dosing),
            sensitivity: PeriodSet::new(PeriodKind::Sensitivity, sensitivity),
            carb_ratio: PeriodSet::new(PeriodKind::CarbRatio, carb_ratio),
            updated_at: doc.updated_at,
        })
    }
}

impl From<&Settings> for SettingsDoc {
    fn from(s: &Settings) -> Self {
        Self {
            user_id: None,
            target_min: s.target_min,
            target_max: s.target_max,
            iob_duration: s.iob_duration,
            updated_at: s.updated_at,
            insulin_periods: s
                .dosing
                .iter()
                .map(|p| InsulinPeriodRecord {
                    span: span_for(p),
                    coefficient: p.coefficient,
                })
                .collect(),
            sensitivity_periods: s
                .sensitivity
                .iter()
                .map(|p| SensitivityPeriodRecord {
                    span: span_for(p),
                    sensitivity: p.coefficient,
                })
                .collect(),
            carb_ratio_periods: s
                .carb_ratio
                .iter()
                .map(|p| CarbRatioPeriodRecord {
                    span: span_for(p),
                    ratio: p.coefficient,
                })
                .collect(),
        }
    }
}

// ── Readings ─────────────────────────────────────────────────────────────────

impl From<&ReadingRow> for GlucoseReading {
    fn from(r: &ReadingRow) -> Self {
        Self {
            value: r.value,
            timestamp: r.timestamp,
            source: r.source.clone(),
        }
    }
}
