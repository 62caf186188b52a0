//! Per-user settings documents in their stored shape.
//!
//! A period is stored either with a `startTime` ("HH:MM") or a numeric
//! `startHour`, with its length under `hours` (alias `durationHours`). The
//! coefficient field is named after the set it belongs to: `coefficient` for
//! insulin periods, `sensitivity` and `ratio` for the other two.
//!
//! Example (JSON):
//! {
//!   "targetMin": 4.0, "targetMax": 8.0, "iobDuration": 4.0,
//!   "insulinPeriods": [{ "startTime": "00:00", "hours": 24, "coefficient": 1.0 }],
//!   "sensitivityPeriods": [{ "startTime": "00:00", "hours": 24, "sensitivity": 2.0 }],
//!   "carbRatioPeriods": [{ "startHour": 0, "durationHours": 24, "ratio": 10.0 }]
//! }
use std::path::Path;

use chrono::{DateTime, Utc};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};

/// Where a period sits in the day. Shared by all three period kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<f64>,
    #[serde(alias = "durationHours")]
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SpanRecord {
    /// Span starting at a fractional hour, stored as "HH:MM".
    pub fn at(start_hour: f64, hours: f64, label: Option<String>) -> Self {
        Self {
            start_time: Some(format_start_time(start_hour)),
            start_hour: None,
            hours,
            label,
        }
    }

    /// Start of the span in fractional hours. `startHour` wins when both are present.
    pub fn start_hour(&self) -> eyre::Result<f64> {
        if let Some(h) = self.start_hour {
            return Ok(h);
        }
        match self.start_time.as_deref() {
            Some(s) => parse_start_time(s),
            None => eyre::bail!("period needs either startTime or startHour"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulinPeriodRecord {
    #[serde(flatten)]
    pub span: SpanRecord,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPeriodRecord {
    #[serde(flatten)]
    pub span: SpanRecord,
    pub sensitivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbRatioPeriodRecord {
    #[serde(flatten)]
    pub span: SpanRecord,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub target_min: f64,
    pub target_max: f64,
    pub iob_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub insulin_periods: Vec<InsulinPeriodRecord>,
    #[serde(default)]
    pub sensitivity_periods: Vec<SensitivityPeriodRecord>,
    #[serde(default)]
    pub carb_ratio_periods: Vec<CarbRatioPeriodRecord>,
}

/// Parse "HH:MM" into fractional hours (e.g. "06:30" -> 6.5).
pub fn parse_start_time(s: &str) -> eyre::Result<f64> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| eyre::eyre!("start time {s:?} is not HH:MM"))?;
    let h: u32 = h
        .parse()
        .map_err(|e| eyre::eyre!("start time {s:?} has invalid hour: {e}"))?;
    let m: u32 = m
        .parse()
        .map_err(|e| eyre::eyre!("start time {s:?} has invalid minutes: {e}"))?;
    if h > 23 {
        eyre::bail!("start time {s:?} hour must be in 0..=23");
    }
    if m > 59 {
        eyre::bail!("start time {s:?} minutes must be in 0..=59");
    }
    Ok(f64::from(h) + f64::from(m) / 60.0)
}

/// Format fractional hours as "HH:MM", rounding to the nearest minute.
pub fn format_start_time(hour: f64) -> String {
    let total = (hour * 60.0).round().max(0.0) as u32;
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}

pub fn load_settings_json(s: &str) -> eyre::Result<SettingsDoc> {
    serde_json::from_str(s).wrap_err("parse settings JSON")
}

pub fn load_settings_toml(s: &str) -> eyre::Result<SettingsDoc> {
    toml::from_str(s).wrap_err("parse settings TOML")
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// Load a settings document; `.toml` files are read as TOML, anything else as JSON.
pub fn load_settings_file(path: &Path) -> eyre::Result<SettingsDoc> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read settings {:?}: {}", path, e))?;
    let doc = if is_toml(path) {
        load_settings_toml(&text)
    } else {
        load_settings_json(&text)
    };
    doc.wrap_err_with(|| format!("settings file {}", path.display()))
}

/// Write a settings document in the format implied by the file extension.
pub fn save_settings_file(path: &Path, doc: &SettingsDoc) -> eyre::Result<()> {
    let text = if is_toml(path) {
        toml::to_string_pretty(doc).wrap_err("serialize settings TOML")?
    } else {
        serde_json::to_string_pretty(doc).wrap_err("serialize settings JSON")?
    };
    std::fs::write(path, text).map_err(|e| eyre::eyre!("write settings {:?}: {}", path, e))
}
