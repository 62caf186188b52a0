//! Human-readable error descriptions and structured JSON error formatting.

use bolus_core::error::{DoseError, EngineError, SettingsError, StoreError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(se) = err.downcast_ref::<SettingsError>() {
        return match se {
            SettingsError::Empty { kind } => format!(
                "What happened: The {kind} period list is empty.\nLikely causes: The settings document omits the array or it is [].\nHow to fix: Add periods that together cover all 24 hours."
            ),
            SettingsError::Coverage { kind, message, .. } => format!(
                "What happened: The {kind} periods do not cover the day ({message}).\nLikely causes: A period was added, removed or resized without adjusting its neighbours.\nHow to fix: Make the durations add up to exactly 24 hours, then rerun `bolus validate`."
            ),
            SettingsError::InvalidPeriod {
                kind,
                index,
                reason,
            } => format!(
                "What happened: {kind} period #{index} is invalid ({reason}).\nLikely causes: A zero or negative value, or a start time outside 00:00-23:59.\nHow to fix: Correct that entry in the settings document."
            ),
            SettingsError::Target(msg) => format!(
                "What happened: Invalid target range ({msg}).\nLikely causes: targetMin is zero or above targetMax.\nHow to fix: Set 0 < targetMin <= targetMax in the settings document."
            ),
            SettingsError::IobDuration(v) => format!(
                "What happened: Insulin action duration {v} h is not usable.\nLikely causes: iobDuration missing or zero.\nHow to fix: Set iobDuration to a positive number of hours."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DoseError>() {
        return match de {
            DoseError::Carbs(v) => format!(
                "What happened: Carbohydrate amount {v} g was rejected.\nHow to fix: Pass --carbs with a value of 0 or more."
            ),
            DoseError::InsulinOnBoard(v) => format!(
                "What happened: Insulin on board {v} U was rejected.\nHow to fix: Pass --iob with a value of 0 or more."
            ),
            DoseError::CarbRatio(_) | DoseError::Sensitivity(_) => format!(
                "What happened: {de}.\nLikely causes: The period active at this hour has a zero or missing value.\nHow to fix: Fix the carbRatioPeriods / sensitivityPeriods in the settings document."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::InvalidReading(v) => format!(
                "What happened: Glucose value {v} was rejected.\nHow to fix: Pass a positive value in mmol/L."
            ),
            EngineError::Estimator(msg) => format!(
                "What happened: Carbohydrate estimation failed ({msg}).\nHow to fix: Enter the carbohydrate amount manually with `bolus dose --carbs`."
            ),
        };
    }

    if let Some(st) = err.downcast_ref::<StoreError>() {
        return format!(
            "What happened: {st}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from config or input files
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("readings csv must have headers") {
        return "Invalid headers in readings CSV. Expected 'timestamp,value' or 'timestamp,value,source'.".to_string();
    }

    if lower.contains("invalid csv row") {
        return format!(
            "What happened: A readings CSV row could not be used ({err:#}).\nLikely causes: A timestamp that is not RFC 3339, or a non-positive glucose value.\nHow to fix: Correct or remove the row."
        );
    }

    if lower.contains("parse settings") || lower.contains("start time") {
        return format!(
            "What happened: The settings document could not be read ({err:#}).\nLikely causes: Malformed JSON/TOML, a missing field, or a startTime not in HH:MM.\nHow to fix: Compare the file with the documented settings shape."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid ({err:#}).\nLikely causes: Out-of-range values in [clock], [tuner] or [validation].\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes per error family. Usage errors exit with 2 via clap.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<SettingsError>().is_some() {
        return 3;
    }
    if err.downcast_ref::<DoseError>().is_some() {
        return 4;
    }
    if err.downcast_ref::<EngineError>().is_some() {
        return 5;
    }
    if err.downcast_ref::<StoreError>().is_some() {
        return 6;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = err.downcast_ref::<SettingsError>() {
        return match se {
            SettingsError::Empty { .. } => "EmptyPeriods",
            SettingsError::Coverage { .. } => "Coverage",
            SettingsError::InvalidPeriod { .. } => "InvalidPeriod",
            SettingsError::Target(_) => "TargetRange",
            SettingsError::IobDuration(_) => "IobDuration",
        };
    }
    if let Some(de) = err.downcast_ref::<DoseError>() {
        return match de {
            DoseError::Carbs(_) => "Carbs",
            DoseError::CarbRatio(_) => "CarbRatio",
            DoseError::Sensitivity(_) => "Sensitivity",
            DoseError::InsulinOnBoard(_) => "InsulinOnBoard",
        };
    }
    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::InvalidReading(_) => "InvalidReading",
            EngineError::Estimator(_) => "Estimator",
        };
    }
    if err.downcast_ref::<StoreError>().is_some() {
        return "Store";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);
    match err.downcast_ref::<SettingsError>() {
        Some(SettingsError::Coverage {
            kind, total_hours, ..
        }) => json!({
            "reason": reason,
            "details": { "kind": kind.to_string(), "total_hours": total_hours },
            "message": msg,
        }),
        Some(SettingsError::InvalidPeriod { kind, index, .. }) => json!({
            "reason": reason,
            "details": { "kind": kind.to_string(), "index": index },
            "message": msg,
        }),
        _ => json!({ "reason": reason, "message": msg }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolus_core::PeriodKind;

    #[test]
    fn coverage_error_has_details_in_json() {
        let err: eyre::Report = SettingsError::Coverage {
            kind: PeriodKind::Sensitivity,
            total_hours: 20.0,
            message: "periods cover 20 hours, 4 short of 24".into(),
        }
        .into();
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Coverage");
        assert_eq!(v["details"]["kind"], "sensitivity");
        assert_eq!(v["details"]["total_hours"], 20.0);
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn wrapped_dose_error_keeps_exit_code() {
        let err = eyre::Report::from(DoseError::Carbs(-1.0)).wrap_err("dose");
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("--carbs"));
    }

    #[test]
    fn untyped_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert_eq!(reason_name(&err), "Error");
        assert!(humanize(&err).contains("Original: boom"));
    }
}
