//! Subcommand implementations: load documents, call into bolus_core, print.

use std::path::Path;

use bolus_config::{SettingsDoc, load_readings_csv, load_settings_file, save_settings_file};
use bolus_core::mocks::NoEstimator;
use bolus_core::quadrants::same_schedule;
use bolus_core::{
    BucketOutcome, DoseRequest, Engine, EngineCfg, GlucoseReading, IngestOutcome, MemoryStore,
    PeriodKind, PeriodSet, QuadrantCoefficients, Resolution, Settings, Store, TunerOutcome,
    plan_dose, tune,
};
use bolus_traits::{Clock, ManualClock, SystemClock};
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use serde_json::{Value, json};

/// User id for documents that do not carry one.
const LOCAL_USER: &str = "local";

fn load_settings(path: &Path, cfg: &EngineCfg) -> Result<(SettingsDoc, Settings)> {
    let doc = load_settings_file(path)?;
    let settings = Settings::try_from(&doc)
        .wrap_err_with(|| format!("settings file {}", path.display()))?
        .with_tolerance(cfg.tolerance_hours);
    Ok((doc, settings))
}

fn load_history(path: &Path) -> Result<Vec<GlucoseReading>> {
    let rows = load_readings_csv(path)?;
    Ok(rows.iter().map(GlucoseReading::from).collect())
}

fn emit(json_mode: bool, value: &Value, human: &str) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{human}");
    }
}

fn resolution_json(r: &Resolution) -> Value {
    match r {
        Resolution::Matched { index, coefficient } => {
            json!({ "matched": true, "index": index, "coefficient": coefficient })
        }
        Resolution::Defaulted => json!({ "matched": false, "coefficient": r.coefficient() }),
    }
}

fn resolution_text(r: &Resolution) -> String {
    match r {
        Resolution::Matched { index, coefficient } => format!("{coefficient} (period #{index})"),
        Resolution::Defaulted => format!("{} (default, no period covers this hour)", r.coefficient()),
    }
}

fn quadrants_json(q: &QuadrantCoefficients) -> Value {
    json!({
        "night": q.night,
        "morning": q.morning,
        "afternoon": q.afternoon,
        "evening": q.evening,
    })
}

fn tuner_json(out: &TunerOutcome) -> Value {
    match out {
        TunerOutcome::InsufficientData { readings, required } => json!({
            "status": "insufficient_data",
            "readings": readings,
            "required": required,
        }),
        TunerOutcome::Evaluated {
            coefficients,
            buckets,
        } => {
            let buckets: Vec<Value> = buckets
                .iter()
                .map(|b| {
                    let mut v = match b.outcome {
                        BucketOutcome::TooFewReadings { count } => {
                            json!({ "outcome": "too_few_readings", "count": count })
                        }
                        BucketOutcome::WithinTolerance { count, average } => {
                            json!({ "outcome": "within_tolerance", "count": count, "average": average })
                        }
                        BucketOutcome::Adjusted {
                            count,
                            average,
                            factor,
                            previous,
                            adjusted,
                        } => json!({
                            "outcome": "adjusted",
                            "count": count,
                            "average": average,
                            "factor": factor,
                            "previous": previous,
                            "adjusted": adjusted,
                        }),
                    };
                    v["quadrant"] = json!(b.quadrant.label());
                    v
                })
                .collect();
            json!({
                "status": "evaluated",
                "coefficients": quadrants_json(coefficients),
                "buckets": buckets,
            })
        }
    }
}

fn tuner_text(out: &TunerOutcome) -> String {
    match out {
        TunerOutcome::InsufficientData { readings, required } => {
            format!("tuner skipped: {readings} readings in window, {required} required")
        }
        TunerOutcome::Evaluated { buckets, .. } => buckets
            .iter()
            .map(|b| {
                let detail = match b.outcome {
                    BucketOutcome::TooFewReadings { count } => {
                        format!("unchanged ({count} readings)")
                    }
                    BucketOutcome::WithinTolerance { count, average } => {
                        format!("unchanged, average {average:.2} over {count} readings")
                    }
                    BucketOutcome::Adjusted {
                        count,
                        average,
                        factor,
                        previous,
                        adjusted,
                    } => format!(
                        "{previous:.3} -> {adjusted:.3} (x{factor:.3}), average {average:.2} over {count} readings"
                    ),
                };
                format!("{:<9} {detail}", b.quadrant.label())
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn run_validate(cfg: &EngineCfg, json_mode: bool, settings_path: &Path) -> Result<()> {
    let (_, settings) = load_settings(settings_path, cfg)?;
    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for set in settings.period_sets() {
        let report = if cfg.strict_tiling {
            set.validate_tiling()
        } else {
            set.validate()
        };
        rows.push(json!({
            "kind": set.kind().to_string(),
            "ok": report.ok,
            "total_hours": report.total_hours,
            "message": report.message,
        }));
        lines.push(format!(
            "{:<19} {} {}",
            set.kind().to_string(),
            if report.ok { "ok  " } else { "FAIL" },
            report.message
        ));
    }
    emit(json_mode, &json!({ "periods": rows }), &lines.join("\n"));
    settings.validate_with(cfg.strict_tiling)?;
    Ok(())
}

pub fn run_resolve(cfg: &EngineCfg, json_mode: bool, settings_path: &Path, hour: Option<u32>) -> Result<()> {
    let (_, settings) = load_settings(settings_path, cfg)?;
    let hour = hour.unwrap_or_else(|| SystemClock.local_hour(cfg.utc_offset));
    let mut map = serde_json::Map::new();
    let mut lines = vec![format!("hour {hour:02}")];
    for set in settings.period_sets() {
        let r = set.resolve(hour);
        map.insert(set.kind().to_string(), resolution_json(&r));
        lines.push(format!("{:<19} {}", set.kind().to_string(), resolution_text(&r)));
    }
    emit(
        json_mode,
        &json!({ "hour": hour, "resolved": Value::Object(map) }),
        &lines.join("\n"),
    );
    Ok(())
}

pub fn run_dose(
    cfg: &EngineCfg,
    json_mode: bool,
    settings_path: &Path,
    carbs: f64,
    bg: Option<f64>,
    iob: f64,
    hour: Option<u32>,
) -> Result<()> {
    let (_, settings) = load_settings(settings_path, cfg)?;
    settings.validate_with(cfg.strict_tiling)?;
    let hour = hour.unwrap_or_else(|| SystemClock.local_hour(cfg.utc_offset));
    let mut request = DoseRequest::new(carbs, hour).with_insulin_on_board(iob);
    if let Some(bg) = bg {
        request = request.with_current_bg(bg);
    }
    let plan = plan_dose(&request, &settings)?;
    tracing::info!(hour, carbs, total = plan.total_insulin, "dose computed");
    let value = json!({
        "hour": hour,
        "meal_insulin": plan.meal_insulin,
        "correction_insulin": plan.correction_insulin,
        "total_insulin": plan.total_insulin,
        "dosing_coefficient": resolution_json(&plan.dosing),
        "sensitivity": resolution_json(&plan.sensitivity),
        "carb_ratio": resolution_json(&plan.carb_ratio),
    });
    let human = format!(
        "meal insulin:       {:.2} U\ncorrection insulin: {:.2} U\ntotal insulin:      {:.2} U\ncoefficient {} at {hour:02}h",
        plan.meal_insulin,
        plan.correction_insulin,
        plan.total_insulin,
        resolution_text(&plan.dosing)
    );
    emit(json_mode, &value, &human);
    Ok(())
}

/// Replace the dosing periods in `doc` and write it back.
fn write_back(path: &Path, doc: &SettingsDoc, settings: &Settings) -> Result<()> {
    let mut out = SettingsDoc::from(settings);
    out.user_id.clone_from(&doc.user_id);
    save_settings_file(path, &out)?;
    tracing::info!(path = %path.display(), "settings written");
    Ok(())
}

pub fn run_tune(
    cfg: &EngineCfg,
    json_mode: bool,
    settings_path: &Path,
    readings_path: &Path,
    at: Option<DateTime<Utc>>,
    write: bool,
) -> Result<()> {
    let (doc, mut settings) = load_settings(settings_path, cfg)?;
    let history = load_history(readings_path)?;
    let now = at.unwrap_or_else(Utc::now);
    let since = now - cfg.tuner.window();
    let window: Vec<GlucoseReading> = history
        .into_iter()
        .filter(|r| r.timestamp >= since && r.timestamp <= now)
        .collect();

    let projection = QuadrantCoefficients::from_periods(settings.dosing.periods());
    for loss in &projection.losses {
        tracing::warn!(%loss, "dosing periods projected onto quadrants");
    }
    let outcome = tune(
        &window,
        settings.target_bg(),
        projection.coefficients,
        &cfg.tuner,
        cfg.utc_offset,
    );

    let mut written = false;
    if let Some(coefficients) = outcome.coefficients() {
        let replacement = coefficients.to_periods();
        if write && !same_schedule(settings.dosing.periods(), &replacement) {
            settings.dosing = PeriodSet::new(PeriodKind::DosingCoefficient, replacement)
                .with_tolerance(cfg.tolerance_hours);
            settings.updated_at = Some(now);
            write_back(settings_path, &doc, &settings)?;
            written = true;
        }
    }

    let losses: Vec<String> = projection.losses.iter().map(ToString::to_string).collect();
    let value = json!({
        "target": settings.target_bg(),
        "window_readings": window.len(),
        "tuner": tuner_json(&outcome),
        "projection_losses": losses,
        "written": written,
    });
    let mut human = tuner_text(&outcome);
    for l in &losses {
        human.push_str(&format!("\nnote: {l}"));
    }
    if written {
        human.push_str(&format!("\nsettings written to {}", settings_path.display()));
    }
    emit(json_mode, &value, &human);
    Ok(())
}

fn ingest_json(out: &IngestOutcome) -> Value {
    json!({
        "reading": {
            "value": out.reading.value,
            "timestamp": out.reading.timestamp.to_rfc3339(),
            "source": out.reading.source,
        },
        "status": out.status.describe(),
        "coefficients_adjusted": out.coefficients_adjusted,
        "target": out.target,
        "tuner": out.tuner.as_ref().map(tuner_json),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn run_ingest(
    cfg: &EngineCfg,
    json_mode: bool,
    settings_path: &Path,
    readings_path: Option<&Path>,
    value: f64,
    source: Option<String>,
    at: Option<DateTime<Utc>>,
    write: bool,
) -> Result<()> {
    let (doc, settings) = load_settings(settings_path, cfg)?;
    settings.validate_with(cfg.strict_tiling)?;
    let user = doc.user_id.clone().unwrap_or_else(|| LOCAL_USER.to_string());

    let store = MemoryStore::new();
    store.save_settings(&user, settings)?;
    if let Some(path) = readings_path {
        for r in load_history(path)? {
            store.append_reading(&user, r)?;
        }
    }

    let clock = ManualClock::new(at.unwrap_or_else(Utc::now));
    let engine = Engine::new(store, clock, NoEstimator, cfg.clone());
    let outcome = engine.ingest_reading(&user, value, source)?;

    let mut written = false;
    if write && outcome.coefficients_adjusted {
        let updated = engine.settings(&user)?;
        write_back(settings_path, &doc, &updated)?;
        written = true;
    }

    let mut report = ingest_json(&outcome);
    report["written"] = json!(written);
    let mut human = format!(
        "stored {:.1} mmol/L at {}: {}",
        outcome.reading.value,
        outcome.reading.timestamp.to_rfc3339(),
        outcome.status.describe()
    );
    if let Some(t) = &outcome.tuner {
        human.push('\n');
        human.push_str(&tuner_text(t));
    }
    if written {
        human.push_str(&format!("\nsettings written to {}", settings_path.display()));
    }
    emit(json_mode, &report, &human);
    Ok(())
}
