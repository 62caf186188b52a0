use std::path::Path;

use bolus_core::mocks::{FixedEstimator, NoEstimator};
use bolus_core::{
    Engine, EngineCfg, EngineError, GlucoseStatus, MemoryStore, Period, PeriodKind, PeriodSet,
    ProjectionLoss, ReadingQuery, SettingsError, Settings, Store, StoreError, TunerOutcome,
};
use bolus_traits::{Clock, ManualClock};
use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};

const USER: &str = "alice";

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 7, 0, 0).unwrap()
}

type TestEngine<E> = Engine<MemoryStore, ManualClock, E>;

#[fixture]
fn clock() -> ManualClock {
    ManualClock::new(morning())
}

fn engine_with<E: bolus_traits::CarbEstimator>(clock: &ManualClock, estimator: E) -> TestEngine<E> {
    Engine::new(MemoryStore::new(), clock.clone(), estimator, EngineCfg::default())
}

/// Store `n` readings of `value`, ten minutes apart, starting at the clock's time.
fn ingest_series<E: bolus_traits::CarbEstimator>(
    engine: &TestEngine<E>,
    clock: &ManualClock,
    n: usize,
    value: f64,
) {
    for _ in 0..n {
        engine.ingest_reading(USER, value, None).unwrap();
        clock.advance(TimeDelta::minutes(10));
    }
}

#[rstest]
fn unknown_user_gets_unsaved_defaults(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let s = engine.settings(USER).unwrap();
    assert_eq!(s.target_min, 4.0);
    assert_eq!(s.dosing.len(), 4);
    assert_eq!(engine.store().settings(USER).unwrap(), None);
}

#[rstest]
fn first_reading_creates_user(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let out = engine.ingest_reading(USER, 5.5, Some("meter".into())).unwrap();
    assert_eq!(out.status, GlucoseStatus::Normal);
    assert_eq!(out.reading.timestamp, morning());
    assert!(!out.coefficients_adjusted);
    assert!(matches!(
        out.tuner,
        Some(TunerOutcome::InsufficientData { readings: 1, .. })
    ));
    assert!(engine.store().settings(USER).unwrap().is_some());
}

#[rstest]
#[case(0.0)]
#[case(-3.0)]
#[case(f64::NAN)]
fn rejects_nonsense_readings(clock: ManualClock, #[case] value: f64) {
    let engine = engine_with(&clock, NoEstimator);
    let err = engine.ingest_reading(USER, value, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::InvalidReading(_))
    ));
    assert_eq!(engine.store().user_count(), 0);
}

#[rstest]
fn high_morning_readings_lower_morning_coefficient(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    // defaults: target 4.0, morning coefficient 1.2
    ingest_series(&engine, &clock, 4, 12.0);
    let out = engine.ingest_reading(USER, 12.0, None).unwrap();
    assert!(out.coefficients_adjusted);
    assert_eq!(out.status, GlucoseStatus::High);

    let stored = engine.store().settings(USER).unwrap().unwrap();
    assert_eq!(stored.updated_at, Some(clock.now()));
    let morning = stored.dosing.resolve(7).coefficient();
    assert!((morning - 1.2 * 0.8).abs() < 1e-9);
    // other quadrants keep their defaults
    assert_eq!(stored.dosing.resolve(2).coefficient(), 1.0);
    assert_eq!(stored.dosing.resolve(20).coefficient(), 0.8);
}

#[rstest]
fn on_target_readings_do_not_rewrite_settings(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    ingest_series(&engine, &clock, 5, 4.5);
    let stored = engine.store().settings(USER).unwrap().unwrap();
    assert_eq!(stored.updated_at, None);
    assert_eq!(stored.dosing.resolve(7).coefficient(), 1.2);
}

#[rstest]
fn evaluated_run_normalises_custom_schedule_to_quadrants(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let settings = Settings {
        dosing: PeriodSet::new(
            PeriodKind::DosingCoefficient,
            vec![Period::new(0.0, 24.0, 1.0)],
        ),
        ..Settings::default()
    };
    engine.update_settings(USER, settings).unwrap();

    // 4.2 is within tolerance of the 4.0 target, so no bucket moves
    ingest_series(&engine, &clock, 4, 4.2);
    let out = engine.ingest_reading(USER, 4.2, None).unwrap();
    assert!(!out.tuner.as_ref().unwrap().any_adjusted());
    assert!(out.coefficients_adjusted);

    let stored = engine.store().settings(USER).unwrap().unwrap();
    assert_eq!(stored.dosing.len(), 4);
    for hour in 0..24 {
        assert_eq!(stored.dosing.resolve(hour).coefficient(), 1.0);
    }

    // already in quadrant form: the next run leaves it alone
    clock.advance(TimeDelta::minutes(10));
    let out = engine.ingest_reading(USER, 4.2, None).unwrap();
    assert!(!out.coefficients_adjusted);
}

#[rstest]
fn readings_outside_window_are_ignored(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    ingest_series(&engine, &clock, 4, 12.0);
    clock.advance(TimeDelta::days(8));
    let out = engine.ingest_reading(USER, 12.0, None).unwrap();
    assert!(matches!(
        out.tuner,
        Some(TunerOutcome::InsufficientData { readings: 1, required: 5 })
    ));
}

#[rstest]
fn custom_periods_report_projection_loss(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let settings = Settings {
        dosing: PeriodSet::new(
            PeriodKind::DosingCoefficient,
            vec![Period::new(0.0, 8.0, 1.0), Period::new(8.0, 16.0, 1.1)],
        ),
        ..Settings::default()
    };
    engine.update_settings(USER, settings).unwrap();
    let out = engine.ingest_reading(USER, 5.0, None).unwrap();
    assert!(out
        .projection_losses
        .iter()
        .any(|l| matches!(l, ProjectionLoss::Straddles { index: 1, .. })));
}

#[rstest]
fn invalid_settings_are_not_stored(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let settings = Settings {
        sensitivity: PeriodSet::new(PeriodKind::Sensitivity, vec![Period::new(0.0, 20.0, 2.0)]),
        ..Settings::default()
    };
    let err = engine.update_settings(USER, settings).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettingsError>(),
        Some(SettingsError::Coverage {
            kind: PeriodKind::Sensitivity,
            ..
        })
    ));
    assert_eq!(engine.store().settings(USER).unwrap(), None);
}

#[rstest]
fn strict_tiling_rejects_overlap(clock: ManualClock) {
    let cfg = EngineCfg {
        strict_tiling: true,
        ..EngineCfg::default()
    };
    let engine = Engine::new(MemoryStore::new(), clock.clone(), NoEstimator, cfg);
    let settings = Settings {
        carb_ratio: PeriodSet::new(
            PeriodKind::CarbRatio,
            vec![Period::new(0.0, 14.0, 10.0), Period::new(12.0, 10.0, 12.0)],
        ),
        ..Settings::default()
    };
    // sums to 24 so the lenient check alone would accept it
    assert!(engine.update_settings(USER, settings).is_err());
}

#[rstest]
fn dose_uses_local_hour(clock: ManualClock) {
    // 07:00 UTC is 20:00 at +13:00, the evening quadrant
    let cfg = EngineCfg {
        utc_offset: FixedOffset::east_opt(13 * 3600).unwrap(),
        ..EngineCfg::default()
    };
    let engine = Engine::new(MemoryStore::new(), clock.clone(), NoEstimator, cfg);
    let plan = engine.dose(USER, 10.0, None, 0.0).unwrap();
    assert_eq!(plan.active_dosing_coefficient, 0.8);
    assert!((plan.total_insulin - 8.0).abs() < 1e-9);
}

#[rstest]
fn dose_rejects_negative_carbs(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    assert!(engine.dose(USER, -1.0, None, 0.0).is_err());
}

#[rstest]
fn meal_analysis_corrects_with_latest_reading(clock: ManualClock) {
    let engine = engine_with(&clock, FixedEstimator::carbs(30.0));
    engine.ingest_reading(USER, 8.0, None).unwrap();
    clock.advance(TimeDelta::minutes(5));
    let meal = engine
        .analyze_meal(USER, Path::new("plate.jpg"), Some(250.0), 0.0)
        .unwrap();
    assert_eq!(meal.current_bg, Some(8.0));
    assert_eq!(meal.estimate.carbs, 30.0);
    // morning: 30 g / 1.0 * 1.2 = 36, plus (8 - 4) / 2 = 2
    assert!((meal.dose.meal_insulin - 36.0).abs() < 1e-9);
    assert!((meal.dose.correction_insulin - 2.0).abs() < 1e-9);
}

#[rstest]
fn meal_analysis_surfaces_estimator_failure(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let err = engine
        .analyze_meal(USER, Path::new("plate.jpg"), None, 0.0)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Estimator(_))
    ));
}

#[rstest]
fn delete_reading_by_timestamp(clock: ManualClock) {
    let engine = engine_with(&clock, NoEstimator);
    let first = engine.ingest_reading(USER, 6.0, None).unwrap();
    clock.advance(TimeDelta::minutes(5));
    engine.ingest_reading(USER, 7.0, None).unwrap();

    let removed = engine.delete_reading(USER, first.reading.timestamp).unwrap();
    assert_eq!(removed.value, 6.0);
    let left = engine.readings(USER, &ReadingQuery::default()).unwrap();
    assert_eq!(left.len(), 1);

    let err = engine.delete_reading(USER, first.reading.timestamp).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::ReadingNotFound(_))
    ));
}

#[rstest]
fn concurrent_ingests_for_one_user_match_serial_run(clock: ManualClock) {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 5;

    let serial = engine_with(&clock, NoEstimator);
    for _ in 0..THREADS * PER_THREAD {
        serial.ingest_reading(USER, 12.0, None).unwrap();
    }

    let concurrent = engine_with(&clock, NoEstimator);
    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    concurrent.ingest_reading(USER, 12.0, None).unwrap();
                }
            });
        }
    });

    let stored = concurrent.readings(USER, &ReadingQuery::default()).unwrap();
    assert_eq!(stored.len(), THREADS * PER_THREAD);

    // every ingest from the fifth on scales morning by 0.8; a lost update would skip one
    let expected = serial.settings(USER).unwrap().dosing.resolve(7).coefficient();
    let got = concurrent.settings(USER).unwrap().dosing.resolve(7).coefficient();
    assert!((expected - 1.2 * 0.8f64.powi(16)).abs() < 1e-12, "{expected}");
    assert!((got - expected).abs() < 1e-12, "{got} vs {expected}");
}
