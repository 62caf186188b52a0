use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

const SETTINGS: &str = r#"{
  "targetMin": 6.0,
  "targetMax": 8.0,
  "iobDuration": 4.0,
  "insulinPeriods": [
    { "startTime": "00:00", "hours": 6, "coefficient": 1.0 },
    { "startTime": "06:00", "hours": 6, "coefficient": 1.2 },
    { "startTime": "12:00", "hours": 6, "coefficient": 1.0 },
    { "startTime": "18:00", "hours": 6, "coefficient": 1.1 }
  ],
  "sensitivityPeriods": [
    { "startTime": "00:00", "hours": 24, "sensitivity": 2.0 }
  ],
  "carbRatioPeriods": [
    { "startHour": 0, "durationHours": 24, "ratio": 10.0 }
  ]
}"#;

fn write_settings(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("settings.json");
    fs::write(&path, body).unwrap();
    path
}

fn write_readings(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("readings.csv");
    fs::write(&path, body).unwrap();
    path
}

fn bolus() -> Command {
    Command::cargo_bin("bolus").unwrap()
}

/// Table-driven checks of exit codes and human output.
#[rstest]
#[case(&["--help"], false, 0, "Usage:", "stdout")]
#[case(&["resolve", "--hour", "7"], true, 0, "1.2 (period #1)", "stdout")]
#[case(&["resolve", "--hour", "24"], true, 2, "24", "stderr")]
#[case(&["dose", "--carbs", "50", "--bg", "9", "--iob", "2", "--hour", "7"], true, 0, "total insulin:      5.50 U", "stdout")]
#[case(&["dose", "--carbs=-5", "--hour", "7"], true, 4, "--carbs", "stderr")]
#[case(&["dose"], false, 2, "required", "stderr")]
#[case(&["validate"], true, 0, "ok", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] with_settings: bool,
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);

    let mut cmd = bolus();
    cmd.args(args);
    if with_settings {
        cmd.arg("--settings").arg(&settings);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        _ => {
            assert.stderr(predicate::str::contains(needle));
        }
    }
}

#[test]
fn validate_reports_short_coverage() {
    let dir = tempdir().unwrap();
    let short = SETTINGS.replace(
        r#"{ "startTime": "00:00", "hours": 24, "sensitivity": 2.0 }"#,
        r#"{ "startTime": "00:00", "hours": 20, "sensitivity": 2.0 }"#,
    );
    let settings = write_settings(&dir, &short);
    bolus()
        .arg("validate")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("FAIL"))
        .stderr(predicate::str::contains("do not cover the day"));
}

#[test]
fn bad_readings_header_is_explained() {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);
    let csv = write_readings(&dir, "time,mmol\n2024-05-01T07:00:00Z,9.0\n");
    bolus()
        .args(["tune", "--settings"])
        .arg(&settings)
        .arg("--readings")
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid headers in readings CSV"));
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);
    let cfg = dir.path().join("bolus.toml");
    fs::write(&cfg, "[tuner]\nmin_factor = 1.5\n").unwrap();
    bolus()
        .arg("--config")
        .arg(&cfg)
        .args(["resolve", "--hour", "3", "--settings"])
        .arg(&settings)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn tune_write_rewrites_morning_period() {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);
    let csv = write_readings(
        &dir,
        "timestamp,value,source\n\
         2024-05-01T07:00:00Z,9.0,cgm\n\
         2024-05-01T08:00:00Z,9.5,cgm\n\
         2024-05-01T09:00:00Z,10.0,cgm\n\
         2024-05-01T13:00:00Z,6.0,cgm\n\
         2024-05-01T14:00:00Z,6.0,cgm\n",
    );
    bolus()
        .args(["tune", "--write", "--at", "2024-05-01T20:00:00Z", "--settings"])
        .arg(&settings)
        .arg("--readings")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("1.200 -> 0.960"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&settings).unwrap()).unwrap();
    let morning = &written["insulinPeriods"][1];
    assert_eq!(morning["startTime"], "06:00");
    let c = morning["coefficient"].as_f64().unwrap();
    assert!((c - 0.96).abs() < 1e-9, "{c}");
    assert!(written["updatedAt"].is_string());
    // untouched sets survive the rewrite
    assert_eq!(written["carbRatioPeriods"][0]["ratio"], 10.0);
}

#[test]
fn ingest_rejects_non_positive_value() {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);
    bolus()
        .args(["ingest", "--value", "0", "--settings"])
        .arg(&settings)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Glucose value 0 was rejected"));
}

#[test]
fn ingest_classifies_reading() {
    let dir = tempdir().unwrap();
    let settings = write_settings(&dir, SETTINGS);
    bolus()
        .args(["ingest", "--value", "3.2", "--at", "2024-05-01T07:00:00Z", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Low blood sugar (hypoglycemia)"))
        .stdout(predicate::str::contains("tuner skipped: 1 readings in window, 5 required"));
}
