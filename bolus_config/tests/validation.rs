use bolus_config::load_toml;
use rstest::rstest;

const FULL: &str = r#"
[clock]
utc_offset_minutes = 60

[tuner]
window_days = 7
min_readings = 5
min_bucket_readings = 3
tolerance_mmol = 1.0
min_factor = 0.8
max_factor = 1.2

[validation]
tolerance_hours = 0.0

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.clock.utc_offset_minutes, 60);
    assert_eq!(cfg.validation.tolerance_hours, 0.0);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[rstest]
#[case("[tuner]\nwindow_days = 0\n", "window_days must be >= 1")]
#[case("[tuner]\nmin_readings = 0\n", "min_readings must be >= 1")]
#[case("[tuner]\nmin_bucket_readings = 0\n", "min_bucket_readings must be >= 1")]
#[case("[tuner]\ntolerance_mmol = -0.5\n", "tolerance_mmol must be >= 0.0")]
#[case("[tuner]\nmin_factor = 1.1\n", "0.0 < min_factor <= 1.0 <= max_factor")]
#[case("[tuner]\nmax_factor = 0.9\n", "0.0 < min_factor <= 1.0 <= max_factor")]
#[case("[tuner]\nmin_factor = 0.0\n", "0.0 < min_factor <= 1.0 <= max_factor")]
#[case("[clock]\nutc_offset_minutes = 900\n", "utc_offset_minutes must be within")]
#[case("[validation]\ntolerance_hours = -1.0\n", "tolerance_hours must be >= 0.0")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rotation_must_be_a_string() {
    let res = load_toml("[logging]\nrotation = 3\n");
    assert!(res.is_err());
}
