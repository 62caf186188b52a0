#![no_main]
use libfuzzer_sys::fuzz_target;

// Config parsing and validation must reject bad input with an error, never a panic.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = bolus_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = bolus_core::EngineCfg::try_from(&cfg);
        }
    }
});
