#![no_main]
use bolus_core::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let doc = match bolus_config::load_settings_json(data) {
        Ok(doc) => doc,
        Err(_) => match bolus_config::load_settings_toml(data) {
            Ok(doc) => doc,
            Err(_) => return,
        },
    };
    if let Ok(settings) = Settings::try_from(&doc) {
        let _ = settings.validate_with(true);
        for hour in 0..24 {
            for set in settings.period_sets() {
                let _ = set.resolve(hour);
            }
        }
    }
});
