//! Fuzz target for settings.json parsing and validation.

#![no_main]

use cl_config::{validate_settings, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(settings) = Settings::from_json_str(text) {
        let _ = validate_settings(&settings);
    }
});
