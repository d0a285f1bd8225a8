//! Fuzz target for data contract loading.
//!
//! Arbitrary JSON must either validate or produce a `DataError`, never panic
//! and never allocate from an unchecked declared dimension.

#![no_main]

use cl_config::Settings;
use cl_core::{ModelData, RawModelData};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<RawModelData>(data) else {
        return;
    };
    let _ = ModelData::from_raw(&raw, &Settings::default());
});
