//! Fuzz target for parameter draw files.
//!
//! A parsed file either converts into validated parameters or is rejected;
//! accepted draws must report without panicking.

#![no_main]

use cl_core::{report_draw, ModelParams, ParamsFile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(file) = serde_json::from_slice::<ParamsFile>(data) else {
        return;
    };
    if let Ok(params) = ModelParams::from_file_form(&file, 1e-9) {
        let _ = report_draw(&params);
    }
});
