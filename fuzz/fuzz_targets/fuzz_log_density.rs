//! Fuzz target for the unconstrained log density.
//!
//! Any vector of floats, including non-finite values and wrong lengths, must
//! yield either a finite log density or an error.

#![no_main]

use cl_config::Settings;
use cl_core::{CategoryLearningModel, LogDensity, ModelData};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

const DATA: &str = include_str!("../../crates/cl-core/tests/fixtures/data_basic.json");

fn model() -> &'static CategoryLearningModel {
    static MODEL: OnceLock<CategoryLearningModel> = OnceLock::new();
    MODEL.get_or_init(|| {
        let data = ModelData::from_json_str(DATA, &Settings::default()).expect("fixture data");
        CategoryLearningModel::new(data)
    })
}

fuzz_target!(|theta: Vec<f64>| {
    if let Ok(lp) = model().log_density(&theta) {
        assert!(lp.is_finite());
    }
});
