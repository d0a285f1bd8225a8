//! JSON Schema generation for the input file formats.
//!
//! ```bash
//! catlearn schema data     # data contract
//! catlearn schema params   # one parameter draw
//! ```

use crate::data::RawModelData;
use crate::params::ParamsFile;
use schemars::schema_for;
use serde_json::Value;

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        ("data", "Data contract: sufficient statistics and test trials"),
        ("params", "One parameter draw on the constrained scale"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns `None` if the name is unknown.
pub fn generate_schema(name: &str) -> Option<Value> {
    let schema = match name {
        "data" => schema_for!(RawModelData),
        "params" => schema_for!(ParamsFile),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}
