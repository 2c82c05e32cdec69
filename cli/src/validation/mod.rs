//! JSON Schema validation of command input.
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `import-document.json` - the JSON import document
//! - `named-object.json` - `create-dictionary` / `create-table` attributes
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use objectum_cli::validation::validate_import_document;
//!
//! let doc = json!({"createModel": [{"name": "Item", "code": "item"}]});
//! assert!(validate_import_document(&doc).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static IMPORT_DOCUMENT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/import-document.json"))
        .expect("Invalid embedded schema")
});

static NAMED_OBJECT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/named-object.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a draft 7 schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a JSON import document.
pub fn validate_import_document(data: &Value) -> Result<(), Vec<String>> {
    validate(&IMPORT_DOCUMENT_SCHEMA, data)
}

/// Validate attributes that need both `name` and `code`.
pub fn validate_named_object(data: &Value) -> Result<(), Vec<String>> {
    validate(&NAMED_OBJECT_SCHEMA, data)
}
