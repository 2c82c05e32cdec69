//! Export pipeline: a running store out to CSV or to an import document.
//!
//! - [`export_csv`] - all records of one model, one row per record
//! - [`export_json`] - user schema (models, properties, queries, columns)
//!   and optionally records, in the shape `import-json` reads back

pub mod csv;
pub mod json;

use serde_json::Value;

pub use self::csv::{export_csv, render_csv, ExportCsvOptions, PAGE_SIZE};
pub use self::json::{build_document, export_json, ExportJsonOptions};

/// Text of a stored value in an exported cell.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// JavaScript-like truthiness: null, `""`, `0` and `false` are empty.
pub(crate) fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!("Alice"))), "Alice");
        assert_eq!(cell_text(Some(&json!(30))), "30");
        assert_eq!(cell_text(Some(&json!(true))), "true");
    }

    #[test]
    fn test_is_set() {
        assert!(!is_set(&json!(null)));
        assert!(!is_set(&json!("")));
        assert!(!is_set(&json!(0)));
        assert!(!is_set(&json!(false)));
        assert!(is_set(&json!(1042)));
        assert!(is_set(&json!("x")));
    }
}
