//! Row Mapper: raw field values to store attributes.
//!
//! Rules, applied to every field of a row in order:
//!
//! 1. null, empty and blank strings are dropped
//! 2. arrays become their items joined by `\n`
//! 3. `{"_ref": token}` becomes the id created for that token
//! 4. other objects become tab-indented JSON text
//! 5. text of a numeric property is cleaned and parsed as a number
//! 6. text of a dictionary property is looked up by name
//! 7. file properties keep the file name and queue the attachment

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use super::dictionary::DictionaryResolver;
use super::{ReferenceMap, MODEL_KEY, REF_KEY};
use crate::error::{ImportError, ImportResult};
use crate::models::{Model, Property, PropertyKind};
use crate::store::Attrs;

/// Everything but digits, letters, `.` and `,`.
static NUMBER_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-zA-Z.,]").expect("Invalid number pattern"));

/// A decimal number, optionally followed by a letter-only unit.
/// Exponents (`1e5`) do not match and are rejected.
static NUMBER_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)[a-zA-Z]*$").expect("Invalid number pattern"));

/// A mapped row: attributes for the store plus the file properties whose
/// content still has to be copied once the record id is known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
    pub attrs: Attrs,
    pub files: Vec<Property>,
}

/// Applies the mapping rules against an optional model.
///
/// Without a model (schema commands in a JSON document) only the structural
/// rules 1 to 4 apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMapper<'a> {
    model: Option<&'a Model>,
    dictionaries: Option<&'a DictionaryResolver>,
}

impl<'a> RowMapper<'a> {
    pub fn new(model: Option<&'a Model>) -> Self {
        Self {
            model,
            dictionaries: None,
        }
    }

    pub fn with_dictionaries(mut self, dictionaries: &'a DictionaryResolver) -> Self {
        self.dictionaries = Some(dictionaries);
        self
    }

    /// Map every field of one row. `_ref` and `_model` keys are left to the
    /// batch driver.
    pub fn map_fields<K, I>(&self, fields: I, refs: &ReferenceMap, line: usize) -> ImportResult<MappedRow>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut row = MappedRow::default();
        for (code, value) in fields {
            let code = code.as_ref();
            if code == REF_KEY || code == MODEL_KEY {
                continue;
            }
            let Some(value) = self.map_value(code, value, refs, line)? else {
                continue;
            };
            if let Some(property) = self.property(code).filter(|p| p.is_file()) {
                row.files.push(property.clone());
            }
            row.attrs.insert(code.to_string(), value);
        }
        Ok(row)
    }

    /// Map one field value; `None` means the field is omitted.
    pub fn map_value(
        &self,
        code: &str,
        value: Value,
        refs: &ReferenceMap,
        line: usize,
    ) -> ImportResult<Option<Value>> {
        let value = match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::Array(items) => Value::String(join_lines(&items)),
            Value::Object(object) => match object.get(REF_KEY) {
                Some(token) => {
                    let token = match token {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Value::from(refs.resolve(&token, line)?)
                }
                None => Value::String(to_tab_json(&object)?),
            },
            other => other,
        };

        let Some(property) = self.property(code) else {
            return Ok(Some(value));
        };
        let Value::String(ref text) = value else {
            return Ok(Some(value));
        };

        match property.kind() {
            PropertyKind::Number => parse_number(text)
                .map(Some)
                .ok_or_else(|| ImportError::InvalidNumber {
                    value: text.clone(),
                    property: code.to_string(),
                    line,
                }),
            PropertyKind::Reference(_) => match self.dictionaries {
                Some(dicts) if dicts.is_dictionary(code) => {
                    dicts.resolve(code, text.trim(), line).map(|id| Some(Value::from(id)))
                }
                _ => Ok(Some(
                    text.trim()
                        .parse::<i64>()
                        .map(Value::from)
                        .unwrap_or(value),
                )),
            },
            _ => Ok(Some(value)),
        }
    }

    fn property(&self, code: &str) -> Option<&'a Property> {
        self.model.and_then(|m| m.property(code))
    }
}

/// Array items one per line; strings verbatim, anything else as JSON.
fn join_lines(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON text indented with tabs.
pub fn to_tab_json(object: &Map<String, Value>) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    object.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// `"1 234,56 kg"` -> `1234.56`.
///
/// Separators are stripped and the decimal comma becomes a dot. A trailing
/// unit such as `kg` is allowed; anything else after the number rejects the
/// value. Whole numbers come back as integers.
pub fn parse_number(text: &str) -> Option<Value> {
    let cleaned = NUMBER_NOISE.replace_all(text, "").replace(',', ".");
    let number: f64 = NUMBER_WITH_UNIT.captures(&cleaned)?.get(1)?.as_str().parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Some(Value::from(number as i64))
    } else {
        Some(Value::from(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DictEntry;
    use serde_json::json;

    fn property(id: i64, code: &str, type_id: i64) -> Property {
        Property {
            id,
            model: 1002,
            code: code.into(),
            name: None,
            type_id,
            order: Some(id as f64),
        }
    }

    fn model() -> Model {
        Model {
            id: 1002,
            parent: None,
            name: "Item".into(),
            code: "item".into(),
            path: "item".into(),
            properties: vec![
                property(1, "name", 1),
                property(2, "price", 2),
                property(3, "color", 1001),
                property(4, "owner", 1003),
                property(5, "photo", 5),
            ],
        }
    }

    fn colors() -> DictionaryResolver {
        DictionaryResolver::from_entries(
            "color",
            1001,
            &[
                DictEntry {
                    id: 7,
                    name: Some("Red".into()),
                },
                DictEntry {
                    id: 8,
                    name: Some("Blue".into()),
                },
            ],
        )
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1234,56kg"), Some(json!(1234.56)));
        assert_eq!(parse_number("1 234,56 kg"), Some(json!(1234.56)));
        assert_eq!(parse_number("30"), Some(json!(30)));
        assert_eq!(parse_number(".5"), Some(json!(0.5)));
        assert_eq!(parse_number("xx"), None);
        assert_eq!(parse_number("kg12"), None);
        assert_eq!(parse_number("12 kg"), Some(json!(12)));
    }

    #[test]
    fn test_parse_number_rejects_trailing_garbage() {
        assert_eq!(parse_number("1.234,56"), None);
        assert_eq!(parse_number("12abc34"), None);
        assert_eq!(parse_number("1e5"), None);
        assert_eq!(parse_number("1,5,"), None);
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let model = model();
        let mapper = RowMapper::new(Some(&model));
        let refs = ReferenceMap::new();

        let row = mapper
            .map_fields(
                vec![
                    ("name", json!("Chair")),
                    ("price", json!("  ")),
                    ("owner", Value::Null),
                ],
                &refs,
                1,
            )
            .unwrap();
        assert_eq!(Value::Object(row.attrs), json!({"name": "Chair"}));
    }

    #[test]
    fn test_structural_rules() {
        let mapper = RowMapper::new(None);
        let mut refs = ReferenceMap::new();
        refs.define("m-item", 5001);

        let row = mapper
            .map_fields(
                vec![
                    ("query", json!(["{\"select\": [", "]}"])),
                    ("parent", json!({"_ref": "m-item"})),
                    ("opts", json!({"a": 1})),
                    ("_ref", json!("ignored")),
                ],
                &refs,
                1,
            )
            .unwrap();

        assert_eq!(row.attrs["query"], "{\"select\": [\n]}");
        assert_eq!(row.attrs["parent"], 5001);
        assert_eq!(row.attrs["opts"], "{\n\t\"a\": 1\n}");
        assert!(!row.attrs.contains_key("_ref"));
    }

    #[test]
    fn test_undefined_ref_fails() {
        let mapper = RowMapper::new(None);
        let err = mapper
            .map_value("company", json!({"_ref": "globex"}), &ReferenceMap::new(), 2)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownRef { line: 2, .. }));
    }

    #[test]
    fn test_numeric_field_rejects_garbage() {
        let model = model();
        let mapper = RowMapper::new(Some(&model));
        let err = mapper
            .map_value("price", json!("xx"), &ReferenceMap::new(), 2)
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidNumber { line: 2, .. }));

        // JSON numbers pass through untouched
        let value = mapper
            .map_value("price", json!(9.5), &ReferenceMap::new(), 2)
            .unwrap();
        assert_eq!(value, Some(json!(9.5)));
    }

    #[test]
    fn test_dictionary_and_plain_references() {
        let model = model();
        let dicts = colors();
        let mapper = RowMapper::new(Some(&model)).with_dictionaries(&dicts);
        let refs = ReferenceMap::new();

        assert_eq!(
            mapper.map_value("color", json!("blue"), &refs, 1).unwrap(),
            Some(json!(8))
        );
        assert_eq!(
            mapper.map_value("owner", json!("1042"), &refs, 1).unwrap(),
            Some(json!(1042))
        );

        let err = mapper.map_value("color", json!("Purple"), &refs, 3).unwrap_err();
        assert!(err.to_string().contains("Purple"));
    }

    #[test]
    fn test_file_fields_are_queued() {
        let model = model();
        let mapper = RowMapper::new(Some(&model));

        let row = mapper
            .map_fields(vec![("photo", json!("a.png"))], &ReferenceMap::new(), 1)
            .unwrap();
        assert_eq!(row.attrs["photo"], "a.png");
        assert_eq!(row.files.len(), 1);
        assert_eq!(row.files[0].id, 5);

        let row = mapper
            .map_fields(vec![("photo", json!(""))], &ReferenceMap::new(), 1)
            .unwrap();
        assert!(row.files.is_empty());
    }
}
