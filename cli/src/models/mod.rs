//! Domain models of the objectum schema as seen by this client.
//!
//! - [`Model`] - schema node addressed by dotted path or id
//! - [`Property`] - typed field of a model
//! - [`PropertyKind`] - how a property type code coerces values
//! - [`DictEntry`] - `{id, name}` row of a dictionary model
//! - [`Resource`] - the kinds of schema objects the store creates

use serde::{Deserialize, Serialize};

/// Type codes at or above this value reference the model with that id.
/// Models with a lower id are system models.
pub const FIRST_USER_ID: i64 = 1000;

/// Root path of dictionary models.
pub const DICTIONARY_ROOT: &str = "d";

/// Root path of table (tabular part) models.
pub const TABLE_ROOT: &str = "t";

// =============================================================================
// Property
// =============================================================================

/// How a property's type code coerces raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// `1`
    String,
    /// `2` - raw text is cleaned and parsed as a number
    Number,
    /// `3`
    Date,
    /// `4`
    Boolean,
    /// `5` - value is a file name, content goes to `public/files`
    File,
    /// `>= 1000` - id of the referenced model
    Reference(i64),
    /// Any other system type, values pass through
    Other(i64),
}

impl PropertyKind {
    pub fn from_type(type_id: i64) -> Self {
        match type_id {
            1 => Self::String,
            2 => Self::Number,
            3 => Self::Date,
            4 => Self::Boolean,
            5 => Self::File,
            t if t >= FIRST_USER_ID => Self::Reference(t),
            t => Self::Other(t),
        }
    }
}

/// A typed field definition attached to a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: i64,
    /// Owning model id
    pub model: i64,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_id: i64,
    #[serde(default)]
    pub order: Option<f64>,
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        PropertyKind::from_type(self.type_id)
    }

    pub fn is_file(&self) -> bool {
        self.kind() == PropertyKind::File
    }

    /// Referenced model id, if this property points at another model.
    pub fn reference(&self) -> Option<i64> {
        match self.kind() {
            PropertyKind::Reference(id) => Some(id),
            _ => None,
        }
    }
}

// =============================================================================
// Model
// =============================================================================

/// A schema node (entity type).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Model {
    pub id: i64,
    pub parent: Option<i64>,
    pub name: String,
    pub code: String,
    /// Dotted path, e.g. `d.crm.status`
    pub path: String,
    /// Properties ordered by `order`, then id
    pub properties: Vec<Property>,
}

impl Model {
    /// Dictionary models live under the `d` root.
    pub fn is_dictionary(&self) -> bool {
        is_under(&self.path, DICTIONARY_ROOT)
    }

    pub fn property(&self, code: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.code == code)
    }

    /// Insert or replace a property, keeping the ordering.
    pub fn upsert_property(&mut self, property: Property) {
        self.properties.retain(|p| p.id != property.id);
        self.properties.push(property);
        self.properties.sort_by(|a, b| {
            let oa = a.order.unwrap_or(f64::MAX);
            let ob = b.order.unwrap_or(f64::MAX);
            oa.partial_cmp(&ob)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
    }
}

fn is_under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Capitalise the first letter of a code: `crm` -> `Crm`.
pub fn name_from_code(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Dictionary entry
// =============================================================================

/// One `{id, name}` value of a dictionary model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DictEntry {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Resource kinds
// =============================================================================

/// Kinds of objects the store can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Model,
    Property,
    Query,
    Column,
    Record,
}

impl Resource {
    /// Wire name (`rsc`) of the resource.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Property => "property",
            Self::Query => "query",
            Self::Column => "column",
            Self::Record => "record",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
