//! In-session schema cache.
//!
//! The store loads every model and property once after authentication and
//! answers path lookups locally. Objects created or updated through the same
//! session are folded back in, so a path looked up twice in one invocation
//! always gives the same answer.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::models::{Model, Property, Resource};

/// Model row as returned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelRow {
    pub id: i64,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub code: String,
}

/// A model addressed by id or by dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelKey {
    Id(i64),
    Path(String),
}

impl ModelKey {
    /// `"1005"` is an id, anything else a path.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Path(s.trim().to_string()),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Id),
            Value::String(s) => Some(Self::parse(s)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Path(path) => f.write_str(path),
        }
    }
}

impl From<i64> for ModelKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ModelKey {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Models by id plus a path index.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    models: BTreeMap<i64, Model>,
    paths: HashMap<String, i64>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cache from full metadata listings.
    pub fn from_rows(models: Vec<ModelRow>, properties: Vec<Property>) -> Self {
        let mut cache = Self::new();
        for row in models {
            cache.models.insert(row.id, model_from_row(row));
        }
        cache.rebuild_paths();
        for property in properties {
            cache.insert_property(property);
        }
        cache
    }

    pub fn get(&self, key: &ModelKey) -> Option<&Model> {
        match key {
            ModelKey::Id(id) => self.models.get(id),
            ModelKey::Path(path) => self.paths.get(path).and_then(|id| self.models.get(id)),
        }
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Add a freshly created model; its path derives from the cached parent.
    pub fn insert_model(&mut self, row: ModelRow) -> &Model {
        let id = row.id;
        let properties = self
            .models
            .remove(&id)
            .map(|m| m.properties)
            .unwrap_or_default();
        let mut model = model_from_row(row);
        model.properties = properties;
        self.models.insert(id, model);
        self.rebuild_paths();
        &self.models[&id]
    }

    /// Attach a property to its owning model (ignored if the model is unknown).
    pub fn insert_property(&mut self, property: Property) {
        if let Some(model) = self.models.get_mut(&property.model) {
            model.upsert_property(property);
        }
    }

    /// Fold a model or property created through the session back in.
    ///
    /// `created` is what the store answered; `attrs` fills in whatever the
    /// answer left out. Parents and owning models may be given as paths.
    pub fn absorb_created(&mut self, rsc: Resource, attrs: &Map<String, Value>, created: &Map<String, Value>) {
        let mut data = attrs.clone();
        data.extend(created.iter().map(|(k, v)| (k.clone(), v.clone())));

        match rsc {
            Resource::Model => {
                if let Some(row) = self.model_row(&data) {
                    self.insert_model(row);
                }
            }
            Resource::Property => {
                if let Some(property) = self.property_row(&data) {
                    self.insert_property(property);
                }
            }
            _ => {}
        }
    }

    /// Fold a model update back in, on top of the cached row.
    pub fn absorb_update(&mut self, id: i64, attrs: &Map<String, Value>, updated: &Map<String, Value>) {
        let Some(current) = self.models.get(&id) else {
            return;
        };
        let mut data = Map::new();
        data.insert("id".into(), Value::from(current.id));
        data.insert("code".into(), Value::from(current.code.clone()));
        data.insert("name".into(), Value::from(current.name.clone()));
        if let Some(parent) = current.parent {
            data.insert("parent".into(), Value::from(parent));
        }
        data.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        data.extend(updated.iter().map(|(k, v)| (k.clone(), v.clone())));
        data.insert("id".into(), Value::from(id));

        if let Some(row) = self.model_row(&data) {
            self.insert_model(row);
        }
    }

    /// Id of a model given as a number or as a path.
    pub fn resolve_id(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(_) => ModelKey::from_value(value)
                .and_then(|key| self.get(&key))
                .map(|m| m.id),
            _ => None,
        }
    }

    /// Type code of a property given as a code, a type name or a model path.
    pub fn resolve_type(&self, value: &Value) -> Option<i64> {
        match value.as_str() {
            Some("string") => Some(1),
            Some("number") => Some(2),
            Some("date") => Some(3),
            Some("boolean") => Some(4),
            Some("file") => Some(5),
            _ => self.resolve_id(value),
        }
    }

    fn model_row(&self, data: &Map<String, Value>) -> Option<ModelRow> {
        Some(ModelRow {
            id: data.get("id")?.as_i64()?,
            parent: data.get("parent").and_then(|v| self.resolve_id(v)),
            name: data.get("name").and_then(Value::as_str).map(String::from),
            code: data.get("code")?.as_str()?.to_string(),
        })
    }

    fn property_row(&self, data: &Map<String, Value>) -> Option<Property> {
        Some(Property {
            id: data.get("id")?.as_i64()?,
            model: data.get("model").and_then(|v| self.resolve_id(v))?,
            code: data.get("code")?.as_str()?.to_string(),
            name: data.get("name").and_then(Value::as_str).map(String::from),
            type_id: data.get("type").and_then(|v| self.resolve_type(v))?,
            order: data.get("order").and_then(Value::as_f64),
        })
    }

    /// Recompute every path from the parent chain.
    fn rebuild_paths(&mut self) {
        let parents: HashMap<i64, (Option<i64>, String)> = self
            .models
            .values()
            .map(|m| (m.id, (m.parent, m.code.clone())))
            .collect();

        self.paths.clear();
        for model in self.models.values_mut() {
            model.path = path_of(model.id, &parents);
            self.paths.insert(model.path.clone(), model.id);
        }
    }
}

fn model_from_row(row: ModelRow) -> Model {
    Model {
        id: row.id,
        parent: row.parent,
        name: row.name.unwrap_or_default(),
        path: row.code.clone(),
        code: row.code,
        properties: Vec::new(),
    }
}

fn path_of(id: i64, parents: &HashMap<i64, (Option<i64>, String)>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);

    while let Some(id) = current {
        let Some((parent, code)) = parents.get(&id) else {
            break;
        };
        segments.push(code.as_str());
        // cycle guard
        if segments.len() > parents.len() {
            break;
        }
        current = *parent;
    }

    segments.reverse();
    segments.join(".")
}
