//! Dictionary value lookup.
//!
//! A property whose type is a model under `d` holds the id of a dictionary
//! entry. CSV files carry the entry's name instead; the resolver turns names
//! into ids on import (case-insensitive) and ids back into names on export.

use std::collections::HashMap;

use crate::error::{ImportError, ImportResult, StoreResult};
use crate::logs::log_info_indent;
use crate::models::{DictEntry, Model};
use crate::store::{ModelKey, Store};

/// Entries of one dictionary model.
#[derive(Debug, Clone, Default)]
struct DictionaryTable {
    by_name: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl DictionaryTable {
    fn from_entries(entries: &[DictEntry]) -> Self {
        let mut table = Self::default();
        for entry in entries {
            let Some(ref name) = entry.name else {
                continue;
            };
            table.by_name.insert(name.to_lowercase(), entry.id);
            table.by_id.insert(entry.id, name.clone());
        }
        table
    }
}

/// Name/id tables for the dictionary-typed properties of one model.
#[derive(Debug, Clone, Default)]
pub struct DictionaryResolver {
    /// Property code -> referenced dictionary model id
    properties: HashMap<String, i64>,
    /// Dictionary model id -> entries
    tables: HashMap<i64, DictionaryTable>,
}

impl DictionaryResolver {
    /// Fetch the dictionaries referenced by `model`.
    ///
    /// With `codes`, only properties named there are considered. Each
    /// dictionary model is fetched once even when several properties point
    /// at it.
    pub async fn load<S: Store + ?Sized>(
        store: &mut S,
        model: &Model,
        codes: Option<&[String]>,
    ) -> StoreResult<Self> {
        let mut properties = HashMap::new();
        for property in &model.properties {
            if codes.is_some_and(|codes| !codes.contains(&property.code)) {
                continue;
            }
            let Some(target) = property.reference() else {
                continue;
            };
            if store
                .find_model(&ModelKey::Id(target))
                .is_some_and(Model::is_dictionary)
            {
                properties.insert(property.code.clone(), target);
            }
        }

        let mut resolver = Self {
            properties,
            tables: HashMap::new(),
        };
        let mut targets: Vec<i64> = resolver.properties.values().copied().collect();
        targets.sort_unstable();
        targets.dedup();

        for target in targets {
            let entries = store.get_dict(target).await?;
            log_info_indent(format!("dictionary {}: {} entries", target, entries.len()), 1);
            resolver
                .tables
                .insert(target, DictionaryTable::from_entries(&entries));
        }
        Ok(resolver)
    }

    /// Build a resolver from already fetched entries.
    pub fn from_entries(property: &str, model: i64, entries: &[DictEntry]) -> Self {
        let mut resolver = Self::default();
        resolver.properties.insert(property.to_string(), model);
        resolver
            .tables
            .insert(model, DictionaryTable::from_entries(entries));
        resolver
    }

    pub fn is_dictionary(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Id of the entry named `value`, ignoring case.
    pub fn resolve(&self, property: &str, value: &str, line: usize) -> ImportResult<i64> {
        self.properties
            .get(property)
            .and_then(|model| self.tables.get(model))
            .and_then(|table| table.by_name.get(&value.to_lowercase()))
            .copied()
            .ok_or_else(|| ImportError::UnknownDictionaryValue {
                value: value.to_string(),
                property: property.to_string(),
                line,
            })
    }

    /// Name of the entry with `id`.
    pub fn name_of(&self, property: &str, id: i64) -> Option<&str> {
        self.properties
            .get(property)
            .and_then(|model| self.tables.get(model))
            .and_then(|table| table.by_id.get(&id))
            .map(String::as_str)
    }
}
