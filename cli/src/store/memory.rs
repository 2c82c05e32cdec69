//! In-memory [`Store`] double recording every call.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::schema::{ModelKey, ModelRow, SchemaCache};
use super::{Attrs, Store};
use crate::error::{StoreError, StoreResult};
use crate::models::{DictEntry, Model, Property, Resource};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartTransaction(String),
    Commit,
    Rollback,
    Create(Resource, Attrs),
    UpdateModel(Attrs),
    GetDict(i64),
    GetRecords(String),
    GetData(String, usize, usize),
    List(Resource),
}

pub struct MemoryStore {
    schema: SchemaCache,
    pub calls: Vec<Call>,
    next_id: i64,
    dicts: HashMap<i64, Vec<DictEntry>>,
    records: HashMap<String, Vec<Attrs>>,
    metadata: HashMap<Resource, Vec<Attrs>>,
    fail_on: Option<(Resource, usize)>,
    fail_commit: bool,
    creates: HashMap<Resource, usize>,
    in_transaction: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            schema: SchemaCache::new(),
            calls: Vec::new(),
            next_id: 5000,
            dicts: HashMap::new(),
            records: HashMap::new(),
            metadata: HashMap::new(),
            fail_on: None,
            fail_commit: false,
            creates: HashMap::new(),
            in_transaction: false,
        }
    }

    pub fn with_model(mut self, id: i64, parent: Option<i64>, code: &str) -> Self {
        self.schema.insert_model(ModelRow {
            id,
            parent,
            name: Some(crate::models::name_from_code(code)),
            code: code.to_string(),
        });
        self
    }

    pub fn with_property(mut self, id: i64, model: i64, code: &str, type_id: i64) -> Self {
        self.schema.insert_property(Property {
            id,
            model,
            code: code.to_string(),
            name: None,
            type_id,
            order: Some(id as f64),
        });
        self
    }

    pub fn with_dict(mut self, model: i64, entries: &[(i64, &str)]) -> Self {
        let entries = entries
            .iter()
            .map(|(id, name)| DictEntry {
                id: *id,
                name: Some(name.to_string()),
            })
            .collect();
        self.dicts.insert(model, entries);
        self
    }

    pub fn with_records(mut self, model: &str, records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        self.records.insert(model.to_string(), records);
        self
    }

    pub fn with_rows(mut self, rsc: Resource, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        self.metadata.insert(rsc, rows);
        self
    }

    /// Make the `nth` (1-based) create of `rsc` fail with a remote error.
    pub fn failing_on(mut self, rsc: Resource, nth: usize) -> Self {
        self.fail_on = Some((rsc, nth));
        self
    }

    /// Make every commit fail, leaving the transaction open.
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn created(&self, rsc: Resource) -> Vec<&Attrs> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Create(r, attrs) if *r == rsc => Some(attrs),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.iter().filter(|c| *c == wanted).count()
    }

    pub fn transaction_calls(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::StartTransaction(_) | Call::Commit | Call::Rollback))
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn start_transaction(&mut self, description: &str) -> StoreResult<()> {
        self.calls.push(Call::StartTransaction(description.to_string()));
        self.in_transaction = true;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> StoreResult<()> {
        self.calls.push(Call::Commit);
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        if self.fail_commit {
            return Err(StoreError::Remote("commit failed".to_string()));
        }
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> StoreResult<()> {
        self.calls.push(Call::Rollback);
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        Ok(())
    }

    async fn create(&mut self, rsc: Resource, attrs: Attrs) -> StoreResult<Attrs> {
        self.calls.push(Call::Create(rsc, attrs.clone()));
        if !self.in_transaction {
            return Err(StoreError::Remote("transaction not started".to_string()));
        }

        let count = self.creates.entry(rsc).or_insert(0);
        *count += 1;
        if self.fail_on == Some((rsc, *count)) {
            return Err(StoreError::Remote(format!("{} create failed", rsc)));
        }

        self.next_id += 1;
        let mut created = attrs.clone();
        created.insert("id".into(), json!(self.next_id));
        self.schema.absorb_created(rsc, &attrs, &created);

        if rsc == Resource::Record {
            let model = attrs
                .get("_model")
                .and_then(|v| self.schema.resolve_id(v))
                .and_then(|id| self.schema.get(&ModelKey::Id(id)))
                .map(|m| m.path.clone())
                .unwrap_or_default();
            self.records.entry(model).or_default().push(created.clone());
        }

        Ok(created)
    }

    async fn update_model(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.calls.push(Call::UpdateModel(attrs.clone()));
        let key = attrs
            .get("id")
            .and_then(ModelKey::from_value)
            .ok_or_else(|| StoreError::ModelNotFound("<missing id>".to_string()))?;
        let id = self.get_model(&key)?.id;
        self.schema.absorb_update(id, &attrs, &Attrs::new());
        Ok(attrs)
    }

    fn find_model(&self, key: &ModelKey) -> Option<&Model> {
        self.schema.get(key)
    }

    async fn get_dict(&mut self, model: i64) -> StoreResult<Vec<DictEntry>> {
        self.calls.push(Call::GetDict(model));
        Ok(self.dicts.get(&model).cloned().unwrap_or_default())
    }

    async fn get_records(&mut self, model: &str) -> StoreResult<Vec<Attrs>> {
        self.calls.push(Call::GetRecords(model.to_string()));
        Ok(self.records.get(model).cloned().unwrap_or_default())
    }

    async fn get_data(&mut self, model: &str, offset: usize, limit: usize) -> StoreResult<Vec<Attrs>> {
        self.calls.push(Call::GetData(model.to_string(), offset, limit));
        Ok(self
            .records
            .get(model)
            .map(|recs| recs.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list(&mut self, rsc: Resource) -> StoreResult<Vec<Attrs>> {
        self.calls.push(Call::List(rsc));
        Ok(self.metadata.get(&rsc).cloned().unwrap_or_default())
    }
}
