//! HTTP session against a running objectum project.
//!
//! Every call is a `POST` of `{"fn": ..., ...}` to the project URL. After
//! `auth` the session id travels as a bearer token. A reply carrying an
//! `error` string, or a non-2xx status, is a remote error.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::schema::{ModelKey, ModelRow, SchemaCache};
use super::{Attrs, Store};
use crate::config::{ProjectConfig, ADMIN_USERNAME};
use crate::error::{StoreError, StoreResult};
use crate::logs::{log_info, log_success};
use crate::models::{DictEntry, Model, Property, Resource};

/// Authentication reply
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    #[serde(alias = "accessToken", alias = "sid")]
    session_id: String,
}

/// One authenticated session.
pub struct HttpStore {
    client: reqwest::Client,
    url: String,
    session_id: Option<String>,
    schema: SchemaCache,
    in_transaction: bool,
}

impl HttpStore {
    /// Create an unauthenticated client for a project URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            session_id: None,
            schema: SchemaCache::new(),
            in_transaction: false,
        }
    }

    /// Authenticate as `admin` and load the project schema.
    pub async fn connect(config: &ProjectConfig) -> StoreResult<Self> {
        let mut store = Self::new(config.url());
        log_info(format!("Connecting to {}", store.url));

        store.auth(ADMIN_USERNAME, &config.admin_password).await?;
        store.load_schema().await?;

        log_success(format!(
            "Authenticated, {} models loaded",
            store.schema.models().count()
        ));
        Ok(store)
    }

    /// Authenticate and keep the session id.
    pub async fn auth(&mut self, username: &str, password: &str) -> StoreResult<String> {
        let reply = self
            .call(json!({
                "fn": "auth",
                "username": username,
                "password": password,
            }))
            .await
            .map_err(|e| match e {
                StoreError::Remote(message) => StoreError::Auth(message),
                other => other,
            })?;

        let auth: AuthResponse = serde_json::from_value(reply)
            .map_err(|e| StoreError::Auth(format!("no session id in reply: {}", e)))?;

        self.session_id = Some(auth.session_id.clone());
        Ok(auth.session_id)
    }

    /// Reload all models and properties into the schema cache.
    pub async fn load_schema(&mut self) -> StoreResult<()> {
        let models: Vec<ModelRow> = self
            .list(Resource::Model)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)))
            .collect::<Result<_, _>>()?;

        let properties: Vec<Property> = self
            .list(Resource::Property)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)))
            .collect::<Result<_, _>>()?;

        self.schema = SchemaCache::from_rows(models, properties);
        Ok(())
    }

    async fn call(&self, body: Value) -> StoreResult<Value> {
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(ref sid) = self.session_id {
            request = request.bearer_auth(sid);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) if status.is_success() => {
                    return Err(StoreError::InvalidResponse(e.to_string()));
                }
                Err(_) => {
                    let excerpt: String = text.chars().take(500).collect();
                    return Err(StoreError::Remote(format!("HTTP {}: {}", status, excerpt)));
                }
            }
        };

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(StoreError::Remote(message.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Remote(format!("HTTP {}", status)));
        }

        Ok(value)
    }

    async fn call_object(&self, body: Value) -> StoreResult<Attrs> {
        match self.call(body).await? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidResponse(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    async fn call_rows(&self, body: Value) -> StoreResult<Vec<Attrs>> {
        let value = self.call(body).await?;
        rows_from(value)
    }
}

/// Rows of a listing: either a bare array or `{"recs": [...]}`.
fn rows_from(value: Value) -> StoreResult<Vec<Attrs>> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("recs") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(StoreError::InvalidResponse("missing recs".to_string())),
        },
        Value::Null => Vec::new(),
        other => {
            return Err(StoreError::InvalidResponse(format!(
                "expected rows, got {}",
                other
            )))
        }
    };

    rows.into_iter()
        .map(|row| match row {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidResponse(format!(
                "expected a row object, got {}",
                other
            ))),
        })
        .collect()
}

/// Merge `{"fn": .., "rsc": ..}` with an attribute object.
fn request(function: &str, rsc: Resource, attrs: &Attrs) -> Value {
    let mut body = attrs.clone();
    body.insert("fn".into(), Value::from(function));
    body.insert("rsc".into(), Value::from(rsc.as_str()));
    Value::Object(body)
}

#[async_trait]
impl Store for HttpStore {
    async fn start_transaction(&mut self, description: &str) -> StoreResult<()> {
        self.call(json!({"fn": "startTransaction", "description": description}))
            .await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.call(json!({"fn": "commitTransaction"})).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.call(json!({"fn": "rollbackTransaction"})).await?;
        Ok(())
    }

    async fn create(&mut self, rsc: Resource, attrs: Attrs) -> StoreResult<Attrs> {
        let created = self.call_object(request("create", rsc, &attrs)).await?;
        self.schema.absorb_created(rsc, &attrs, &created);
        Ok(created)
    }

    async fn update_model(&mut self, mut attrs: Attrs) -> StoreResult<Attrs> {
        let key = attrs
            .get("id")
            .and_then(ModelKey::from_value)
            .ok_or_else(|| StoreError::ModelNotFound("<missing id>".to_string()))?;
        let id = self.get_model(&key)?.id;
        attrs.insert("id".into(), Value::from(id));

        let updated = self
            .call_object(request("update", Resource::Model, &attrs))
            .await?;
        self.schema.absorb_update(id, &attrs, &updated);
        Ok(updated)
    }

    fn find_model(&self, key: &ModelKey) -> Option<&Model> {
        self.schema.get(key)
    }

    async fn get_dict(&mut self, model: i64) -> StoreResult<Vec<DictEntry>> {
        let rows = self.call_rows(json!({"fn": "getDict", "model": model})).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(StoreError::from))
            .collect()
    }

    async fn get_records(&mut self, model: &str) -> StoreResult<Vec<Attrs>> {
        self.call_rows(json!({"fn": "getRecords", "model": model})).await
    }

    async fn get_data(&mut self, model: &str, offset: usize, limit: usize) -> StoreResult<Vec<Attrs>> {
        self.call_rows(json!({
            "fn": "getData",
            "model": model,
            "offset": offset,
            "limit": limit,
        }))
        .await
    }

    async fn list(&mut self, rsc: Resource) -> StoreResult<Vec<Attrs>> {
        self.call_rows(json!({"fn": "getAll", "rsc": rsc.as_str()})).await
    }
}
