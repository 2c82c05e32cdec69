//! Remote objectum store.
//!
//! [`Store`] is the seam between the import/export pipelines and the running
//! objectum service. [`HttpStore`] is the real session; tests use an
//! in-memory double that records every call.
//!
//! A store value is one authenticated session with at most one open
//! transaction. Commands construct it, pass it down by `&mut`, and drop it
//! when they finish.

pub mod http;
pub mod schema;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::logs::{log_error, log_warning};
use crate::models::{DictEntry, Model, Resource};

pub use http::HttpStore;
pub use schema::{ModelKey, ModelRow, SchemaCache};

/// Attribute object sent to / received from the store.
pub type Attrs = Map<String, Value>;

/// Operations of the remote store used by this client.
#[async_trait]
pub trait Store: Send {
    /// Open the session's transaction.
    async fn start_transaction(&mut self, description: &str) -> StoreResult<()>;

    async fn commit_transaction(&mut self) -> StoreResult<()>;

    async fn rollback_transaction(&mut self) -> StoreResult<()>;

    /// Create an object; the answer carries at least its `id`.
    async fn create(&mut self, rsc: Resource, attrs: Attrs) -> StoreResult<Attrs>;

    /// Update a model; `attrs.id` is the model id or path.
    async fn update_model(&mut self, attrs: Attrs) -> StoreResult<Attrs>;

    /// Look up a model in the session's schema cache.
    fn find_model(&self, key: &ModelKey) -> Option<&Model>;

    /// All `{id, name}` entries of a dictionary model.
    async fn get_dict(&mut self, model: i64) -> StoreResult<Vec<DictEntry>>;

    /// All records of a model.
    async fn get_records(&mut self, model: &str) -> StoreResult<Vec<Attrs>>;

    /// One page of a model's records.
    async fn get_data(&mut self, model: &str, offset: usize, limit: usize) -> StoreResult<Vec<Attrs>>;

    /// Metadata rows of one resource kind (model, property, query, column).
    async fn list(&mut self, rsc: Resource) -> StoreResult<Vec<Attrs>>;

    fn get_model(&self, key: &ModelKey) -> StoreResult<&Model> {
        self.find_model(key)
            .ok_or_else(|| StoreError::ModelNotFound(key.to_string()))
    }

    async fn create_model(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.create(Resource::Model, attrs).await
    }

    async fn create_property(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.create(Resource::Property, attrs).await
    }

    async fn create_query(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.create(Resource::Query, attrs).await
    }

    async fn create_column(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.create(Resource::Column, attrs).await
    }

    async fn create_record(&mut self, attrs: Attrs) -> StoreResult<Attrs> {
        self.create(Resource::Record, attrs).await
    }
}

/// Commit on success, roll back on error or on a failed commit.
///
/// The error that made the batch fail (or the commit error) is returned even
/// when the rollback itself fails; the rollback failure is only logged.
pub async fn finish_transaction<S, T, E>(store: &mut S, result: Result<T, E>) -> Result<T, E>
where
    S: Store + ?Sized,
    E: From<StoreError>,
{
    match result {
        Ok(value) => match store.commit_transaction().await {
            Ok(()) => Ok(value),
            Err(commit) => {
                rollback(store).await;
                Err(commit.into())
            }
        },
        Err(e) => {
            rollback(store).await;
            Err(e)
        }
    }
}

async fn rollback<S: Store + ?Sized>(store: &mut S) {
    match store.rollback_transaction().await {
        Ok(()) => log_warning("Transaction rolled back"),
        Err(e) => log_error(format!("Rollback failed: {}", e)),
    }
}

/// The `id` of an object returned by the store.
pub fn created_id(created: &Attrs) -> StoreResult<i64> {
    created
        .get("id")
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .ok_or_else(|| StoreError::InvalidResponse("created object has no id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::memory::{Call, MemoryStore};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_finish_commits_on_success() {
        let mut store = MemoryStore::new();
        store.start_transaction("test").await.unwrap();

        let value = finish_transaction::<_, _, StoreError>(&mut store, Ok(7)).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(
            store.transaction_calls(),
            vec![&Call::StartTransaction("test".into()), &Call::Commit]
        );
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let mut store = MemoryStore::new().failing_commit();
        store.start_transaction("test").await.unwrap();

        let err = finish_transaction::<_, (), StoreError>(&mut store, Ok(())).await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(_)));
        assert_eq!(
            store.transaction_calls(),
            vec![
                &Call::StartTransaction("test".into()),
                &Call::Commit,
                &Call::Rollback
            ]
        );
        assert!(!store.in_transaction());
    }

    #[tokio::test]
    async fn test_batch_error_rolls_back() {
        let mut store = MemoryStore::new();
        store.start_transaction("test").await.unwrap();

        let result: Result<(), StoreError> = Err(StoreError::Remote("boom".into()));
        let err = finish_transaction(&mut store, result).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(store.count(&Call::Rollback), 1);
        assert_eq!(store.count(&Call::Commit), 0);
    }

    #[test]
    fn test_created_id() {
        let created = json!({"id": 1042, "name": "x"});
        assert_eq!(created_id(created.as_object().unwrap()).unwrap(), 1042);

        let created = json!({"id": "77"});
        assert_eq!(created_id(created.as_object().unwrap()).unwrap(), 77);

        let created = json!({"name": "x"});
        assert!(created_id(created.as_object().unwrap()).is_err());
    }
}
