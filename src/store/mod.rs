//! Document storage seam. One collection per resource; documents are JSON objects keyed by `id`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::query::{Filter, FindOptions};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// What a store needs to know to prepare a collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    /// Fields with a uniqueness constraint; violations surface as `AppError::Conflict`.
    pub unique_fields: Vec<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the collection and its unique constraints if missing. Idempotent.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), AppError>;

    /// Insert a document. `doc` must contain `id`.
    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), AppError>;

    async fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Vec<Value>, AppError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;

    /// Merge `set` into the first matching document and drop `unset` keys. Returns matched count (0 or 1).
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
        unset: &[String],
    ) -> Result<u64, AppError>;

    /// Remove the first matching document. Returns removed count (0 or 1).
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;

    async fn find_one(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Option<Value>, AppError> {
        let opts = FindOptions {
            limit: Some(1),
            skip: 0,
            ..opts.clone()
        };
        Ok(self.find(collection, filter, &opts).await?.into_iter().next())
    }
}
