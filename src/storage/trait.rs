//! Storage traits shared by every backend.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("duplicate {field} in {collection}")]
    Duplicate { collection: String, field: String },

    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(err.to_string())
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A JSON document living in a named collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// `(field, value)` pairs that must be unique across the collection.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Persistence for one collection of documents.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    /// Store a new document. Fails with `Duplicate` on id or unique-key clashes.
    async fn insert(&self, doc: &T) -> StorageResult<()>;

    async fn get(&self, id: &str) -> StorageResult<Option<T>>;

    /// Overwrite an existing document. Fails with `NotFound` when absent.
    async fn replace(&self, doc: &T) -> StorageResult<()>;

    /// Returns whether a document was removed.
    async fn delete(&self, id: &str) -> StorageResult<bool>;

    async fn list(&self) -> StorageResult<Vec<T>>;

    /// Look a document up by one of its unique keys.
    async fn find_by_key(&self, field: &str, value: &str) -> StorageResult<Option<T>>;

    /// Cheap liveness probe used by the health check.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
