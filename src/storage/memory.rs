//! In-memory backend (development and tests)

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::r#trait::{Document, DocumentStore, StorageError, StorageResult};

#[derive(Default)]
struct Inner {
    /// id -> JSON body
    docs: HashMap<String, serde_json::Value>,

    /// (field, value) -> id
    unique: HashMap<(String, String), String>,
}

/// Documents kept as JSON in a map, with a unique-key index.
pub struct MemoryStore<T> {
    inner: Arc<RwLock<Inner>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            _marker: PhantomData,
        }
    }
}

fn owned_keys<T: Document>(doc: &T) -> Vec<(String, String)> {
    doc.unique_keys()
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

impl Inner {
    fn check_unique(&self, collection: &str, id: &str, keys: &[(String, String)]) -> StorageResult<()> {
        for key in keys {
            if let Some(owner) = self.unique.get(key) {
                if owner != id {
                    return Err(StorageError::Duplicate {
                        collection: collection.to_string(),
                        field: key.0.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn unindex(&mut self, id: &str) {
        self.unique.retain(|_, owner| owner != id);
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for MemoryStore<T> {
    async fn insert(&self, doc: &T) -> StorageResult<()> {
        let body = serde_json::to_value(doc)?;
        let keys = owned_keys(doc);
        let mut inner = self.inner.write().await;

        if inner.docs.contains_key(doc.id()) {
            return Err(StorageError::Duplicate {
                collection: T::COLLECTION.to_string(),
                field: "id".to_string(),
            });
        }
        inner.check_unique(T::COLLECTION, doc.id(), &keys)?;

        for key in keys {
            inner.unique.insert(key, doc.id().to_string());
        }
        inner.docs.insert(doc.id().to_string(), body);
        debug!(collection = T::COLLECTION, id = doc.id(), "document inserted");
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        let inner = self.inner.read().await;
        match inner.docs.get(id) {
            Some(body) => Ok(Some(serde_json::from_value(body.clone())?)),
            None => Ok(None),
        }
    }

    async fn replace(&self, doc: &T) -> StorageResult<()> {
        let body = serde_json::to_value(doc)?;
        let keys = owned_keys(doc);
        let mut inner = self.inner.write().await;

        if !inner.docs.contains_key(doc.id()) {
            return Err(StorageError::NotFound {
                collection: T::COLLECTION.to_string(),
                id: doc.id().to_string(),
            });
        }
        inner.check_unique(T::COLLECTION, doc.id(), &keys)?;

        inner.unindex(doc.id());
        for key in keys {
            inner.unique.insert(key, doc.id().to_string());
        }
        inner.docs.insert(doc.id().to_string(), body);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.docs.remove(id).is_some();
        if removed {
            inner.unindex(id);
            debug!(collection = T::COLLECTION, id, "document deleted");
        }
        Ok(removed)
    }

    async fn list(&self) -> StorageResult<Vec<T>> {
        let inner = self.inner.read().await;
        inner
            .docs
            .values()
            .map(|body| serde_json::from_value(body.clone()).map_err(StorageError::from))
            .collect()
    }

    async fn find_by_key(&self, field: &str, value: &str) -> StorageResult<Option<T>> {
        let inner = self.inner.read().await;
        let id = inner.unique.get(&(field.to_string(), value.to_string()));
        match id.and_then(|id| inner.docs.get(id)) {
            Some(body) => Ok(Some(serde_json::from_value(body.clone())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        slug: String,
        body: String,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }

        fn unique_keys(&self) -> Vec<(&'static str, String)> {
            vec![("slug", self.slug.clone())]
        }
    }

    fn note(id: &str, slug: &str) -> Note {
        Note { id: id.into(), slug: slug.into(), body: "hello".into() }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::<Note>::new();
        store.insert(&note("1", "first")).await.unwrap();
        assert_eq!(store.get("1").await.unwrap(), Some(note("1", "first")));
        assert_eq!(store.get("2").await.unwrap(), None);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unique_key_enforced() {
        let store = MemoryStore::<Note>::new();
        store.insert(&note("1", "same")).await.unwrap();
        let err = store.insert(&note("2", "same")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { ref field, .. } if field == "slug"));

        let err = store.insert(&note("1", "other")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { ref field, .. } if field == "id"));
    }

    #[tokio::test]
    async fn test_replace_reindexes_keys() {
        let store = MemoryStore::<Note>::new();
        store.insert(&note("1", "old")).await.unwrap();
        store.replace(&note("1", "new")).await.unwrap();

        assert!(store.find_by_key("slug", "old").await.unwrap().is_none());
        assert!(store.find_by_key("slug", "new").await.unwrap().is_some());
        store.insert(&note("2", "old")).await.unwrap();

        let err = store.replace(&note("9", "x")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_frees_keys() {
        let store = MemoryStore::<Note>::new();
        store.insert(&note("1", "slug")).await.unwrap();
        assert!(store.delete("1").await.unwrap());
        assert!(!store.delete("1").await.unwrap());
        store.insert(&note("2", "slug")).await.unwrap();
    }
}
