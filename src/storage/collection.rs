use std::sync::Arc;

use serde::Serialize;

use super::r#trait::{Document, DocumentStore, StorageError, StorageResult};

/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Requested page size, or `default`, bounded to `1..=MAX_PAGE_SIZE`.
pub fn page_limit(limit: Option<u64>, default: u64) -> u64 {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    /// Slice an already filtered and sorted result set. `page` is 1-based.
    pub fn from_vec(all: Vec<T>, page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let total = all.len() as u64;
        // past the end, including offsets too large to represent, is an empty page
        let items = match (page - 1).checked_mul(limit) {
            Some(skip) if skip < total => {
                all.into_iter().skip(skip as usize).take(limit as usize).collect()
            }
            _ => Vec::new(),
        };
        Self {
            items,
            total,
            page,
            pages: total.div_ceil(limit),
            limit,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            pages: self.pages,
            limit: self.limit,
        }
    }
}

/// Typed handle on a collection with simple query helpers.
pub struct Collection<T: Document> {
    store: Arc<dyn DocumentStore<T>>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore<T>>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, doc: &T) -> StorageResult<()> {
        self.store.insert(doc).await
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        self.store.get(id).await
    }

    /// Like `get`, but a missing document is an error.
    pub async fn get_required(&self, id: &str) -> StorageResult<T> {
        self.store.get(id).await?.ok_or_else(|| StorageError::NotFound {
            collection: T::COLLECTION.to_string(),
            id: id.to_string(),
        })
    }

    pub async fn replace(&self, doc: &T) -> StorageResult<()> {
        self.store.replace(doc).await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<bool> {
        self.store.delete(id).await
    }

    pub async fn list(&self) -> StorageResult<Vec<T>> {
        self.store.list().await
    }

    pub async fn find_by_key(&self, field: &str, value: &str) -> StorageResult<Option<T>> {
        self.store.find_by_key(field, value).await
    }

    pub async fn find<F>(&self, predicate: F) -> StorageResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.store.list().await?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub async fn find_one<F>(&self, predicate: F) -> StorageResult<Option<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.store.list().await?.into_iter().find(|doc| predicate(doc)))
    }

    pub async fn count<F>(&self, predicate: F) -> StorageResult<u64>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.store.list().await?.iter().filter(|doc| predicate(doc)).count() as u64)
    }

    /// Filter, sort with `compare`, then cut out one page.
    pub async fn paginate<F, C>(
        &self,
        predicate: F,
        compare: C,
        page: u64,
        limit: u64,
    ) -> StorageResult<Page<T>>
    where
        F: Fn(&T) -> bool,
        C: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut matching = self.find(predicate).await?;
        matching.sort_by(compare);
        Ok(Page::from_vec(matching, page, limit))
    }

    pub async fn ping(&self) -> StorageResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        rank: u32,
    }

    impl Document for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &str {
            &self.id
        }
    }

    async fn seeded(n: u32) -> Collection<Item> {
        let collection = Collection::new(Arc::new(MemoryStore::<Item>::new()));
        for rank in 0..n {
            collection
                .insert(&Item { id: format!("i{rank}"), rank })
                .await
                .unwrap();
        }
        collection
    }

    #[test]
    fn test_page_math() {
        let page = Page::from_vec((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 25);

        let empty = Page::from_vec(Vec::<u8>::new(), 1, 10);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn test_page_bounds() {
        let far = Page::from_vec(vec![1, 2, 3], u64::MAX, 2);
        assert!(far.items.is_empty());
        assert_eq!(far.total, 3);
        assert_eq!(far.pages, 2);

        let huge = Page::from_vec((0..250).collect::<Vec<_>>(), 1, u64::MAX);
        assert_eq!(huge.limit, MAX_PAGE_SIZE);
        assert_eq!(huge.items.len(), MAX_PAGE_SIZE as usize);

        assert_eq!(page_limit(None, 20), 20);
        assert_eq!(page_limit(Some(0), 20), 1);
        assert_eq!(page_limit(Some(5_000), 20), MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_find_count_and_paginate() {
        let items = seeded(12).await;
        assert_eq!(items.count(|i| i.rank % 2 == 0).await.unwrap(), 6);
        assert_eq!(items.find_one(|i| i.rank == 7).await.unwrap().unwrap().id, "i7");

        let page = items
            .paginate(|i| i.rank >= 2, |a, b| b.rank.cmp(&a.rank), 1, 5)
            .await
            .unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.items[0].rank, 11);
        assert_eq!(page.items.len(), 5);
    }

    #[tokio::test]
    async fn test_get_required() {
        let items = seeded(1).await;
        assert!(items.get_required("i0").await.is_ok());
        assert!(matches!(
            items.get_required("nope").await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
