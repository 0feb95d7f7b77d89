//! SQLite backend: JSON bodies plus a unique-key table.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::marker::PhantomData;
use std::str::FromStr;

use super::r#trait::{Document, DocumentStore, StorageError, StorageResult};

const SCHEMA: &str = include_str!("../../migrations/001_create_documents.sql");

/// Open (creating when missing) the database file and apply the schema.
pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<SqlitePool> {
    tracing::info!("opening document database: {}", database_url);

    let in_memory = database_url.contains(":memory:");
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Unavailable(format!("invalid database url: {e}")))?
        .create_if_missing(true)
        .journal_mode(if in_memory { SqliteJournalMode::Memory } else { SqliteJournalMode::Wal })
        .synchronous(SqliteSynchronous::Normal);

    // every connection to `:memory:` is a separate database
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    tracing::info!("document database ready");
    Ok(pool)
}

/// One collection stored in the shared `documents` table.
pub struct SqliteStore<T> {
    pool: SqlitePool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqliteStore<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, _marker: PhantomData }
    }
}

fn map_unique(err: sqlx::Error, collection: &str, field: &str) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Duplicate {
            collection: collection.to_string(),
            field: field.to_string(),
        },
        _ => StorageError::from(err),
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for SqliteStore<T> {
    async fn insert(&self, doc: &T) -> StorageResult<()> {
        let body = serde_json::to_string(doc)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(T::COLLECTION)
            .bind(doc.id())
            .bind(&body)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, T::COLLECTION, "id"))?;

        for (field, value) in doc.unique_keys() {
            sqlx::query(
                "INSERT INTO unique_keys (collection, field, value, doc_id) VALUES (?, ?, ?, ?)",
            )
            .bind(T::COLLECTION)
            .bind(field)
            .bind(&value)
            .bind(doc.id())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, T::COLLECTION, field))?;
        }

        tx.commit().await?;
        tracing::debug!(collection = T::COLLECTION, id = doc.id(), "document inserted");
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, doc: &T) -> StorageResult<()> {
        let body = serde_json::to_string(doc)?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE documents SET body = ?, updated_at = datetime('now') WHERE collection = ? AND id = ?",
        )
        .bind(&body)
        .bind(T::COLLECTION)
        .bind(doc.id())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                collection: T::COLLECTION.to_string(),
                id: doc.id().to_string(),
            });
        }

        sqlx::query("DELETE FROM unique_keys WHERE collection = ? AND doc_id = ?")
            .bind(T::COLLECTION)
            .bind(doc.id())
            .execute(&mut *tx)
            .await?;

        for (field, value) in doc.unique_keys() {
            sqlx::query(
                "INSERT INTO unique_keys (collection, field, value, doc_id) VALUES (?, ?, ?, ?)",
            )
            .bind(T::COLLECTION)
            .bind(field)
            .bind(&value)
            .bind(doc.id())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, T::COLLECTION, field))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM unique_keys WHERE collection = ? AND doc_id = ?")
            .bind(T::COLLECTION)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn list(&self) -> StorageResult<Vec<T>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = ? ORDER BY rowid")
            .bind(T::COLLECTION)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> StorageResult<T> {
                let body: String = row.try_get("body")?;
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    async fn find_by_key(&self, field: &str, value: &str) -> StorageResult<Option<T>> {
        let row = sqlx::query(
            "SELECT d.body FROM unique_keys k \
             JOIN documents d ON d.collection = k.collection AND d.id = k.doc_id \
             WHERE k.collection = ? AND k.field = ? AND k.value = ?",
        )
        .bind(T::COLLECTION)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Room {
        id: String,
        number: String,
    }

    impl Document for Room {
        const COLLECTION: &'static str = "rooms";

        fn id(&self) -> &str {
            &self.id
        }

        fn unique_keys(&self) -> Vec<(&'static str, String)> {
            vec![("number", self.number.clone())]
        }
    }

    async fn store() -> (tempfile::TempDir, SqliteStore<Room>) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = connect(&url, 2).await.unwrap();
        (dir, SqliteStore::new(pool))
    }

    fn room(id: &str, number: &str) -> Room {
        Room { id: id.into(), number: number.into() }
    }

    #[tokio::test]
    async fn test_roundtrip_and_list() {
        let (_dir, store) = store().await;
        store.insert(&room("a", "101")).await.unwrap();
        store.insert(&room("b", "102")).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(room("a", "101")));
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.find_by_key("number", "102").await.unwrap(), Some(room("b", "102")));
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_key_rolls_back() {
        let (_dir, store) = store().await;
        store.insert(&room("a", "101")).await.unwrap();
        let err = store.insert(&room("b", "101")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { ref field, .. } if field == "number"));
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let (_dir, store) = store().await;
        store.insert(&room("a", "101")).await.unwrap();
        store.replace(&room("a", "201")).await.unwrap();
        assert!(store.find_by_key("number", "101").await.unwrap().is_none());

        let missing = store.replace(&room("zz", "1")).await.unwrap_err();
        assert!(matches!(missing, StorageError::NotFound { .. }));

        assert!(store.delete("a").await.unwrap());
        store.insert(&room("c", "201")).await.unwrap();
    }
}
