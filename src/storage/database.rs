use std::sync::Arc;

use serde::Serialize;

use super::collection::Collection;
use super::memory::MemoryStore;
use super::r#trait::{Document, DocumentStore, StorageError, StorageResult};
use super::sqlite::{self, SqliteStore};
use crate::models::{Booking, Credential, Hotel, Review, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Sqlite,
}

/// Health report for `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub backend: Backend,
    pub status: &'static str,
}

/// All collections of the application.
#[derive(Clone)]
pub struct Database {
    pub users: Collection<User>,
    pub credentials: Collection<Credential>,
    pub hotels: Collection<Hotel>,
    pub bookings: Collection<Booking>,
    pub reviews: Collection<Review>,
    backend: Backend,
}

impl Database {
    /// Open `memory://` or a `sqlite:` URL.
    pub async fn open(url: &str, max_connections: u32) -> StorageResult<Self> {
        if url.starts_with("memory:") {
            return Ok(Self::in_memory());
        }
        if url.starts_with("sqlite:") {
            let pool = sqlite::connect(url, max_connections).await?;
            return Ok(Self {
                users: sqlite_collection(&pool),
                credentials: sqlite_collection(&pool),
                hotels: sqlite_collection(&pool),
                bookings: sqlite_collection(&pool),
                reviews: sqlite_collection(&pool),
                backend: Backend::Sqlite,
            });
        }
        Err(StorageError::Unavailable(format!(
            "unsupported database url: {url}"
        )))
    }

    pub fn in_memory() -> Self {
        Self {
            users: memory_collection(),
            credentials: memory_collection(),
            hotels: memory_collection(),
            bookings: memory_collection(),
            reviews: memory_collection(),
            backend: Backend::Memory,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub async fn status(&self) -> DatabaseStatus {
        let status = match self.users.ping().await {
            Ok(()) => "connected",
            Err(err) => {
                tracing::warn!("database ping failed: {}", err);
                "disconnected"
            }
        };
        DatabaseStatus { backend: self.backend, status }
    }
}

fn memory_collection<T: Document>() -> Collection<T> {
    let store: Arc<dyn DocumentStore<T>> = Arc::new(MemoryStore::<T>::new());
    Collection::new(store)
}

fn sqlite_collection<T: Document>(pool: &sqlx::SqlitePool) -> Collection<T> {
    let store: Arc<dyn DocumentStore<T>> = Arc::new(SqliteStore::<T>::new(pool.clone()));
    Collection::new(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open("memory://", 1).await.unwrap();
        assert_eq!(db.backend(), Backend::Memory);
        assert_eq!(db.status().await.status, "connected");
    }

    #[tokio::test]
    async fn test_open_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("app.db").display());
        let db = Database::open(&url, 2).await.unwrap();
        assert_eq!(db.backend(), Backend::Sqlite);

        let user = User::new("guest@example.com", "Guest", "One");
        db.users.insert(&user).await.unwrap();
        let dup = User::new("guest@example.com", "Other", "Guest");
        assert!(matches!(
            db.users.insert(&dup).await,
            Err(StorageError::Duplicate { .. })
        ));
        assert_eq!(db.status().await.status, "connected");
    }

    #[tokio::test]
    async fn test_unknown_scheme_rejected() {
        assert!(Database::open("mongodb://localhost/db", 1).await.is_err());
    }
}
