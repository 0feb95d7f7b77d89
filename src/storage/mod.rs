//! Document storage: a memory backend and a SQLite backend behind one trait.

pub mod collection;
pub mod database;
pub mod memory;
pub mod sqlite;
pub mod r#trait;

pub use collection::{page_limit, Collection, Page, MAX_PAGE_SIZE};
pub use database::{Backend, Database, DatabaseStatus};
pub use memory::MemoryStore;
pub use r#trait::{Document, DocumentStore, StorageError, StorageResult};
