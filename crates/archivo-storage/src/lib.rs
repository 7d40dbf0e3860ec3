//! Archivo Storage - the page store
//!
//! This crate persists archived pages in SQLite and indexes their content
//! with FTS5, behind the [`PageStore`] trait. [`MemoryStore`] implements the
//! same trait without a database.

pub mod memory;
pub mod pool;
pub mod snippet;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use pool::{ConnectionPool, PoolConfig};
pub use sqlite::SqliteStore;
pub use store::PageStore;
