//! Document cache for fetched entities.
//!
//! Entities are written into one collection per variant (`Tweet`, `User`) and
//! every stored document gets an index record mapping its public id to the
//! storage id and collection it landed in, so it can be resolved later without
//! knowing its type.
//!
//! - [`store`]: the `DocumentStore` seam and its value types
//! - [`sqlite`]: SQLite-backed store (JSON bodies, one table per collection)
//! - [`service`]: `CacheService::write` and the index read side
pub mod service;
pub mod sqlite;
pub mod store;

pub use service::{CacheService, EntityBatch, IndexEntry, IndexTask, WriteReceipt};
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, InsertManyOutcome, StorageId, StoreError};
