//! The storage collaborator seam.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Storage-assigned identifier of a persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(Uuid);

impl StorageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for StorageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Result of a batch insert. `inserted_ids[i]` belongs to the i-th input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertManyOutcome {
    pub acknowledged: bool,
    pub inserted_count: usize,
    pub inserted_ids: Vec<StorageId>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("corrupt document in `{collection}`: {reason}")]
    Corrupt { collection: String, reason: String },
    #[error("write to `{0}` was not acknowledged")]
    Unacknowledged(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("index task failed: {0}")]
    Task(String),
}

/// Document-oriented storage: named collections of JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Cheap liveness check; must fail when the backing server is unreachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert `docs` in order, returning one id per document in the same order.
    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Value>,
    ) -> Result<InsertManyOutcome, StoreError>;

    async fn find_by_id(&self, collection: &str, id: StorageId)
        -> Result<Option<Value>, StoreError>;

    /// Documents whose top-level string `field` equals `value`, oldest first.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(StorageId, Value)>, StoreError>;
}
