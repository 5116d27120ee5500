//! Write path and index lookups over a [`DocumentStore`].
//!
//! A write pings the store, inserts each variant's documents into its own
//! collection, and then hands the resulting index entries to a spawned task.
//! The caller gets a [`WriteReceipt`] right after the primary inserts; the
//! index task keeps running if the receipt is dropped.
use crate::sqlite::SqliteDocumentStore;
use crate::store::{DocumentStore, StorageId, StoreError};
use roost_common::json::find_json_key;
use roost_config::CacheConfig;
use roost_social::twitter::{Entity, EntityKind, Tweet, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const PUBLIC_ID_KEY: &str = "id";
const PUBLIC_ID_FIELD: &str = "publicId";

/// Ordered entities for one [`CacheService::write`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch(Vec<Entity>);

impl EntityBatch {
    pub fn new(items: Vec<Entity>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split by variant, keeping first-appearance order of kinds and input
    /// order within each kind.
    fn grouped(self) -> Vec<(EntityKind, Vec<Entity>)> {
        let mut groups: Vec<(EntityKind, Vec<Entity>)> = Vec::new();
        for entity in self.0 {
            let kind = entity.kind();
            match groups.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, items)) => items.push(entity),
                None => groups.push((kind, vec![entity])),
            }
        }
        groups
    }
}

impl From<Entity> for EntityBatch {
    fn from(entity: Entity) -> Self {
        Self(vec![entity])
    }
}

impl From<Tweet> for EntityBatch {
    fn from(tweet: Tweet) -> Self {
        Self(vec![Entity::Tweet(tweet)])
    }
}

impl From<User> for EntityBatch {
    fn from(user: User) -> Self {
        Self(vec![Entity::User(user)])
    }
}

impl From<Vec<Entity>> for EntityBatch {
    fn from(items: Vec<Entity>) -> Self {
        Self(items)
    }
}

impl From<Vec<Tweet>> for EntityBatch {
    fn from(items: Vec<Tweet>) -> Self {
        Self(items.into_iter().map(Entity::Tweet).collect())
    }
}

impl From<Vec<User>> for EntityBatch {
    fn from(items: Vec<User>) -> Self {
        Self(items.into_iter().map(Entity::User).collect())
    }
}

/// Maps a public entity id to where its document was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub public_id: String,
    pub storage_id: StorageId,
    #[serde(rename = "collectionName")]
    pub collection: String,
}

/// Handle to the background index insert started by a write.
#[derive(Debug)]
pub struct IndexTask(JoinHandle<Result<usize, StoreError>>);

impl IndexTask {
    /// Wait for the index insert and return how many entries it stored.
    pub async fn wait(self) -> Result<usize, StoreError> {
        match self.0.await {
            Ok(result) => result,
            Err(join) => Err(StoreError::Task(join.to_string())),
        }
    }
}

/// Outcome of [`CacheService::write`].
///
/// `acknowledged()` reflects the primary inserts only. The index insert, when
/// one was started, is reachable through [`WriteReceipt::index_complete`].
#[derive(Debug)]
#[must_use = "a receipt tells whether the batch was stored"]
pub struct WriteReceipt {
    acknowledged: bool,
    index: Option<IndexTask>,
}

impl WriteReceipt {
    fn rejected() -> Self {
        Self {
            acknowledged: false,
            index: None,
        }
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Detach the index task, leaving the receipt without one.
    pub fn take_index(&mut self) -> Option<IndexTask> {
        self.index.take()
    }

    /// Wait for the index insert. `Ok(0)` when none was started.
    pub async fn index_complete(self) -> Result<usize, StoreError> {
        match self.index {
            Some(task) => task.wait().await,
            None => Ok(0),
        }
    }
}

pub struct CacheService<S> {
    store: Arc<S>,
    index: String,
}

impl CacheService<SqliteDocumentStore> {
    /// Open the configured SQLite database. The connection is established on
    /// the first write.
    pub fn connect(config: &CacheConfig) -> Result<Self, StoreError> {
        let store = SqliteDocumentStore::new(&config.url, &config.database)?;
        Ok(Self::new(store, config))
    }
}

impl<S: DocumentStore + 'static> CacheService<S> {
    pub fn new(store: S, config: &CacheConfig) -> Self {
        Self {
            store: Arc::new(store),
            index: config.index.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index_collection(&self) -> &str {
        &self.index
    }

    /// Store a batch and index every stored document by its public id.
    ///
    /// Never fails: an unreachable store, an encoding problem or an
    /// unacknowledged insert all come back as a receipt with
    /// `acknowledged() == false`. When a mixed batch is only partly stored,
    /// the groups that were acknowledged are still indexed.
    pub async fn write(&self, batch: impl Into<EntityBatch>) -> WriteReceipt {
        let batch = batch.into();
        if batch.is_empty() {
            debug!("cache.write.empty");
            return WriteReceipt::rejected();
        }

        if let Err(err) = self.store.ping().await {
            error!(error=%err, "cache.write.ping_failed");
            return WriteReceipt::rejected();
        }

        let mut entries = Vec::with_capacity(batch.len());
        let mut acknowledged = true;
        for (kind, items) in batch.grouped() {
            let collection = kind.collection_name();
            match self.insert_group(collection, &items).await {
                Ok(stored) => entries.extend(stored),
                Err(err) => {
                    error!(collection=%collection, items=items.len(), error=%err, "cache.write.insert_failed");
                    acknowledged = false;
                    break;
                }
            }
        }

        let index = if entries.is_empty() {
            None
        } else {
            Some(self.spawn_index(entries))
        };
        WriteReceipt {
            acknowledged,
            index,
        }
    }

    async fn insert_group(
        &self,
        collection: &str,
        items: &[Entity],
    ) -> Result<Vec<IndexEntry>, StoreError> {
        let docs = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        let public_ids: Vec<String> = docs.iter().map(public_id_of).collect();

        let outcome = self.store.insert_many(collection, docs).await?;
        if !outcome.acknowledged || outcome.inserted_ids.len() != public_ids.len() {
            return Err(StoreError::Unacknowledged(collection.to_string()));
        }
        info!(collection=%collection, inserted=outcome.inserted_count, "cache.write.stored");

        Ok(public_ids
            .into_iter()
            .zip(outcome.inserted_ids)
            .map(|(public_id, storage_id)| IndexEntry {
                public_id,
                storage_id,
                collection: collection.to_string(),
            })
            .collect())
    }

    fn spawn_index(&self, entries: Vec<IndexEntry>) -> IndexTask {
        let store = Arc::clone(&self.store);
        let index = self.index.clone();
        IndexTask(tokio::spawn(async move {
            let count = entries.len();
            let result = insert_index(&*store, &index, entries).await;
            match &result {
                Ok(stored) => info!(index=%index, entries=stored, "cache.index.stored"),
                Err(err) => warn!(index=%index, entries=count, error=%err, "cache.index.failed"),
            }
            result
        }))
    }

    /// Index entries recorded for `public_id`, oldest first.
    pub async fn locate(&self, public_id: &str) -> Result<Vec<IndexEntry>, StoreError> {
        let hits = self
            .store
            .find_by_field(&self.index, PUBLIC_ID_FIELD, public_id)
            .await?;
        hits.into_iter()
            .map(|(_, doc)| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    /// Load the entity an index entry points at.
    pub async fn read(&self, entry: &IndexEntry) -> Result<Option<Entity>, StoreError> {
        let Some(kind) = EntityKind::from_collection(&entry.collection) else {
            return Err(StoreError::Corrupt {
                collection: self.index.clone(),
                reason: format!("unknown collection `{}`", entry.collection),
            });
        };
        let Some(doc) = self
            .store
            .find_by_id(&entry.collection, entry.storage_id)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Entity::from_document(kind, doc)?))
    }
}

async fn insert_index<S: DocumentStore>(
    store: &S,
    index: &str,
    entries: Vec<IndexEntry>,
) -> Result<usize, StoreError> {
    let docs = entries
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    let outcome = store.insert_many(index, docs).await?;
    if !outcome.acknowledged {
        return Err(StoreError::Unacknowledged(index.to_string()));
    }
    Ok(outcome.inserted_count)
}

fn public_id_of(doc: &Value) -> String {
    match find_json_key(doc, PUBLIC_ID_KEY) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => {
            warn!("cache.write.missing_public_id");
            String::new()
        }
    }
}
