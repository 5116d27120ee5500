//! SQLite-backed [`DocumentStore`].
//!
//! Each collection is a table named `"<database>.<collection>"` holding the
//! storage id and the JSON body. Tables are created on first use. The pool is
//! opened lazily, so an unreachable database surfaces on the first `ping`
//! rather than at construction.
use crate::store::{DocumentStore, InsertManyOutcome, StorageId, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Connection, Row, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    database: String,
}

impl SqliteDocumentStore {
    /// Lazily connect to `url` (any sqlx SQLite URL) under logical `database`.
    pub fn new(url: &str, database: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(url)?;
        Ok(Self::with_pool(pool, database))
    }

    /// Private in-memory database, kept alive on a single connection.
    pub fn in_memory(database: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy("sqlite::memory:")?;
        Ok(Self::with_pool(pool, database))
    }

    pub fn with_pool(pool: SqlitePool, database: &str) -> Self {
        Self {
            pool,
            database: database.to_string(),
        }
    }

    fn table(&self, collection: &str) -> String {
        let name = format!("{}.{}", self.database, collection);
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    async fn ensure_table(conn: &mut SqliteConnection, table: &str) -> Result<(), StoreError> {
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
                 id         TEXT PRIMARY KEY,
                 body       TEXT NOT NULL,
                 created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
               )"#
        );
        sqlx::query(&ddl).execute(conn).await?;
        Ok(())
    }
}

fn decode_row(collection: &str, id: &str, body: &str) -> Result<(StorageId, Value), StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        collection: collection.to_string(),
        reason,
    };
    let id: StorageId = id.parse().map_err(|e: uuid::Error| corrupt(e.to_string()))?;
    let body: Value = serde_json::from_str(body).map_err(|e| corrupt(e.to_string()))?;
    Ok((id, body))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Value>,
    ) -> Result<InsertManyOutcome, StoreError> {
        let table = self.table(collection);
        let mut tx = self.pool.begin().await?;
        Self::ensure_table(&mut tx, &table).await?;

        let insert = format!("INSERT INTO {table} (id, body) VALUES (?1, ?2)");
        let mut inserted_ids = Vec::with_capacity(docs.len());
        for doc in &docs {
            let id = StorageId::generate();
            sqlx::query(&insert)
                .bind(id.to_string())
                .bind(doc.to_string())
                .execute(&mut *tx)
                .await?;
            inserted_ids.push(id);
        }
        tx.commit().await?;

        info!(
            collection=%collection,
            database=%self.database,
            rows=inserted_ids.len(),
            "store.insert_many"
        );
        Ok(InsertManyOutcome {
            acknowledged: true,
            inserted_count: inserted_ids.len(),
            inserted_ids,
        })
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: StorageId,
    ) -> Result<Option<Value>, StoreError> {
        let table = self.table(collection);
        let mut conn = self.pool.acquire().await?;
        Self::ensure_table(&mut conn, &table).await?;
        let row = sqlx::query(&format!("SELECT id, body FROM {table} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            debug!(collection=%collection, storage_id=%id, "store.find_by_id.missing");
            return Ok(None);
        };
        let (_, body) = decode_row(collection, row.try_get("id")?, row.try_get("body")?)?;
        Ok(Some(body))
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(StorageId, Value)>, StoreError> {
        let table = self.table(collection);
        let mut conn = self.pool.acquire().await?;
        Self::ensure_table(&mut conn, &table).await?;
        let rows = sqlx::query(&format!(
            "SELECT id, body FROM {table} WHERE json_extract(body, ?1) = ?2 ORDER BY rowid ASC"
        ))
        .bind(format!("$.\"{}\"", field.replace('"', "")))
        .bind(value)
        .fetch_all(&mut *conn)
        .await?;
        debug!(collection=%collection, field=%field, rows=rows.len(), "store.find_by_field");

        rows.iter()
            .map(|r| decode_row(collection, r.try_get("id")?, r.try_get("body")?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn table_names_are_namespaced_and_quoted() {
        let store = SqliteDocumentStore::in_memory("ai-cache").unwrap();
        assert_eq!(store.table("Tweet"), "\"ai-cache.Tweet\"");
        assert_eq!(store.table("we\"ird"), "\"ai-cache.we\"\"ird\"");
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let err = decode_row("User", "nope", "{}").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref collection, .. } if collection == "User"));
        assert!(decode_row("User", &StorageId::generate().to_string(), "{").is_err());
    }
}
