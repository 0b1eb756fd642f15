//! Backing stores the refresh loop pulls the full dataset from.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;

use crate::record::Record;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://admin@localhost:5432/youtube?sslmode=disable";
pub const DEFAULT_QUERY: &str = "SELECT id, serial FROM youtube.stats.channels ORDER BY id ASC";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Source of every record, ordered by id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError>;
}

/// PostgreSQL-backed store running a single `(id, serial)` query.
pub struct PgRecordStore {
    pool: PgPool,
    query: String,
}

impl PgRecordStore {
    /// Builds the pool without connecting; the first fetch opens the
    /// connection, so an unreachable database surfaces as a fetch error.
    pub fn connect_lazy(url: &str, query: impl Into<String>) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(1).connect_lazy(url)?;
        Ok(Self {
            pool,
            query: query.into(),
        })
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        let rows: Vec<(i32, String)> = sqlx::query_as(&self.query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, serial)| Record::new(id, serial))
            .collect())
    }
}

/// In-process store for tests and local runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records;
    }

    /// While set, every fetch fails as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked down".into()));
        }
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_returns_records_ordered_by_id() {
        let store = MemoryStore::new(vec![Record::new(3, "c"), Record::new(1, "a")]);

        let records = store.fetch_all().await.unwrap();

        assert_eq!(records, vec![Record::new(1, "a"), Record::new(3, "c")]);
    }

    #[tokio::test]
    async fn memory_store_can_be_marked_unavailable() {
        let store = MemoryStore::new(vec![Record::new(1, "a")]);
        store.set_unavailable(true);
        assert!(matches!(
            store.fetch_all().await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false);
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pg_store_rejects_malformed_url() {
        let result = PgRecordStore::connect_lazy("not a url", DEFAULT_QUERY);
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
