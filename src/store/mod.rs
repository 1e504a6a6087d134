// src/store/mod.rs
//! Durable post storage keyed by the platform's external id.

pub mod postgres;

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::ingest::types::{NewRecord, StoredRecord};

pub use postgres::PgPostStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The external id is already stored.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a new record. An existing `external_id` yields `DuplicateKey`.
    async fn insert(&self, record: &NewRecord, source: &str) -> Result<StoredRecord, StoreError>;

    async fn get(&self, external_id: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Most engaging posts first: likes, then reposts, then newest.
    async fn top_by_engagement(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    fn name(&self) -> &'static str;
}

/// Orders records the way `top_by_engagement` must.
pub fn engagement_order(a: &StoredRecord, b: &StoredRecord) -> std::cmp::Ordering {
    b.like_count
        .cmp(&a.like_count)
        .then(b.repost_count.cmp(&a.repost_count))
        .then(b.created_at.cmp(&a.created_at))
}

#[derive(Debug, Default)]
struct MemoryInner {
    by_key: BTreeMap<String, StoredRecord>,
    next_id: i64,
}

/// Process-local store. Backs tests and `STORE_BACKEND=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert(&self, record: &NewRecord, source: &str) -> Result<StoredRecord, StoreError> {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if g.by_key.contains_key(&record.external_id) {
            return Err(StoreError::DuplicateKey(record.external_id.clone()));
        }
        g.next_id += 1;
        let stored = StoredRecord::from_new(g.next_id, source, record);
        g.by_key.insert(record.external_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, external_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(g.by_key.get(external_id).cloned())
    }

    async fn top_by_engagement(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<StoredRecord> = g.by_key.values().cloned().collect();
        all.sort_by(engagement_order);
        all.truncate(limit);
        Ok(all)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(g.by_key.len() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
