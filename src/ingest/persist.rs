// src/ingest/persist.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ingest::normalize_text;
use crate::ingest::source::Source;
use crate::ingest::types::{NewRecord, RawItem};
use crate::store::{PostStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistStatus {
    Stored,
    /// Key already present; nothing written.
    Duplicate,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("item has an empty external id")]
    MissingId,

    #[error("store write failed for {external_id}: {message}")]
    Store {
        external_id: String,
        message: String,
    },
}

/// Raw item → canonical record. Absent metrics become 0, absent tags empty.
pub fn normalize(item: &RawItem) -> NewRecord {
    let tags: BTreeSet<String> = item
        .tags
        .iter()
        .flatten()
        .map(|t| t.trim().trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    NewRecord {
        external_id: item.external_id.trim().to_string(),
        text: normalize_text(&item.text),
        like_count: item.like_count.unwrap_or(0),
        repost_count: item.repost_count.unwrap_or(0),
        created_at: item.created_at,
        tags,
    }
}

/// Writes items through an explicitly owned store client.
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn PostStore>,
}

impl Persister {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.store
    }

    /// One durable write, never retried. A duplicate key is a successful no-op.
    pub async fn persist(
        &self,
        item: &RawItem,
        source: &Source,
    ) -> Result<PersistStatus, PersistError> {
        let record = normalize(item);
        if record.external_id.is_empty() {
            return Err(PersistError::MissingId);
        }

        match self.store.insert(&record, &source.label()).await {
            Ok(stored) => {
                debug!(external_id = %stored.external_id, id = stored.id, "stored post");
                Ok(PersistStatus::Stored)
            }
            Err(StoreError::DuplicateKey(_)) => Ok(PersistStatus::Duplicate),
            Err(StoreError::Backend(message)) => Err(PersistError::Store {
                external_id: record.external_id,
                message,
            }),
        }
    }
}
