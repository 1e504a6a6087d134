// src/ingest/types.rs
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A post as returned by the platform read API, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub external_id: String,
    pub text: String,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub repost_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RawItem {
    /// Item without metrics or tags, as some endpoints return them.
    pub fn new(
        external_id: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            text: text.into(),
            like_count: None,
            repost_count: None,
            created_at,
            tags: None,
        }
    }

    pub fn with_metrics(mut self, likes: u64, reposts: u64) -> Self {
        self.like_count = Some(likes);
        self.repost_count = Some(reposts);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Canonical record handed to the store. Metrics and tags are never absent here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRecord {
    pub external_id: String,
    pub text: String,
    pub like_count: u64,
    pub repost_count: u64,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

/// A record as persisted, with its storage-assigned identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub external_id: String,
    pub source: String,
    pub text: String,
    pub like_count: u64,
    pub repost_count: u64,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

impl StoredRecord {
    pub fn from_new(id: i64, source: &str, record: &NewRecord) -> Self {
        Self {
            id,
            external_id: record.external_id.clone(),
            source: source.to_string(),
            text: record.text.clone(),
            like_count: record.like_count,
            repost_count: record.repost_count,
            created_at: record.created_at,
            tags: record.tags.clone(),
        }
    }
}

/// Errors surfaced by a [`FeedReader`].
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ReadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReadError::Parse(err.to_string())
        } else {
            ReadError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReadError {
    fn from(err: serde_json::Error) -> Self {
        ReadError::Parse(err.to_string())
    }
}

/// Paginated read capability of the platform.
#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Recent posts matching a free-text query.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<RawItem>, ReadError>;
    /// Latest posts of a curated list.
    async fn read_list(&self, list_id: &str, limit: u32) -> Result<Vec<RawItem>, ReadError>;
    fn name(&self) -> &'static str;
}

/// Why a source produced nothing usable in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    RateLimitExhausted { attempts: u32 },
    Other { message: String },
}

impl FetchFailure {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchFailure::RateLimitExhausted { .. } => "rate_limit_exhausted",
            FetchFailure::Other { .. } => "other",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::RateLimitExhausted { attempts } => {
                write!(f, "still rate limited after {attempts} attempts")
            }
            FetchFailure::Other { message } => write!(f, "{message}"),
        }
    }
}

/// Classified result of one read against one source.
///
/// `RateLimited` only exists between attempts; `Fetcher::fetch` resolves it
/// into a retry or into `Failed(RateLimitExhausted)`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Items(Vec<RawItem>),
    Empty,
    RateLimited { retry_after: Duration },
    Failed(FetchFailure),
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_with_kind_tag() {
        let v = serde_json::to_value(FetchFailure::RateLimitExhausted { attempts: 5 }).unwrap();
        assert_eq!(v, serde_json::json!({ "kind": "rate_limit_exhausted", "attempts": 5 }));
        assert_eq!(
            FetchFailure::Other { message: "boom".into() }.reason(),
            "other"
        );
    }
}
