// src/ingest/fetch.rs
//! Fetcher-with-backoff: one source, one classified outcome.
//!
//! Backoff sleeps until the reset instant reported by the platform. The
//! attempt ceiling bounds how long a single source may hold up a run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::ingest::source::{Source, SourceKind};
use crate::ingest::types::{FeedReader, FetchFailure, FetchOutcome, RawItem, ReadError};

pub const DEFAULT_MAX_ITEMS: u32 = 100;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Wall clock used to turn a reset timestamp into a wait.
pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug)]
enum Attempt {
    Attempting(u32),
    Succeeded(FetchOutcome),
    ExhaustedRetries(u32),
    FailedOther(FetchFailure),
}

pub struct Fetcher {
    reader: Arc<dyn FeedReader>,
    max_attempts: u32,
    clock: Clock,
}

impl Fetcher {
    pub fn new(reader: Arc<dyn FeedReader>) -> Self {
        Self {
            reader,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            clock: Utc::now,
        }
    }

    /// Total attempts per source, first call included. Zero is treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Never returns `RateLimited`; never panics or errors on reader failure.
    pub async fn fetch(&self, source: &Source, max_items: u32) -> FetchOutcome {
        let mut state = Attempt::Attempting(1);
        loop {
            state = match state {
                Attempt::Attempting(n) => self.attempt(source, max_items, n).await,
                Attempt::Succeeded(outcome) => return outcome,
                Attempt::ExhaustedRetries(attempts) => {
                    warn!(source = %source, attempts, "rate limit retries exhausted");
                    return FetchOutcome::Failed(FetchFailure::RateLimitExhausted { attempts });
                }
                Attempt::FailedOther(failure) => {
                    warn!(source = %source, error = %failure, "source fetch failed");
                    return FetchOutcome::Failed(failure);
                }
            };
        }
    }

    async fn attempt(&self, source: &Source, max_items: u32, n: u32) -> Attempt {
        let result = self.call(source, max_items).await;
        match classify(result, (self.clock)()) {
            FetchOutcome::RateLimited { retry_after } if n < self.max_attempts => {
                let wait_ms = retry_after.as_millis() as u64;
                debug!(source = %source, attempt = n, retry_after_ms = wait_ms, "rate limited, backing off");
                counter!("ingest_rate_limited_total").increment(1);
                histogram!("ingest_backoff_ms").record(wait_ms as f64);
                tokio::time::sleep(retry_after).await;
                Attempt::Attempting(n + 1)
            }
            FetchOutcome::RateLimited { .. } => {
                counter!("ingest_rate_limited_total").increment(1);
                Attempt::ExhaustedRetries(n)
            }
            FetchOutcome::Failed(failure) => Attempt::FailedOther(failure),
            settled => Attempt::Succeeded(settled),
        }
    }

    async fn call(&self, source: &Source, max_items: u32) -> Result<Vec<RawItem>, ReadError> {
        match source.kind {
            SourceKind::QueryFeed => self.reader.search(&source.identifier, max_items).await,
            SourceKind::ListFeed => self.reader.read_list(&source.identifier, max_items).await,
        }
    }
}

/// Map a raw read result onto an outcome. `now` anchors the rate-limit wait.
pub fn classify(result: Result<Vec<RawItem>, ReadError>, now: DateTime<Utc>) -> FetchOutcome {
    match result {
        Ok(items) if items.is_empty() => FetchOutcome::Empty,
        Ok(items) => FetchOutcome::Items(items),
        Err(ReadError::RateLimited { reset_at }) => FetchOutcome::RateLimited {
            retry_after: (reset_at - now).to_std().unwrap_or(Duration::ZERO),
        },
        Err(e) => FetchOutcome::Failed(FetchFailure::Other {
            message: e.to_string(),
        }),
    }
}
