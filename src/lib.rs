// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bootstrap;
pub mod bot;
pub mod config;
pub mod metrics;
pub mod rate_limit;
pub mod scheduler;
pub mod telemetry;

// Ingestion core: sources → fetch with backoff → persist
pub mod ingest;
pub mod store;

// Downstream: generation + publishing
pub mod compose;
pub mod publish;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::bot::{Bot, BotSettings};
pub use crate::ingest::fetch::Fetcher;
pub use crate::ingest::persist::{PersistError, PersistStatus, Persister};
pub use crate::ingest::report::{IngestReport, SourceReport, SourceStatus};
pub use crate::ingest::source::{Source, SourceKind, SourceSet};
pub use crate::ingest::types::{FeedReader, FetchFailure, FetchOutcome, RawItem, ReadError};
pub use crate::store::{MemoryStore, PostStore, StoreError};
