// src/ingest/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::source::Source;
use crate::ingest::types::FetchFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Items,
    Empty,
    Failed,
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: Source,
    pub status: SourceStatus,
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub persist_errors: usize,
    pub failure: Option<FetchFailure>,
}

impl SourceReport {
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            status: SourceStatus::Empty,
            fetched: 0,
            stored: 0,
            duplicates: 0,
            persist_errors: 0,
            failure: None,
        }
    }

    pub fn failed(source: Source, failure: FetchFailure) -> Self {
        Self {
            status: SourceStatus::Failed,
            failure: Some(failure),
            ..Self::empty(source)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl IngestReport {
    pub fn fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn stored(&self) -> usize {
        self.sources.iter().map(|s| s.stored).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }

    pub fn persist_errors(&self) -> usize {
        self.sources.iter().map(|s| s.persist_errors).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .count()
    }
}
