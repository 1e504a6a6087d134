// tests/common/mod.rs
//
// Shared fakes for integration tests: a scripted read capability keyed by
// source label, a store that can be told to fail, and a recording publisher.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use donkee::ingest::types::{FeedReader, NewRecord, RawItem, ReadError, StoredRecord};
use donkee::publish::{PublishError, Publisher};
use donkee::store::{MemoryStore, PostStore, StoreError};

/// Fixed wall-clock instant used as "now" by frozen clocks.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn frozen_clock() -> DateTime<Utc> {
    t0()
}

pub fn item(id: &str, likes: u64, reposts: u64) -> RawItem {
    RawItem::new(id, format!("post {id} about donkeys"), t0()).with_metrics(likes, reposts)
}

type Responder = Box<dyn Fn(u32) -> Result<Vec<RawItem>, ReadError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Call {
    pub label: String,
    pub limit: u32,
    pub at: Instant,
}

/// Answers per source label (`query:x`, `list:y`). The responder receives
/// the 1-based call number for that label. Unknown labels return no items.
#[derive(Default)]
pub struct ScriptedReader {
    responders: HashMap<String, Responder>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, label: &str, f: F) -> Self
    where
        F: Fn(u32) -> Result<Vec<RawItem>, ReadError> + Send + Sync + 'static,
    {
        self.responders.insert(label.to_string(), Box::new(f));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }

    pub fn calls_for(&self, label: &str) -> usize {
        self.calls().iter().filter(|c| c.label == label).count()
    }

    fn respond(&self, label: String, limit: u32) -> Result<Vec<RawItem>, ReadError> {
        let n = {
            let mut g = self.calls.lock().unwrap();
            g.push(Call {
                label: label.clone(),
                limit,
                at: Instant::now(),
            });
            g.iter().filter(|c| c.label == label).count() as u32
        };
        match self.responders.get(&label) {
            Some(f) => f(n),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl FeedReader for ScriptedReader {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<RawItem>, ReadError> {
        self.respond(format!("query:{query}"), limit)
    }

    async fn read_list(&self, list_id: &str, limit: u32) -> Result<Vec<RawItem>, ReadError> {
        self.respond(format!("list:{list_id}"), limit)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Memory store that counts insert calls and fails on chosen ids.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    inserts: AtomicUsize,
    fail_ids: Vec<String>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostStore for CountingStore {
    async fn insert(&self, record: &NewRecord, source: &str) -> Result<StoredRecord, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_ids.iter().any(|id| id == &record.external_id) {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.insert(record, source).await
    }

    async fn get(&self, external_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.inner.get(external_id).await
    }

    async fn top_by_engagement(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.top_by_engagement(limit).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Records every publish call; ids are `posted-N`.
#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> Vec<(String, Option<String>)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<String, PublishError> {
        let mut g = self.posts.lock().unwrap();
        g.push((text.to_string(), reply_to.map(str::to_string)));
        Ok(format!("posted-{}", g.len()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
