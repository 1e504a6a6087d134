// src/bot.rs
//! The assembled bot: sources, fetcher, persister and composer behind one lock.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::compose::ai_adapter::DynGenerator;
use crate::compose::{ComposeError, ComposeOutcome, Composer, ComposerSettings};
use crate::ingest::fetch::{Fetcher, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_ITEMS};
use crate::ingest::persist::Persister;
use crate::ingest::report::IngestReport;
use crate::ingest::source::SourceSet;
use crate::ingest::types::FeedReader;
use crate::publish::{PublishedPost, Publisher};
use crate::store::PostStore;

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub max_items: u32,
    pub max_attempts: u32,
    pub composer: ComposerSettings,
}

impl BotSettings {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            composer: ComposerSettings::new(topic),
        }
    }
}

pub struct Bot {
    sources: SourceSet,
    max_items: u32,
    fetcher: Fetcher,
    persister: Persister,
    composer: Composer,
    // Runs never overlap: scheduler ticks and HTTP triggers share this.
    run_lock: Mutex<()>,
}

impl Bot {
    pub fn new(
        sources: SourceSet,
        settings: BotSettings,
        reader: Arc<dyn FeedReader>,
        store: Arc<dyn PostStore>,
        generator: DynGenerator,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let fetcher = Fetcher::new(reader).with_max_attempts(settings.max_attempts);
        let persister = Persister::new(store.clone());
        let composer = Composer::new(store, generator, publisher, settings.composer);
        Self {
            sources,
            max_items: settings.max_items,
            fetcher,
            persister,
            composer,
            run_lock: Mutex::new(()),
        }
    }

    /// Swap the fetcher (e.g. to inject a clock).
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        self.persister.store()
    }

    pub fn published(&self, n: usize) -> Vec<PublishedPost> {
        self.composer.published(n)
    }

    pub async fn ingest(&self) -> IngestReport {
        let _guard = self.run_lock.lock().await;
        self.ingest_unlocked().await
    }

    pub async fn compose(&self) -> Result<ComposeOutcome, ComposeError> {
        let _guard = self.run_lock.lock().await;
        self.composer.compose_and_publish().await
    }

    /// Ingest then compose, as one uninterrupted run.
    pub async fn tick(&self) -> (IngestReport, Result<ComposeOutcome, ComposeError>) {
        let _guard = self.run_lock.lock().await;
        let report = self.ingest_unlocked().await;
        let composed = self.composer.compose_and_publish().await;
        (report, composed)
    }

    async fn ingest_unlocked(&self) -> IngestReport {
        crate::ingest::run_once(&self.sources, &self.fetcher, &self.persister, self.max_items).await
    }
}
