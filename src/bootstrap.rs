// src/bootstrap.rs
//! Wires concrete collaborators from `BotConfig`.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use crate::bot::{Bot, BotSettings};
use crate::compose::ai_adapter::{build_generator, DynGenerator};
use crate::compose::ComposerSettings;
use crate::config::{AiConfig, BotConfig, StoreBackend};
use crate::ingest::providers::XApiReader;
use crate::ingest::types::FeedReader;
use crate::publish::{DryRunPublisher, Publisher, XPublisher};
use crate::store::{MemoryStore, PgPostStore, PostStore};

/// Connections owned for the lifetime of the process.
pub struct Runtime {
    pub cfg: BotConfig,
    pub bot: Arc<Bot>,
    /// Kept so callers can close the pool on shutdown.
    pub pg: Option<PgPostStore>,
}

impl Runtime {
    pub async fn from_config(cfg: BotConfig) -> anyhow::Result<Self> {
        let (store, pg): (Arc<dyn PostStore>, Option<PgPostStore>) = match cfg.store_backend {
            StoreBackend::Postgres => {
                let url = cfg
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("DATABASE_URL missing"))?;
                let pg = PgPostStore::connect(url, 5)
                    .await
                    .context("opening postgres store")?;
                pg.ensure_schema().await.context("creating posts schema")?;
                (Arc::new(pg.clone()), Some(pg))
            }
            StoreBackend::Memory => {
                warn!("using in-memory store; posts are lost on restart");
                (Arc::new(MemoryStore::new()), None)
            }
        };

        let token = cfg
            .x_bearer_token
            .clone()
            .ok_or_else(|| anyhow!("X_BEARER_TOKEN must be set"))?;
        let reader: Arc<dyn FeedReader> =
            Arc::new(XApiReader::new(token).with_base_url(cfg.x_api_base.clone()));

        let publisher: Arc<dyn Publisher> = match &cfg.x_user_token {
            Some(t) => Arc::new(XPublisher::new(t.clone()).with_base_url(cfg.x_api_base.clone())),
            None => {
                info!("X_USER_TOKEN not set, publishing in dry-run mode");
                Arc::new(DryRunPublisher::new())
            }
        };

        let ai = AiConfig::load_or_disabled(&cfg.ai_config_path).context("loading AI config")?;
        // Safe diagnostics: only provider + enabled + key length
        info!(
            provider = %ai.provider,
            enabled = ai.enabled,
            key_len = ai.api_key.len(),
            "AI cfg loaded"
        );
        let generator: DynGenerator = build_generator(&ai);

        let settings = BotSettings {
            max_items: cfg.max_items,
            max_attempts: cfg.max_attempts,
            composer: ComposerSettings {
                topic: cfg.query.clone(),
                prompt_posts: cfg.prompt_posts,
                reply_to_top: cfg.reply_to_top,
                cooldown_secs: cfg.cooldown_secs,
            },
        };
        let sources = cfg.source_set();
        info!(
            sources = sources.len(),
            store = store.name(),
            reader = reader.name(),
            publisher = publisher.name(),
            generator = generator.provider_name(),
            "bot assembled"
        );
        let bot = Bot::new(sources, settings, reader, store, generator, publisher);

        Ok(Self {
            cfg,
            bot: Arc::new(bot),
            pg,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(pg) = &self.pg {
            pg.close().await;
        }
    }
}
