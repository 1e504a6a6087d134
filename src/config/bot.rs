// src/config/bot.rs
use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::ai::DEFAULT_AI_CONFIG_PATH;
use crate::config::lists::{resolve_list_ids, ENV_LISTS_PATH, ENV_LIST_IDS};
use crate::ingest::fetch::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_ITEMS};
use crate::ingest::providers::x_api::DEFAULT_BASE_URL;
use crate::ingest::source::SourceSet;
use crate::rate_limit::{RateLimitConfig, ENV_RATE_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Topic query; also the topic named in generation prompts.
    pub query: String,
    pub list_ids: Vec<String>,
    pub max_items: u32,
    pub max_attempts: u32,
    pub interval_secs: u64,
    pub cooldown_secs: i64,
    pub reply_to_top: bool,
    pub prompt_posts: usize,
    /// Static key required on the HTTP surface when set.
    pub api_key: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub x_bearer_token: Option<String>,
    /// User-context token for publishing; absent means dry-run.
    pub x_user_token: Option<String>,
    pub x_api_base: String,
    pub ai_config_path: PathBuf,
}

impl BotConfig {
    /// Read configuration from the process environment (call `dotenvy` first).
    pub fn from_env() -> Result<Self> {
        let query = env_opt("DONKEE_QUERY")
            .ok_or_else(|| anyhow!("DONKEE_QUERY must be set (topic search query)"))?;

        let list_ids = resolve_list_ids(
            env_opt(ENV_LIST_IDS).as_deref(),
            env_opt(ENV_LISTS_PATH).map(PathBuf::from).as_deref(),
        )
        .context("loading list ids")?;

        let cfg = Self {
            query,
            list_ids,
            max_items: env_parse("DONKEE_MAX_ITEMS", DEFAULT_MAX_ITEMS)?,
            max_attempts: env_parse("DONKEE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            interval_secs: env_parse("DONKEE_INTERVAL_SECS", 3600)?,
            cooldown_secs: env_parse("DONKEE_COOLDOWN_SECS", 1800)?,
            reply_to_top: env_flag("DONKEE_REPLY_TO_TOP"),
            prompt_posts: env_parse("DONKEE_PROMPT_POSTS", crate::compose::DEFAULT_PROMPT_POSTS)?,
            api_key: env_opt("DONKEE_API_KEY"),
            rate_limit: RateLimitConfig::new(env_parse(
                ENV_RATE_LIMIT,
                RateLimitConfig::default().requests_per_minute,
            )?),
            store_backend: env_parse("STORE_BACKEND", StoreBackend::Postgres)?,
            database_url: env_opt("DATABASE_URL"),
            x_bearer_token: env_opt("X_BEARER_TOKEN"),
            x_user_token: env_opt("X_USER_TOKEN"),
            x_api_base: env_opt("X_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ai_config_path: env_opt("AI_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AI_CONFIG_PATH)),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            bail!("DONKEE_MAX_ITEMS must be > 0");
        }
        if self.interval_secs == 0 {
            bail!("DONKEE_INTERVAL_SECS must be > 0");
        }
        if self.store_backend == StoreBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        Ok(())
    }

    pub fn source_set(&self) -> SourceSet {
        SourceSet::new(&self.query, &self.list_ids)
    }
}

/// Unset and blank are the same thing.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    env_opt(key).is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {key}='{raw}': {e}")),
    }
}
