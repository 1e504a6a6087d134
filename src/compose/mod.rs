// src/compose/mod.rs
//! Downstream of ingestion: pick the most engaging stored posts, prompt the
//! generator, and publish the result as a new post or a reply.

pub mod ai_adapter;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::compose::ai_adapter::{DynGenerator, GenerateError};
use crate::ingest::types::StoredRecord;
use crate::publish::{PostCooldown, PublishError, PublishLog, PublishedPost, Publisher};
use crate::store::{engagement_order, PostStore, StoreError};

pub const DEFAULT_PROMPT_POSTS: usize = 5;

/// Per-post text budget inside the prompt, in characters.
const PROMPT_POST_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode<'a> {
    NewPost,
    Reply { target: &'a str },
}

#[derive(Debug, Clone)]
pub struct ComposerSettings {
    pub topic: String,
    pub prompt_posts: usize,
    pub reply_to_top: bool,
    pub cooldown_secs: i64,
}

impl ComposerSettings {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            prompt_posts: DEFAULT_PROMPT_POSTS,
            reply_to_top: false,
            cooldown_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComposeOutcome {
    NothingToCompose,
    CoolingDown { next_allowed_at: DateTime<Utc> },
    Published(PublishedPost),
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("reading top posts: {0}")]
    Store(#[from] StoreError),

    #[error("generating text: {0}")]
    Generate(#[from] GenerateError),

    #[error("publishing: {0}")]
    Publish(#[from] PublishError),
}

/// Sort by likes, then reposts, both descending.
pub fn rank_for_prompt(mut records: Vec<StoredRecord>) -> Vec<StoredRecord> {
    records.sort_by(engagement_order);
    records
}

/// Deterministic prompt: topic, instruction for the mode, then the posts.
pub fn build_prompt(topic: &str, posts: &[StoredRecord], mode: PromptMode<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Topic: {topic}\n"));
    match mode {
        PromptMode::NewPost => out.push_str(
            "Write a new original post about this topic, inspired by what is trending below.\n",
        ),
        PromptMode::Reply { target } => {
            out.push_str("Write a reply to the following post. Stay on topic and add something new.\n");
            out.push_str(&format!("Post to reply to: {}\n", clip(target)));
        }
    }
    out.push_str("Trending posts (most engaging first):\n");
    for (i, p) in posts.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{} likes, {} reposts] {}\n",
            i + 1,
            p.like_count,
            p.repost_count,
            clip(&p.text)
        ));
    }
    out
}

fn clip(s: &str) -> String {
    s.chars().take(PROMPT_POST_CHARS).collect()
}

pub struct Composer {
    store: Arc<dyn PostStore>,
    generator: DynGenerator,
    publisher: Arc<dyn Publisher>,
    settings: ComposerSettings,
    cooldown: Mutex<PostCooldown>,
    log: PublishLog,
}

impl Composer {
    pub fn new(
        store: Arc<dyn PostStore>,
        generator: DynGenerator,
        publisher: Arc<dyn Publisher>,
        settings: ComposerSettings,
    ) -> Self {
        let cooldown = Mutex::new(PostCooldown::new(settings.cooldown_secs));
        Self {
            store,
            generator,
            publisher,
            settings,
            cooldown,
            log: PublishLog::with_capacity(500),
        }
    }

    pub fn published(&self, n: usize) -> Vec<PublishedPost> {
        self.log.snapshot_last_n(n)
    }

    pub async fn compose_and_publish(&self) -> Result<ComposeOutcome, ComposeError> {
        let now = Utc::now();
        let next = self
            .cooldown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_allowed_at(now);
        if let Some(next_allowed_at) = next {
            info!(%next_allowed_at, "compose skipped, cooling down");
            return Ok(ComposeOutcome::CoolingDown { next_allowed_at });
        }

        let top = self
            .store
            .top_by_engagement(self.settings.prompt_posts)
            .await?;
        let ranked = rank_for_prompt(top);
        let Some(target) = ranked.first() else {
            return Ok(ComposeOutcome::NothingToCompose);
        };

        let (mode, reply_to) = if self.settings.reply_to_top {
            (
                PromptMode::Reply {
                    target: &target.text,
                },
                Some(target.external_id.clone()),
            )
        } else {
            (PromptMode::NewPost, None)
        };
        let prompt = build_prompt(&self.settings.topic, &ranked, mode);

        let result = self.generate_and_publish(&prompt, reply_to.as_deref()).await;
        let (id, text) = match result {
            Ok(v) => v,
            Err(e) => {
                counter!("compose_errors_total").increment(1);
                return Err(e);
            }
        };

        let published_at = Utc::now();
        self.cooldown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_post(published_at);
        let post = PublishedPost {
            id,
            text,
            reply_to,
            published_at,
        };
        self.log.push(post.clone());
        counter!("compose_published_total").increment(1);
        info!(
            id = %post.id,
            reply_to = ?post.reply_to,
            generator = self.generator.provider_name(),
            publisher = self.publisher.name(),
            "published post"
        );
        Ok(ComposeOutcome::Published(post))
    }

    async fn generate_and_publish(
        &self,
        prompt: &str,
        reply_to: Option<&str>,
    ) -> Result<(String, String), ComposeError> {
        let text = self.generator.generate(prompt).await?;
        let id = self.publisher.publish(&text, reply_to).await?;
        Ok((id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn stored(id: &str, likes: u64, reposts: u64, text: &str) -> StoredRecord {
        StoredRecord {
            id: 0,
            external_id: id.into(),
            source: "query:t".into(),
            text: text.into(),
            like_count: likes,
            repost_count: reposts,
            created_at: Utc::now(),
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn rank_uses_likes_then_reposts() {
        let ranked = rank_for_prompt(vec![
            stored("a", 5, 1, ""),
            stored("b", 5, 9, ""),
            stored("c", 7, 0, ""),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn prompt_lists_posts_and_reply_target() {
        let posts = vec![stored("1", 10, 2, "donkeys are great")];
        let p = build_prompt(
            "donkeys",
            &posts,
            PromptMode::Reply {
                target: "donkeys are great",
            },
        );
        assert!(p.starts_with("Topic: donkeys\n"));
        assert!(p.contains("Post to reply to: donkeys are great"));
        assert!(p.contains("1. [10 likes, 2 reposts] donkeys are great"));
    }
}
