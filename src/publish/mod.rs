// src/publish/mod.rs
pub mod cooldown;
pub mod history;
pub mod x;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;

pub use cooldown::PostCooldown;
pub use history::{PublishLog, PublishedPost};
pub use x::XPublisher;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("refusing to publish empty text")]
    EmptyText,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Outbound post capability. Returns the platform id of the new post.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<String, PublishError>;
    fn name(&self) -> &'static str;
}

/// Logs instead of posting. Used when no user token is configured.
#[derive(Debug, Default)]
pub struct DryRunPublisher {
    seq: AtomicU64,
}

impl DryRunPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<String, PublishError> {
        if text.trim().is_empty() {
            return Err(PublishError::EmptyText);
        }
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(reply_to, text, "dry-run publish");
        Ok(format!("dry-run-{n}"))
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_ids_are_sequential() {
        let p = DryRunPublisher::new();
        assert_eq!(p.publish("a", None).await.unwrap(), "dry-run-1");
        assert_eq!(p.publish("b", Some("9")).await.unwrap(), "dry-run-2");
        assert!(matches!(
            p.publish("  ", None).await,
            Err(PublishError::EmptyText)
        ));
    }
}
