// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::bot::Bot;
use crate::compose::ComposeOutcome;

/// Spawn the periodic ingest + compose loop. First tick fires immediately.
pub fn spawn(bot: Arc<Bot>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow run (long backoff) pushes the schedule instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let (report, composed) = bot.tick().await;

            tracing::info!(
                target: "scheduler",
                fetched = report.fetched(),
                stored = report.stored(),
                failed_sources = report.failed_sources(),
                "ingest tick"
            );
            match composed {
                Ok(ComposeOutcome::Published(p)) => {
                    tracing::info!(target: "scheduler", id = %p.id, "compose tick published")
                }
                Ok(other) => tracing::debug!(target: "scheduler", outcome = ?other, "compose tick"),
                Err(e) => tracing::warn!(target: "scheduler", error = %e, "compose tick failed"),
            }
        }
    })
}
