//! Request throttling for the operator routes, via tower-governor.

use std::sync::Arc;

use axum::Router;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};

pub const ENV_RATE_LIMIT: &str = "DONKEE_RATE_LIMIT_PER_MINUTE";

const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests per minute across all callers; 0 turns throttling off.
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32) -> Self {
        Self { requests_per_minute }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_minute > 0
    }

    /// Milliseconds to replenish one request slot.
    fn replenish_ms(&self) -> u64 {
        (60_000 / u64::from(self.requests_per_minute.max(1))).max(1)
    }
}

/// Adds the governor as a route layer on `router`.
///
/// The bucket is shared by every caller (the routes sit behind one operator
/// key), holds `requests_per_minute` slots and refills one slot every
/// `60s / requests_per_minute`. Excess requests get `429 Too Many Requests`.
pub fn apply<S>(router: Router<S>, cfg: RateLimitConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !cfg.is_enabled() {
        return router;
    }
    let Some(governor) = GovernorConfigBuilder::default()
        .key_extractor(GlobalKeyExtractor)
        .per_millisecond(cfg.replenish_ms())
        .burst_size(cfg.requests_per_minute)
        .finish()
    else {
        tracing::warn!(?cfg, "invalid rate limit config, routes left unthrottled");
        return router;
    };
    router.route_layer(GovernorLayer {
        config: Arc::new(governor),
    })
}
