//! Donkee binary entrypoint.
//! Boots the Axum HTTP server and the background ingest/compose scheduler.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;

use donkee::api::{self, AppState};
use donkee::bootstrap::Runtime;
use donkee::config::BotConfig;
use donkee::metrics::Metrics;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    donkee::telemetry::init_tracing();

    let cfg = BotConfig::from_env()?;
    let metrics = Metrics::install(cfg.interval_secs)?;
    let runtime = Arc::new(Runtime::from_config(cfg).await?);

    let interval = Duration::from_secs(runtime.cfg.interval_secs);
    donkee::scheduler::spawn(runtime.bot.clone(), interval);

    // Close the pool when the platform stops the process.
    let on_stop = runtime.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received, closing store");
            on_stop.shutdown().await;
        }
    });

    let state = AppState::new(runtime.bot.clone())
        .with_api_key(runtime.cfg.api_key.clone())
        .with_rate_limit(runtime.cfg.rate_limit)
        .with_metrics(metrics.handle.clone());
    let router = api::router(state);

    Ok(router.into())
}
