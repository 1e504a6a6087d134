use anyhow::Context;
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish static bot settings.
    pub fn install(interval_secs: u64) -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("compose_published_total", "Posts published by the composer.");
        describe_counter!("compose_errors_total", "Compose attempts that failed.");
        gauge!("scheduler_interval_secs").set(interval_secs as f64);

        Ok(Self { handle })
    }
}
