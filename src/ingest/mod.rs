// src/ingest/mod.rs
pub mod fetch;
pub mod persist;
pub mod providers;
pub mod report;
pub mod source;
pub mod types;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::ingest::fetch::Fetcher;
use crate::ingest::persist::{PersistStatus, Persister};
use crate::ingest::report::{IngestReport, SourceReport, SourceStatus};
use crate::ingest::source::SourceSet;
use crate::ingest::types::FetchOutcome;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingest runs.");
        describe_counter!(
            "ingest_items_fetched_total",
            "Items returned by the read API."
        );
        describe_counter!("ingest_items_stored_total", "Items newly persisted.");
        describe_counter!(
            "ingest_duplicates_total",
            "Items skipped because their external id was already stored."
        );
        describe_counter!(
            "ingest_persist_errors_total",
            "Items that failed to persist."
        );
        describe_counter!(
            "ingest_source_failures_total",
            "Sources that ended a run in a failed state, by reason."
        );
        describe_counter!(
            "ingest_rate_limited_total",
            "Rate-limit responses received from the read API."
        );
        describe_histogram!("ingest_backoff_ms", "Backoff sleep per retry in milliseconds.");
        describe_histogram!("ingest_fetch_ms", "Read API call latency in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when the last ingest run finished.");
    });
}

/// Normalize post text: decode HTML entities, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode (the read API escapes &, <, >)
    let out = html_escape::decode_html_entities(s).to_string();

    // 2) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    let mut out = re_ws.replace_all(&out, " ").trim().to_string();

    // 3) Length cap: 4000 chars (long-form posts)
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }

    out
}

/// Run one ingestion pass over every source, strictly in order.
///
/// Failures are per source (fetch) or per item (persist) and land in the
/// report; nothing here aborts the run.
pub async fn run_once(
    sources: &SourceSet,
    fetcher: &Fetcher,
    persister: &Persister,
    max_items: u32,
) -> IngestReport {
    ensure_metrics_described();
    let started_at = Utc::now();
    let mut reports = Vec::with_capacity(sources.len());

    for source in sources.iter() {
        let report = match fetcher.fetch(&source, max_items).await {
            FetchOutcome::Items(items) => {
                counter!("ingest_items_fetched_total").increment(items.len() as u64);
                let mut report = SourceReport {
                    status: SourceStatus::Items,
                    fetched: items.len(),
                    ..SourceReport::empty(source.clone())
                };
                for item in &items {
                    match persister.persist(item, &source).await {
                        Ok(PersistStatus::Stored) => report.stored += 1,
                        Ok(PersistStatus::Duplicate) => report.duplicates += 1,
                        Err(e) => {
                            warn!(error = %e, source = %source, "persist error");
                            report.persist_errors += 1;
                        }
                    }
                }
                report
            }
            FetchOutcome::Empty => SourceReport::empty(source),
            FetchOutcome::Failed(failure) => {
                counter!("ingest_source_failures_total", "reason" => failure.reason())
                    .increment(1);
                SourceReport::failed(source, failure)
            }
            FetchOutcome::RateLimited { retry_after } => {
                // Not produced by `Fetcher::fetch`; recorded as a failure if it ever is.
                warn!(source = %source, ?retry_after, "unresolved rate limit outcome");
                SourceReport::failed(
                    source,
                    types::FetchFailure::RateLimitExhausted {
                        attempts: fetcher.max_attempts(),
                    },
                )
            }
        };
        reports.push(report);
    }

    let report = IngestReport {
        started_at,
        finished_at: Utc::now(),
        sources: reports,
    };

    // Telemetry
    counter!("ingest_runs_total").increment(1);
    counter!("ingest_items_stored_total").increment(report.stored() as u64);
    counter!("ingest_duplicates_total").increment(report.duplicates() as u64);
    counter!("ingest_persist_errors_total").increment(report.persist_errors() as u64);
    gauge!("ingest_last_run_ts").set(report.finished_at.timestamp() as f64);

    info!(
        target: "ingest",
        sources = report.sources.len(),
        fetched = report.fetched(),
        stored = report.stored(),
        duplicates = report.duplicates(),
        failed_sources = report.failed_sources(),
        "ingest run finished"
    );

    report
}
