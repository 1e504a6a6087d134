// tests/ingest_loop.rs
//
// One ingestion pass over several sources: ordering, failure isolation,
// and what reaches the store.

mod common;

use std::sync::Arc;

use common::{frozen_clock, item, t0, CountingStore, ScriptedReader};
use donkee::ingest::fetch::Fetcher;
use donkee::ingest::persist::Persister;
use donkee::ingest::report::SourceStatus;
use donkee::ingest::run_once;
use donkee::ingest::source::SourceSet;
use donkee::ingest::types::{FetchFailure, ReadError};
use donkee::store::PostStore;

fn four_sources() -> SourceSet {
    SourceSet::new("donkeys", ["111", "222", "333"])
}

#[tokio::test]
async fn failing_second_source_does_not_stop_the_rest() {
    let reader = Arc::new(
        ScriptedReader::new()
            .on("query:donkeys", |_| Ok(vec![item("q1", 1, 0)]))
            .on("list:111", |_| Err(ReadError::Network("connection refused".into())))
            .on("list:222", |_| Ok(vec![item("l2", 2, 0)]))
            .on("list:333", |_| Ok(vec![item("l3", 3, 0)])),
    );
    let store = Arc::new(CountingStore::new());
    let fetcher = Fetcher::new(reader.clone());
    let persister = Persister::new(store.clone());

    let report = run_once(&four_sources(), &fetcher, &persister, 100).await;

    assert_eq!(
        reader.labels_called(),
        vec!["query:donkeys", "list:111", "list:222", "list:333"]
    );
    let statuses: Vec<SourceStatus> = report.sources.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SourceStatus::Items,
            SourceStatus::Failed,
            SourceStatus::Items,
            SourceStatus::Items
        ]
    );
    assert!(matches!(
        report.sources[1].failure,
        Some(FetchFailure::Other { .. })
    ));
    assert_eq!(report.stored(), 3);
    assert_eq!(report.failed_sources(), 1);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_source_is_reported_and_loop_moves_on() {
    let reader = Arc::new(
        ScriptedReader::new()
            .on("list:111", |_| {
                Err(ReadError::RateLimited {
                    reset_at: t0() + chrono::Duration::seconds(2),
                })
            })
            .on("list:222", |_| Ok(vec![item("l2", 0, 0)])),
    );
    let store = Arc::new(CountingStore::new());
    let fetcher = Fetcher::new(reader.clone()).with_clock(frozen_clock);
    let persister = Persister::new(store.clone());

    let report = run_once(&four_sources(), &fetcher, &persister, 100).await;

    assert_eq!(reader.calls_for("list:111"), 5);
    assert_eq!(reader.calls_for("list:222"), 1);
    assert_eq!(reader.calls_for("list:333"), 1);
    assert_eq!(
        report.sources[1].failure,
        Some(FetchFailure::RateLimitExhausted { attempts: 5 })
    );
    assert_eq!(report.stored(), 1);
}

#[tokio::test]
async fn empty_sources_never_touch_the_store() {
    let reader = Arc::new(ScriptedReader::new());
    let store = Arc::new(CountingStore::new());
    let fetcher = Fetcher::new(reader.clone());
    let persister = Persister::new(store.clone());

    let report = run_once(&four_sources(), &fetcher, &persister, 100).await;

    assert_eq!(reader.calls().len(), 4);
    assert!(report
        .sources
        .iter()
        .all(|s| s.status == SourceStatus::Empty));
    assert_eq!(store.inserts(), 0);
}

#[tokio::test]
async fn persist_error_skips_only_that_item() {
    let reader = Arc::new(ScriptedReader::new().on("query:donkeys", |_| {
        Ok(vec![item("a", 0, 0), item("boom", 0, 0), item("c", 0, 0)])
    }));
    let store = Arc::new(CountingStore::failing_on(&["boom"]));
    let fetcher = Fetcher::new(reader.clone());
    let persister = Persister::new(store.clone());

    let report = run_once(&SourceSet::new("donkeys", Vec::<String>::new()), &fetcher, &persister, 100).await;

    let src = &report.sources[0];
    assert_eq!(src.fetched, 3);
    assert_eq!(src.stored, 2);
    assert_eq!(src.persist_errors, 1);
    assert_eq!(store.inserts(), 3);
    assert!(store.get("c").await.unwrap().is_some());
}

#[tokio::test]
async fn same_post_from_two_sources_is_stored_once() {
    let reader = Arc::new(
        ScriptedReader::new()
            .on("query:donkeys", |_| Ok(vec![item("shared", 10, 2)]))
            .on("list:111", |_| Ok(vec![item("shared", 10, 2), item("own", 1, 0)])),
    );
    let store = Arc::new(CountingStore::new());
    let fetcher = Fetcher::new(reader.clone());
    let persister = Persister::new(store.clone());

    let report = run_once(&SourceSet::new("donkeys", ["111"]), &fetcher, &persister, 100).await;

    assert_eq!(report.stored(), 2);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(store.count().await.unwrap(), 2);
    let shared = store.get("shared").await.unwrap().expect("stored");
    assert_eq!(shared.source, "query:donkeys", "first source wins");
}

#[tokio::test]
async fn second_run_sees_only_duplicates() {
    let reader = Arc::new(
        ScriptedReader::new().on("query:donkeys", |_| Ok(vec![item("1", 0, 0), item("2", 0, 0)])),
    );
    let store = Arc::new(CountingStore::new());
    let fetcher = Fetcher::new(reader.clone());
    let persister = Persister::new(store.clone());
    let sources = SourceSet::new("donkeys", Vec::<String>::new());

    let first = run_once(&sources, &fetcher, &persister, 100).await;
    let second = run_once(&sources, &fetcher, &persister, 100).await;

    assert_eq!(first.stored(), 2);
    assert_eq!(second.stored(), 0);
    assert_eq!(second.duplicates(), 2);
    assert_eq!(store.count().await.unwrap(), 2);
}
