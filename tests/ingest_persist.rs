// tests/ingest_persist.rs
mod common;

use std::sync::Arc;

use common::{item, t0};
use donkee::ingest::persist::{PersistError, PersistStatus, Persister};
use donkee::ingest::source::Source;
use donkee::ingest::types::RawItem;
use donkee::store::{MemoryStore, PostStore};

fn persister() -> (Persister, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Persister::new(store.clone()), store)
}

#[tokio::test]
async fn duplicate_submission_succeeds_without_second_record() {
    let (p, store) = persister();
    let src = Source::query("donkeys");

    assert_eq!(p.persist(&item("1", 4, 2), &src).await.unwrap(), PersistStatus::Stored);
    assert_eq!(
        p.persist(&item("1", 99, 99), &src).await.unwrap(),
        PersistStatus::Duplicate
    );

    assert_eq!(store.count().await.unwrap(), 1);
    let rec = store.get("1").await.unwrap().unwrap();
    assert_eq!(rec.like_count, 4, "first write is kept");
}

#[tokio::test]
async fn missing_metrics_become_zero() {
    let (p, store) = persister();
    let raw = RawItem::new("m", "no metrics here", t0());
    assert!(raw.like_count.is_none());

    p.persist(&raw, &Source::list("5")).await.unwrap();

    let rec = store.get("m").await.unwrap().unwrap();
    assert_eq!(rec.like_count, 0);
    assert_eq!(rec.repost_count, 0);
    assert!(rec.tags.is_empty());
    assert_eq!(rec.source, "list:5");
}

#[tokio::test]
async fn text_and_tags_are_normalized() {
    let (p, store) = persister();
    let raw = RawItem::new("t", "  Donkeys &amp; mules\n\n are   great ", t0())
        .with_tags(["#Donkeys", "mules", " ", "DONKEYS"]);

    p.persist(&raw, &Source::query("donkeys")).await.unwrap();

    let rec = store.get("t").await.unwrap().unwrap();
    assert_eq!(rec.text, "Donkeys & mules are great");
    let tags: Vec<&str> = rec.tags.iter().map(String::as_str).collect();
    assert_eq!(tags, vec!["donkeys", "mules"]);
}

#[tokio::test]
async fn blank_external_id_is_rejected() {
    let (p, store) = persister();
    let err = p
        .persist(&RawItem::new("  ", "orphan", t0()), &Source::query("donkeys"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::MissingId));
    assert_eq!(store.count().await.unwrap(), 0);
}
