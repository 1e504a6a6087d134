//! In-memory log of what the bot published, for /debug/published.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub text: String,
    pub reply_to: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PublishLog {
    inner: Mutex<VecDeque<PublishedPost>>,
    cap: usize,
}

impl PublishLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, post: PublishedPost) {
        let mut v = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        v.push_back(post);
        while v.len() > self.cap {
            v.pop_front();
        }
    }

    /// Oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<PublishedPost> {
        let v = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let start = v.len().saturating_sub(n);
        v.iter().skip(start).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> PublishedPost {
        PublishedPost {
            id: id.into(),
            text: "t".into(),
            reply_to: None,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn drops_oldest_beyond_cap() {
        let log = PublishLog::with_capacity(2);
        log.push(post("1"));
        log.push(post("2"));
        log.push(post("3"));
        let ids: Vec<String> = log.snapshot_last_n(10).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(log.snapshot_last_n(1)[0].id, "3");
    }
}
