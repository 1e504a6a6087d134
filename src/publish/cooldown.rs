// src/publish/cooldown.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Minimum spacing between published posts.
/// - First post always allowed.
/// - Inside cooldown, posting is suppressed.
/// - State is updated explicitly via `record_post` after a successful publish.
#[derive(Debug, Clone)]
pub struct PostCooldown {
    cooldown: ChronoDuration,
    last_post_at: Option<DateTime<Utc>>,
}

impl PostCooldown {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown).
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            last_post_at: None,
        }
    }

    /// When the next post becomes allowed, or `None` if it already is.
    pub fn next_allowed_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = self.last_post_at? + self.cooldown;
        (now < next).then_some(next)
    }

    pub fn record_post(&mut self, now: DateTime<Utc>) {
        self.last_post_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_inside_window_only() {
        let mut cd = PostCooldown::new(60);
        let t0 = Utc::now();
        assert_eq!(cd.next_allowed_at(t0), None, "first post is always allowed");
        cd.record_post(t0);

        let t1 = t0 + ChronoDuration::seconds(59);
        assert_eq!(cd.next_allowed_at(t1), Some(t0 + ChronoDuration::seconds(60)));

        let t2 = t0 + ChronoDuration::seconds(60);
        assert_eq!(cd.next_allowed_at(t2), None);
    }

    #[test]
    fn negative_cooldown_means_none() {
        let mut cd = PostCooldown::new(-5);
        let t0 = Utc::now();
        cd.record_post(t0);
        assert_eq!(cd.next_allowed_at(t0), None);
    }
}
