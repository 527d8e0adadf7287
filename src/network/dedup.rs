// src/network/dedup.rs
// Time-bounded seen set for gossip message ids.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_SEEN_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct SeenCache {
    ttl: Duration,
    seen: HashMap<String, Instant>,
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_TTL)
    }
}

impl SeenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: HashMap::new(),
        }
    }

    /// Drop ids older than the TTL.
    pub fn purge(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.seen
            .retain(|_, marked| now.saturating_duration_since(*marked) <= ttl);
    }

    pub fn is_new_at(&mut self, id: &str, now: Instant) -> bool {
        self.purge(now);
        !self.seen.contains_key(id)
    }

    /// Record `id` if unseen. Returns true when it was new.
    pub fn check_and_mark_at(&mut self, id: &str, now: Instant) -> bool {
        if !self.is_new_at(id, now) {
            return false;
        }
        self.seen.insert(id.to_string(), now);
        true
    }

    pub fn check_and_mark(&mut self, id: &str) -> bool {
        self.check_and_mark_at(id, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_once() {
        let mut cache = SeenCache::default();
        assert!(cache.check_and_mark("a"));
        assert!(!cache.check_and_mark("a"));
        assert!(cache.check_and_mark("b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = SeenCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        assert!(cache.check_and_mark_at("m", t0));
        assert!(!cache.is_new_at("m", t0 + Duration::from_secs(299)));
        assert!(cache.is_new_at("m", t0 + Duration::from_secs(301)));
        assert!(cache.is_empty());
    }
}
