//! Time-bounded key/value cache
//!
//! Entries are point-in-time snapshots stamped with the instant they were
//! observed. A lookup is a hit only while `now - observed_at < ttl`; expired
//! entries are left in place until overwritten or purged.
//!
//! Concurrent writers to the same key follow last-writer-wins.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};

/// A cached value together with its observation time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub observed_at: Instant,
}

/// A cache hit: the value and how old it was when read.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub observed_at: Instant,
    pub age: Duration,
}

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct TtlCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    purged: AtomicU64,
}

/// Snapshot of [`TtlCacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlCacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub purged: u64,
}

impl TtlCacheStats {
    pub fn snapshot(&self) -> TtlCacheStatsSnapshot {
        TtlCacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}

/// TTL cache parameterized by its clock source.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: TtlCacheStats,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Cache backed by the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            stats: TtlCacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Return the entry if it is still inside its validity window.
    pub fn get(&self, key: &K) -> Option<Cached<V>> {
        let now = self.clock.now();
        let hit = self.entries.get(key).and_then(|entry| {
            let age = now.saturating_duration_since(entry.observed_at);
            (age < self.ttl).then(|| Cached {
                value: entry.value.clone(),
                observed_at: entry.observed_at,
                age,
            })
        });

        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Store a fresh snapshot, overwriting any previous entry.
    /// Returns the observation instant.
    pub fn insert(&self, key: K, value: V) -> Instant {
        let observed_at = self.clock.now();
        self.entries.insert(key, CacheEntry { value, observed_at });
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
        observed_at
    }

    /// Drop every entry whose validity window has closed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.observed_at) < self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        self.stats
            .purged
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> TtlCacheStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache(ttl_secs: u64) -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_hit_inside_window() {
        let (cache, clock) = cache(60);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(59));

        let hit = cache.get(&"a".to_string()).unwrap();
        assert_eq!(hit.value, 1);
        assert_eq!(hit.age, Duration::from_secs(59));
    }

    #[test]
    fn test_miss_at_exact_ttl() {
        let (cache, clock) = cache(60);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(60));

        assert!(cache.get(&"a".to_string()).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_restarts_window() {
        let (cache, clock) = cache(10);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("a".into(), 2);
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get(&"a".to_string()).unwrap().value, 2);
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache(10);
        cache.insert("old".into(), 1);
        clock.advance(Duration::from_secs(11));
        cache.insert("new".into(), 2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().purged, 1);
    }
}
