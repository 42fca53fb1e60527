//! Bounded concurrent cache of resolved entity ids.
//!
//! Entries are written on a persistent-store hit or when a freshly created entity is
//! announced through `notify`. They leave only through TTL expiry or least-recently-used
//! eviction at capacity. Nothing invalidates an entry when the underlying entity is later
//! deleted: a warm entry keeps serving the id it was created with until it ages out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::id::EntityId;
use super::identifier::CacheKey;
use crate::config::CacheConfig;

/// Fraction of `max_entries` evicted at once when the cache is full.
const EVICTION_BATCH_DIVISOR: usize = 100;

struct CacheEntry {
    id: EntityId,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
    last_used: Instant,
}

impl CacheEntry {
    fn new(id: EntityId, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            id,
            expires_at: now.checked_add(ttl),
            last_used: now,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// Concurrent key → [`EntityId`] cache bounded by entry count and TTL.
///
/// Backed by a sharded `DashMap`, so `get` and `put` are safe from any thread without
/// external locking. Per key, the last write wins. Concurrent `put`s may briefly exceed
/// `max_entries`; each `put` trims the cache back under the bound before returning.
pub struct EntityIdCache {
    entries: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl EntityIdCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<EntityId> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_expired(now) {
                drop(entry);
                self.entries
                    .remove_if(key, |_, entry| entry.is_expired(now));
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                return None;
            }

            entry.last_used = now;
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.id);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: CacheKey, id: EntityId) {
        if self.config.max_entries == 0 {
            return;
        }

        self.entries
            .insert(key.clone(), CacheEntry::new(id, self.config.ttl()));
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);

        while self.entries.len() > self.config.max_entries {
            if self.make_room(&key) == 0 {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove all expired entries, returning how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            inserts: self.stats.inserts.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop expired entries, then the least recently used ones other than `keep` if still
    /// over capacity. Returns how many entries were removed.
    fn make_room(&self, keep: &CacheKey) -> usize {
        let expired = self.cleanup();
        if self.entries.len() <= self.config.max_entries {
            return expired;
        }

        let batch = (self.config.max_entries / EVICTION_BATCH_DIVISOR).max(1);
        let mut candidates: Vec<(Instant, CacheKey)> = self
            .entries
            .iter()
            .filter(|entry| entry.key() != keep)
            .map(|entry| (entry.last_used, entry.key().clone()))
            .collect();

        if candidates.len() > batch {
            candidates.select_nth_unstable_by_key(batch - 1, |(last_used, _)| *last_used);
            candidates.truncate(batch);
        }

        let mut evicted = 0;
        for (_, key) in candidates {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.stats
            .evictions
            .fetch_add(evicted as u64, Ordering::Relaxed);

        tracing::trace!(
            target: "mirror::entity::cache",
            evicted,
            expired,
            remaining = self.entries.len(),
            "Evicted least recently used entity ids"
        );

        expired + evicted
    }
}

impl Default for EntityIdCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::id::EntityType;
    use std::sync::Arc;

    fn key(n: u8) -> CacheKey {
        CacheKey::alias(0, 0, &[n])
    }

    fn account(num: u64) -> EntityId {
        EntityId::new(0, 0, num, EntityType::Account)
    }

    fn config(max_entries: usize, ttl_secs: u64) -> CacheConfig {
        CacheConfig {
            max_entries,
            ttl_secs,
        }
    }

    #[test]
    fn test_put_and_get() {
        let cache = EntityIdCache::default();
        assert_eq!(cache.get(&key(1)), None);

        cache.put(key(1), account(100));
        assert_eq!(cache.get(&key(1)), Some(account(100)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = EntityIdCache::default();
        cache.put(key(1), account(100));
        cache.put(key(1), account(200));

        assert_eq!(cache.get(&key(1)), Some(account(200)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_not_returned() {
        let cache = EntityIdCache::new(config(10, 0));
        cache.put(key(1), account(100));

        assert_eq!(cache.get(&key(1)), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_bounded_by_max_entries() {
        let cache = EntityIdCache::new(config(3, 3600));
        for n in 0..10 {
            cache.put(key(n), account(u64::from(n)));
        }

        assert!(cache.len() <= 3);
        // The newest entry always survives its own insertion.
        assert_eq!(cache.get(&key(9)), Some(account(9)));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = EntityIdCache::new(config(2, 3600));
        cache.put(key(1), account(1));
        std::thread::sleep(Duration::from_millis(5));
        cache.put(key(2), account(2));
        std::thread::sleep(Duration::from_millis(5));

        // Touch key 1 so key 2 becomes the eviction candidate.
        assert!(cache.get(&key(1)).is_some());
        cache.put(key(3), account(3));

        assert_eq!(cache.get(&key(1)), Some(account(1)));
        assert_eq!(cache.get(&key(2)), None);
        assert_eq!(cache.get(&key(3)), Some(account(3)));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let cache = EntityIdCache::new(config(10, u64::MAX));
        cache.put(key(1), account(100));

        assert_eq!(cache.get(&key(1)), Some(account(100)));
        assert_eq!(cache.cleanup(), 0);
    }

    #[test]
    fn test_eviction_stats_count_removed_entries() {
        let cache = EntityIdCache::new(config(2, 3600));
        for n in 0..5 {
            cache.put(key(n), account(u64::from(n)));
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let cache = Arc::new(EntityIdCache::new(config(16, 3600)));
        let handles: Vec<_> = (0..8u8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for n in 0..100u8 {
                        cache.put(CacheKey::alias(0, 0, &[t, n]), account(u64::from(n)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16, "len = {}", cache.len());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = EntityIdCache::new(config(0, 3600));
        cache.put(key(1), account(1));
        assert_eq!(cache.get(&key(1)), None);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(EntityIdCache::default());
        let handles: Vec<_> = (0..8u8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for n in 0..50u8 {
                        let k = CacheKey::alias(0, 0, &[t, n]);
                        cache.put(k.clone(), account(u64::from(t) * 1000 + u64::from(n)));
                        assert!(cache.get(&k).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
        assert_eq!(
            cache.get(&CacheKey::alias(0, 0, &[7, 49])),
            Some(account(7049))
        );
    }
}
