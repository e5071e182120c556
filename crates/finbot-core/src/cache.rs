//! In-memory statistics cache using Moka
//!
//! A read-through cache in front of the statistics queries. Entries are bounded
//! by capacity (least-recently-used eviction) and by a per-entry time-to-live,
//! and can be dropped by exact key or by key prefix. A cache that is disabled
//! or misbehaving only ever causes misses; callers recompute from the store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use moka::Expiry;
use tracing::{debug, warn};

use crate::models::{CategoryTotal, StatsSnapshot};

/// Cache sizing, injected at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries per cache; 0 disables caching
    pub capacity: u64,
    /// Time-to-live used when `set` is not given one
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(300),
        }
    }
}

/// What to drop from the cache
#[derive(Debug, Clone, Copy)]
pub enum Invalidation<'a> {
    Key(&'a str),
    Prefix(&'a str),
}

/// Key prefix shared by every entry of one user.
///
/// The trailing separator keeps user 1 from matching user 12.
pub fn user_prefix(user_id: i64) -> String {
    format!("user:{}:", user_id)
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expire each entry after the TTL it was stored with
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// String-keyed cache with LRU eviction and per-entry TTL
pub struct TtlCache<V> {
    name: &'static str,
    inner: Option<Cache<String, Entry<V>>>,
    default_ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        let inner = (config.capacity > 0).then(|| {
            Cache::builder()
                .name(name)
                .max_capacity(config.capacity)
                .eviction_policy(EvictionPolicy::lru())
                .expire_after(PerEntryTtl)
                .support_invalidation_closures()
                .build()
        });

        if inner.is_none() {
            debug!(cache = name, "Cache disabled (capacity 0)");
        }

        Self {
            name,
            inner,
            default_ttl: config.ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.as_ref()?;
        match inner.get(key) {
            Some(entry) => {
                debug!(cache = self.name, key, "Cache hit");
                Some(entry.value)
            }
            None => {
                debug!(cache = self.name, key, "Cache miss");
                None
            }
        }
    }

    /// Store a value; `ttl` of `None` uses the configured default
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let ttl = ttl.unwrap_or(self.default_ttl);
        inner.insert(key.into(), Entry { value, ttl });
    }

    pub fn invalidate(&self, target: Invalidation<'_>) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };

        match target {
            Invalidation::Key(key) => {
                debug!(cache = self.name, key, "Invalidating key");
                inner.invalidate(key);
            }
            Invalidation::Prefix(prefix) => {
                debug!(cache = self.name, prefix, "Invalidating prefix");
                let owned = prefix.to_string();
                if let Err(e) = inner.invalidate_entries_if(move |k, _| k.starts_with(&owned)) {
                    // Serving stale totals is worse than recomputing everything
                    warn!(cache = self.name, error = %e, "Prefix invalidation failed, flushing cache");
                    inner.invalidate_all();
                }
            }
        }
    }

    /// Number of live entries, after applying pending evictions
    pub fn entry_count(&self) -> u64 {
        match self.inner.as_ref() {
            Some(inner) => {
                inner.run_pending_tasks();
                inner.entry_count()
            }
            None => 0,
        }
    }
}

/// The statistics cache service: one typed cache per aggregation result.
///
/// Each user has a generation counter that every invalidation bumps. A result
/// computed from the store is only stored if the user's generation is still
/// the one taken before the store was read, so a computation that overlaps a
/// write cannot put pre-write totals back into the cache.
pub struct StatsCache {
    snapshots: TtlCache<StatsSnapshot>,
    breakdowns: TtlCache<Vec<CategoryTotal>>,
    generations: Mutex<HashMap<i64, u64>>,
}

impl StatsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            snapshots: TtlCache::new("stats_snapshots", &config),
            breakdowns: TtlCache::new("stats_breakdowns", &config),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        })
    }

    pub fn snapshots(&self) -> &TtlCache<StatsSnapshot> {
        &self.snapshots
    }

    pub fn breakdowns(&self) -> &TtlCache<Vec<CategoryTotal>> {
        &self.breakdowns
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<i64, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current generation of a user; take it before reading the store
    pub fn generation(&self, user_id: i64) -> u64 {
        self.generations().get(&user_id).copied().unwrap_or(0)
    }

    /// Store a user's result unless the user was invalidated after
    /// `generation` was taken. Returns whether the value was stored.
    pub fn store_if_current<V>(
        &self,
        cache: &TtlCache<V>,
        user_id: i64,
        generation: u64,
        key: String,
        value: V,
    ) -> bool
    where
        V: Clone + Send + Sync + 'static,
    {
        // Held across the insert so an invalidation cannot slip in between
        let generations = self.generations();
        if generations.get(&user_id).copied().unwrap_or(0) != generation {
            debug!(
                cache = cache.name,
                user_id,
                key,
                "Discarding result computed before invalidation"
            );
            return false;
        }
        cache.set(key, value, None);
        true
    }

    /// Drop every cached result for a user
    pub fn invalidate_user(&self, user_id: i64) {
        let mut generations = self.generations();
        *generations.entry(user_id).or_insert(0) += 1;

        let prefix = user_prefix(user_id);
        self.snapshots.invalidate(Invalidation::Prefix(&prefix));
        self.breakdowns.invalidate(Invalidation::Prefix(&prefix));
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: u64, ttl: Duration) -> TtlCache<u32> {
        TtlCache::new("test", &CacheConfig { capacity, ttl })
    }

    #[test]
    fn test_set_then_get() {
        let c = cache(10, Duration::from_secs(60));
        assert_eq!(c.get("a"), None);

        c.set("a", 1, None);
        assert_eq!(c.get("a"), Some(1));

        c.set("a", 2, None);
        assert_eq!(c.get("a"), Some(2));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let c = cache(10, Duration::from_secs(60));
        c.set("short", 1, Some(Duration::from_millis(50)));
        c.set("long", 2, None);

        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(c.get("short"), None);
        assert_eq!(c.get("long"), Some(2));
    }

    #[test]
    fn test_invalidate_key() {
        let c = cache(10, Duration::from_secs(60));
        c.set("a", 1, None);
        c.set("b", 2, None);

        c.invalidate(Invalidation::Key("a"));

        assert_eq!(c.get("a"), None);
        assert_eq!(c.get("b"), Some(2));
    }

    #[test]
    fn test_invalidate_prefix_only_touches_matching_user() {
        let c = cache(10, Duration::from_secs(60));
        c.set(format!("{}summary", user_prefix(1)), 1, None);
        c.set(format!("{}by_category", user_prefix(1)), 2, None);
        c.set(format!("{}summary", user_prefix(12)), 12, None);

        c.invalidate(Invalidation::Prefix(&user_prefix(1)));

        assert_eq!(c.get("user:1:summary"), None);
        assert_eq!(c.get("user:1:by_category"), None);
        assert_eq!(c.get("user:12:summary"), Some(12));
    }

    #[test]
    fn test_entries_set_after_prefix_invalidation_are_kept() {
        let c = cache(10, Duration::from_secs(60));
        c.set("user:1:summary", 1, None);
        c.invalidate(Invalidation::Prefix("user:1:"));
        c.set("user:1:summary", 2, None);

        assert_eq!(c.get("user:1:summary"), Some(2));
    }

    #[test]
    fn test_capacity_bounds_entry_count() {
        let c = cache(3, Duration::from_secs(60));
        for i in 0..20u32 {
            c.set(format!("k{}", i), i, None);
        }

        assert!(c.entry_count() <= 3);
    }

    #[test]
    fn test_disabled_cache_always_misses() {
        let c = cache(0, Duration::from_secs(60));
        assert!(!c.is_enabled());

        c.set("a", 1, None);
        assert_eq!(c.get("a"), None);
        c.invalidate(Invalidation::Prefix("a"));
        assert_eq!(c.entry_count(), 0);
    }

    #[test]
    fn test_stats_cache_invalidate_user_clears_both_caches() {
        use crate::models::{StatsSnapshot, StatsWindow};

        let stats = StatsCache::default();
        let window = StatsWindow::last_days(30);
        stats
            .snapshots()
            .set("user:7:summary", StatsSnapshot::empty(window), None);
        stats.breakdowns().set("user:7:by_category", Vec::new(), None);
        stats
            .snapshots()
            .set("user:8:summary", StatsSnapshot::empty(window), None);

        stats.invalidate_user(7);

        assert!(stats.snapshots().get("user:7:summary").is_none());
        assert!(stats.breakdowns().get("user:7:by_category").is_none());
        assert!(stats.snapshots().get("user:8:summary").is_some());
    }

    #[test]
    fn test_store_if_current_discards_results_from_before_invalidation() {
        use crate::models::{StatsSnapshot, StatsWindow};

        let stats = StatsCache::default();
        let window = StatsWindow::last_days(30);

        // Computation starts, a write lands, then the computation finishes
        let started = stats.generation(7);
        stats.invalidate_user(7);
        let stored = stats.store_if_current(
            stats.snapshots(),
            7,
            started,
            "user:7:summary".to_string(),
            StatsSnapshot::empty(window),
        );
        assert!(!stored);
        assert!(stats.snapshots().get("user:7:summary").is_none());

        // Other users are unaffected
        let other = stats.generation(8);
        assert!(stats.store_if_current(
            stats.snapshots(),
            8,
            other,
            "user:8:summary".to_string(),
            StatsSnapshot::empty(window),
        ));

        // A fresh computation after the write is stored
        let restarted = stats.generation(7);
        assert!(stats.store_if_current(
            stats.snapshots(),
            7,
            restarted,
            "user:7:summary".to_string(),
            StatsSnapshot::empty(window),
        ));
        assert!(stats.snapshots().get("user:7:summary").is_some());
    }
}
