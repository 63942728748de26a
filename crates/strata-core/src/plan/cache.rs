use crate::plan::{QueryFingerprint, node::PhysicalPlan};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

///
/// PlanCache
///
/// Bounded fingerprint-to-plan map with LRU eviction. One instance lives
/// on each engine handle, never process-wide, and teardown drops all
/// entries with it. Get/put take an async lock so concurrent tasks can
/// share the handle; hit/miss counters are best-effort relaxed atomics.
///

pub struct PlanCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheInner {
    entries: HashMap<QueryFingerprint, CacheSlot>,
    tick: u64,
}

struct CacheSlot {
    entry: Arc<CachedPlan>,
    last_used: u64,
}

///
/// CachedPlan
///

#[derive(Clone, Debug, PartialEq)]
pub struct CachedPlan {
    pub plan: PhysicalPlan,
    pub cost: f64,
}

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl PlanCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, fingerprint: &QueryFingerprint) -> Option<Arc<CachedPlan>> {
        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;

        match inner.entries.get_mut(fingerprint) {
            Some(slot) => {
                slot.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&slot.entry))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn put(&self, fingerprint: QueryFingerprint, entry: CachedPlan) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;

        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&fingerprint) {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| *key)
            {
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            fingerprint,
            CacheSlot {
                entry: Arc::new(entry),
                last_used: tick,
            },
        );
    }

    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.inner.lock().await.entries.len(),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::node::FullScanNode;
    use crate::predicate::Predicate;
    use crate::query::Query;

    fn fingerprint(n: i64) -> QueryFingerprint {
        // Distinct shapes come from distinct limits.
        let spec = Query::new("User")
            .filter(Predicate::eq("city", "Tokyo"))
            .limit(n as usize)
            .build();
        QueryFingerprint::of(&spec)
    }

    fn plan() -> CachedPlan {
        CachedPlan {
            plan: PhysicalPlan::FullScan(FullScanNode {
                record_type: Some("User".into()),
                filter: None,
            }),
            cost: 1.0,
        }
    }

    #[tokio::test]
    async fn get_returns_what_put_stored() {
        let cache = PlanCache::new(4);
        let fp = fingerprint(1);
        assert!(cache.get(&fp).await.is_none());

        cache.put(fp, plan()).await;
        let cached = cache.get(&fp).await.expect("hit");
        assert_eq!(*cached, plan());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = PlanCache::new(2);
        cache.put(fingerprint(1), plan()).await;
        cache.put(fingerprint(2), plan()).await;

        // Touch 1 so 2 becomes the eviction victim.
        cache.get(&fingerprint(1)).await.expect("hit");
        cache.put(fingerprint(3), plan()).await;

        assert!(cache.get(&fingerprint(1)).await.is_some());
        assert!(cache.get(&fingerprint(2)).await.is_none());
        assert!(cache.get(&fingerprint(3)).await.is_some());
        assert_eq!(cache.stats().await.size, 2);
    }

    #[tokio::test]
    async fn zero_capacity_cache_never_stores() {
        let cache = PlanCache::new(0);
        cache.put(fingerprint(1), plan()).await;
        assert!(cache.get(&fingerprint(1)).await.is_none());
    }
}
