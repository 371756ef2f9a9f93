//! TTL cache-on-fetch used by [`crate::manager::RegistrationDiscoveryManager`]
//! (spec.md §4.12, §8 invariant 9: cache fallback).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

/// A read-write map guarded by a single mutex, double-checked on
/// creation (spec.md §5 "Stream-manager cache" shared-resource pattern,
/// applied here to registry entries instead of streams).
pub struct TtlCache<T: Clone> {
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<T: Clone> TtlCache<T> {
    /// Start an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key` only if it is still within
    /// `ttl` of when it was stored.
    #[must_use]
    pub fn fresh(&self, key: &str, ttl: Duration) -> Option<T> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        entries.get(key).filter(|e| e.fetched_at.elapsed() < ttl).map(|e| e.value.clone())
    }

    /// Insert or refresh an entry, stamping it with the current time.
    pub fn insert(&self, key: String, value: T) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(key, Entry { value, fetched_at: Instant::now() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn fresh_entry_is_served_without_refetch() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.insert("k".into(), 1);
        assert_eq!(cache.fresh("k", Duration::from_secs(60)), Some(1));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.insert("k".into(), 1);
        sleep(Duration::from_millis(20));
        assert_eq!(cache.fresh("k", Duration::from_millis(5)), None);
    }

    #[test]
    fn missing_key_is_not_fresh() {
        let cache: TtlCache<i32> = TtlCache::new();
        assert_eq!(cache.fresh("missing", Duration::from_secs(60)), None);
    }
}
