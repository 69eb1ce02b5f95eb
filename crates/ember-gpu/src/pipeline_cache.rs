use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bindings::{CacheStats, LayoutHandle, StageMask};
use crate::pipeline_key::ShaderBoundStateKey;

/// Cache of expensive-to-build, immutable native objects keyed by structural
/// key.
///
/// The build closure runs at most once per distinct key that builds
/// successfully. A failed build inserts nothing, so the next request retries
/// instead of pinning a poisoned entry. Values are `Arc`-shared and identity
/// stable for the cache's lifetime.
///
/// Counters are atomic so the shared-lookup path ([`Self::get`]) can record
/// hits under a read lock; only miss construction needs `&mut self`.
#[derive(Debug)]
pub struct PipelineCache<K, V> {
    objects: HashMap<K, Arc<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    build_failures: AtomicU64,
}

impl<K: Hash + Eq + Clone, V> Default for PipelineCache<K, V> {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            build_failures: AtomicU64::new(0),
        }
    }
}

impl<K: Hash + Eq + Clone, V> PipelineCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared-path lookup; counts a hit when the key is present.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let object = self.objects.get(key).cloned();
        if object.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        object
    }

    pub fn get_or_create(
        &mut self,
        key: &K,
        build: impl FnOnce() -> Option<V>,
    ) -> Option<Arc<V>> {
        if let Some(object) = self.objects.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(object.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let Some(built) = build() else {
            self.build_failures.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let object = Arc::new(built);
        self.objects.insert(key.clone(), object.clone());
        Some(object)
    }

    /// Drop every entry; used when the device is lost and native objects
    /// become invalid wholesale.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            entries: self.objects.len(),
        }
    }
}

/// The built native bind layout for one attached-shader combination, plus the
/// stage mask the commit path walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBoundState {
    pub key: ShaderBoundStateKey,
    pub stage_mask: StageMask,
    pub layout: LayoutHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_key_returns_identity_equal_object_and_builds_once() {
        let mut cache: PipelineCache<u32, String> = PipelineCache::new();
        let mut builds = 0;

        let a = cache
            .get_or_create(&7, || {
                builds += 1;
                Some("pipeline".to_string())
            })
            .unwrap();
        let b = cache
            .get_or_create(&7, || {
                builds += 1;
                Some("other".to_string())
            })
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds, 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                build_failures: 0,
                entries: 1
            }
        );
    }

    #[test]
    fn distinct_keys_never_share_an_object() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();
        let a = cache.get_or_create(&1, || Some(10)).unwrap();
        let b = cache.get_or_create(&2, || Some(20)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn failed_build_is_not_poisoned() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();

        assert!(cache.get_or_create(&1, || None).is_none());
        assert_eq!(cache.stats().build_failures, 1);
        assert_eq!(cache.stats().entries, 0);

        // The next request retries the build and succeeds.
        let object = cache.get_or_create(&1, || Some(99)).unwrap();
        assert_eq!(*object, 99);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn clear_invalidates_for_device_loss() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();
        cache.get_or_create(&1, || Some(1));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        assert!(cache.get(&1).is_none());
    }
}
