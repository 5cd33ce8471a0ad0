//! Shared resolution cache.
//!
//! [`ResolutionCache`] memoizes two things across all resolver clones and
//! threads:
//!
//! - **Annotation results**: `(element, kind)` → the annotation found. Only
//!   definite matches are stored. A miss is recomputed on every call, so a
//!   registry that is still being assembled can never leave a stale "absent"
//!   answer behind.
//! - **Interface flags**: interface → whether any of its methods (including
//!   inherited ones) carries an annotation. Both values are stored.
//!
//! Element ids are dense per registry, so both tables are keyed by the
//! registry's [`RegistryId`] as well. One cache may serve resolvers over
//! several registries without their entries colliding.
//!
//! Entries are write-once. Concurrent resolvers may race to fill the same
//! key; the first value written wins and later writers get that value back.
//! Since resolution is a pure function of an immutable registry, every racer
//! computed an equal value anyway.
//!
//! The cache is owned by whoever composes the resolver and shared through
//! `Arc`; there is no process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use annoscope_core::{Annotation, ElementRef, RegistryId, TypeId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default map capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

// ============================================================================
// Keys and Configuration
// ============================================================================

/// Memoization key: which registry, which element, which annotation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub registry: RegistryId,
    pub element: ElementRef,
    pub kind: TypeId,
}

impl CacheKey {
    pub fn new(registry: RegistryId, element: ElementRef, kind: TypeId) -> Self {
        CacheKey {
            registry,
            element,
            kind,
        }
    }
}

/// Sizing for a [`ResolutionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Initial capacity of each map.
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            initial_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Point-in-time counters for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Annotation lookups answered from the cache.
    pub hits: u64,
    /// Annotation lookups that found nothing cached.
    pub misses: u64,
    /// Annotation results stored (first writes only).
    pub inserts: u64,
    /// Annotation results currently cached.
    pub cached_annotations: usize,
    /// Interface flags currently cached.
    pub interface_flags: usize,
}

// ============================================================================
// Resolution Cache
// ============================================================================

/// Concurrent memo tables for [`crate::resolver::AnnotationResolver`].
#[derive(Debug)]
pub struct ResolutionCache {
    annotations: DashMap<CacheKey, Arc<Annotation>>,
    interface_flags: DashMap<(RegistryId, TypeId), bool>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CacheConfig) -> Self {
        ResolutionCache {
            annotations: DashMap::with_capacity(config.initial_capacity),
            interface_flags: DashMap::with_capacity(config.initial_capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    /// Convenience for the common `Arc<ResolutionCache>` composition.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Look up a memoized annotation result.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Annotation>> {
        match self.annotations.get(key) {
            Some(found) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(element = %key.element, kind = %key.kind, "resolution cache hit");
                Some(Arc::clone(found.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a match, keeping any value already present.
    ///
    /// Returns the value that is cached after the call.
    pub fn insert(&self, key: CacheKey, annotation: Arc<Annotation>) -> Arc<Annotation> {
        match self.annotations.entry(key) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                self.inserts.fetch_add(1, Ordering::Relaxed);
                slot.insert(Arc::clone(&annotation));
                annotation
            }
        }
    }

    pub fn interface_flag(&self, registry: RegistryId, interface: TypeId) -> Option<bool> {
        self.interface_flags
            .get(&(registry, interface))
            .map(|flag| *flag)
    }

    /// Store an interface flag, keeping any value already present.
    pub fn record_interface_flag(
        &self,
        registry: RegistryId,
        interface: TypeId,
        has_annotated_methods: bool,
    ) -> bool {
        *self
            .interface_flags
            .entry((registry, interface))
            .or_insert(has_annotated_methods)
    }

    /// Number of cached annotation results.
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            cached_annotations: self.annotations.len(),
            interface_flags: self.interface_flags.len(),
        }
    }

    /// Drop all entries and reset counters.
    ///
    /// Entries of every registry the cache served are dropped.
    pub fn clear(&self) {
        self.annotations.clear();
        self.interface_flags.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
    }
}
