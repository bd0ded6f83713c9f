//! Read-through cache for `get_memory_by_id`.
//!
//! Records are keyed by the backend that served them, so a Local hit is never
//! returned for a Platform read. Entries expire after the TTL; expired ones
//! are dropped on lookup and swept whenever a store finds the cache full.
//! When a sweep frees nothing, the oldest entry makes room.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use unimem_types::{MemorySource, UnifiedMemory};

/// Upper bound on cached records.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: MemorySource,
    id: String,
}

impl CacheKey {
    fn new(source: MemorySource, id: &str) -> Self {
        Self {
            source,
            id: id.to_string(),
        }
    }
}

struct Cached {
    memory: UnifiedMemory,
    stored_at: Instant,
}

pub struct MemoryCache {
    entries: DashMap<CacheKey, Cached>,
    ttl: Duration,
    capacity: usize,
}

impl MemoryCache {
    /// A zero TTL turns the cache into a no-op.
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    fn fresh(&self, cached: &Cached) -> bool {
        cached.stored_at.elapsed() <= self.ttl
    }

    pub fn lookup(&self, source: MemorySource, id: &str) -> Option<UnifiedMemory> {
        if self.disabled() {
            return None;
        }
        let key = CacheKey::new(source, id);
        let hit = self
            .entries
            .get(&key)
            .map(|cached| self.fresh(&cached).then(|| cached.memory.clone()))?;
        if hit.is_none() {
            self.entries.remove(&key);
        }
        hit
    }

    /// Cache `memory` as served by `source`, making room first when full.
    pub fn store(&self, source: MemorySource, memory: UnifiedMemory) {
        if self.disabled() {
            return;
        }
        let key = CacheKey::new(source, &memory.id);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.make_room();
        }
        self.entries.insert(
            key,
            Cached {
                memory,
                stored_at: Instant::now(),
            },
        );
    }

    fn make_room(&self) {
        self.entries.retain(|_, cached| cached.stored_at.elapsed() <= self.ttl);
        if self.entries.len() < self.capacity {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().stored_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Drop `ids` as served by one backend.
    pub fn forget(&self, source: MemorySource, ids: &[String]) {
        for id in ids {
            self.entries.remove(&CacheKey::new(source, id));
        }
    }

    /// Drop `ids` whichever backend served them.
    pub fn forget_everywhere(&self, ids: &[String]) {
        self.entries.retain(|key, _| !ids.contains(&key.id));
    }

    /// Drop every record served by `source`.
    pub fn forget_source(&self, source: MemorySource) {
        self.entries.retain(|key, _| key.source != source);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
