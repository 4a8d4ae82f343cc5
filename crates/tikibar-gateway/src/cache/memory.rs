//! In-process cache with per-entry expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use tikibar_core::Result;

use super::CacheBackend;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// `DashMap`-backed cache.
///
/// Expired entries are dropped when read. Once the map grows past
/// `max_entries` it is swept inline: expired entries go first, then the live
/// entries closest to expiry until a tenth of the capacity is free again.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Evict the entries closest to expiry until at most `target` remain.
    fn evict_to(&self, target: usize) -> usize {
        let excess = self.entries.len().saturating_sub(target);
        if excess == 0 {
            return 0;
        }
        let mut by_expiry: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|e| (e.value().expires_at, e.key().clone()))
            .collect();
        by_expiry.sort_unstable_by_key(|(at, _)| *at);
        by_expiry
            .into_iter()
            .take(excess)
            .filter(|(_, key)| self.entries.remove(key).is_some())
            .count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(e) if e.expires_at > now => return Ok(Some(e.value.clone())),
            Some(_) => true,
            None => false,
        };
        if hit {
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );

        if self.entries.len() > self.max_entries {
            let expired = self.purge_expired();
            let target = self.max_entries - self.max_entries / 10;
            let evicted = if self.entries.len() > self.max_entries {
                self.evict_to(target)
            } else {
                0
            };
            tracing::debug!(expired, evicted, len = self.entries.len(), "toolbar cache swept");
        }
        Ok(())
    }
}
