//! TTL cache for computed portfolio metrics.
//!
//! Metrics are keyed by operation name, operation parameters, and a
//! fingerprint of the holding set, so any change to a position's symbol
//! or market value invalidates naturally. Entries are stored as JSON
//! values; every report type in this crate is serde-serializable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use argus_types::WeightedHolding;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct MetricsCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    stats: RwLock<CacheStats>,
}

impl MetricsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: 1024,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Stable key for an operation over a specific holding set.
    pub fn key(operation: &str, params: &str, holdings: &[WeightedHolding]) -> String {
        format!("{}:{}:{:016x}", operation, params, fingerprint(holdings))
    }

    /// Fetch a live entry, deserializing back into the report type.
    /// Stale entries are evicted on access.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // Copy out of the shard before touching it again: removing while
        // the read guard is alive would deadlock on the shard lock.
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.inserted_at.elapsed() <= self.ttl).then(|| entry.value.clone()));

        let hit = match found {
            Some(Some(value)) => serde_json::from_value(value).ok(),
            Some(None) => {
                self.entries.remove(key);
                self.stats.write().evictions += 1;
                None
            }
            None => None,
        };

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(json) = serde_json::to_value(value) else {
            return;
        };
        if self.entries.len() >= self.max_entries {
            self.purge_stale();
        }
        debug!(%key, "caching metric");
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: json,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn purge_stale(&self) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            self.stats.write().evictions += purged as u64;
        }
    }
}

/// Order-insensitive fingerprint of a holding set.
pub fn fingerprint(holdings: &[WeightedHolding]) -> u64 {
    let mut items: Vec<(&str, String)> = holdings
        .iter()
        .map(|h| (h.symbol.as_str(), h.market_value.to_string()))
        .collect();
    items.sort();

    let mut hasher = DefaultHasher::new();
    for (symbol, value) in items {
        symbol.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    hasher.finish()
}
