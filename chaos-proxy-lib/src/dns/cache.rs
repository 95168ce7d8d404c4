use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    ip: Ipv4Addr,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Positive A-record cache shared by every connection. Bounded; when full,
/// the entry with the oldest insertion time is evicted (not LRU-by-access).
#[derive(Debug)]
pub struct DnsCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    max_size: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate_percent: f64,
}

impl DnsCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self { inner: Mutex::new(CacheInner::default()), ttl, max_size }
    }

    /// Fresh-entry lookup. Expired entries are removed on the way through.
    pub fn get(&self, hostname: &str) -> Option<Ipv4Addr> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = inner.entries.get(hostname) {
            if entry.inserted_at.elapsed() <= self.ttl {
                let ip = entry.ip;
                inner.hits += 1;
                return Some(ip);
            }
            inner.entries.remove(hostname);
        }
        inner.misses += 1;
        None
    }

    pub fn insert(&self, hostname: &str, ip: Ipv4Addr) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.len() >= self.max_size && !inner.entries.contains_key(hostname) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(host, _)| host.clone());
            if let Some(host) = oldest {
                inner.entries.remove(&host);
            }
        }
        inner
            .entries
            .insert(hostname.to_string(), CacheEntry { ip, inserted_at: Instant::now() });
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let total = inner.hits + inner.misses;
        let hit_rate_percent = if total > 0 {
            inner.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        CacheStats {
            cache_size: inner.entries.len(),
            cache_hits: inner.hits,
            cache_misses: inner.misses,
            hit_rate_percent,
        }
    }
}
