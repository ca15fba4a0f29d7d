//! Time-bounded response cache keyed by tool+argument fingerprints.
//!
//! Entries self-expire after a fixed TTL and are pruned lazily on lookup.
//! A bounded entry count protects a long-running process: on overflow the
//! oldest-created entry is evicted first. That approximates
//! least-recently-inserted rather than least-recently-used, which is enough
//! here since entries expire within minutes anyway.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::util::hex_encode_lower;

/// Deterministic digest of a tool call. Object key order never affects the
/// result at any nesting depth: two calls with the same tool and the same
/// argument mapping produce the same fingerprint. Array element order is
/// significant.
pub fn fingerprint(tool: &str, args: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update([0x1f]);
    hash_object(&mut hasher, args);
    hex_encode_lower(&hasher.finalize())
}

fn hash_object(hasher: &mut Sha256, map: &Map<String, Value>) {
    let ordered: BTreeMap<&String, &Value> = map.iter().collect();
    for (key, value) in ordered {
        hasher.update(key.as_bytes());
        hasher.update([0x1e]);
        hash_value(hasher, value);
        hasher.update([0x1f]);
    }
}

fn hash_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Object(map) => {
            hasher.update([b'{']);
            hash_object(hasher, map);
            hasher.update([b'}']);
        }
        Value::Array(items) => {
            hasher.update([b'[']);
            for item in items {
                hash_value(hasher, item);
                hasher.update([0x1f]);
            }
            hasher.update([b']']);
        }
        scalar => hasher.update(scalar.to_string().as_bytes()),
    }
}

/// Cache counters exposed through the status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    value: Value,
    created_at: SystemTime,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in creation order; front is the oldest.
    order: VecDeque<String>,
}

pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the stored value only while `now - created_at < ttl`.
    /// Expired entries are evicted on the way out and reported as misses.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, SystemTime::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: SystemTime) -> Option<Value> {
        let mut inner = lock_inner(&self.inner);

        let expired = match inner.entries.get(key) {
            Some(entry) => age(entry.created_at, now) >= self.ttl,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`, superseding any prior entry. Evicts the
    /// oldest-created entries when the capacity bound is exceeded.
    pub fn put(&self, key: String, value: Value) {
        self.put_at(key, value, SystemTime::now());
    }

    pub(crate) fn put_at(&self, key: String, value: Value, now: SystemTime) {
        let mut inner = lock_inner(&self.inner);

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
            },
        );

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        lock_inner(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn age(created_at: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(created_at).unwrap_or_default()
}

fn lock_inner(inner: &Mutex<CacheInner>) -> std::sync::MutexGuard<'_, CacheInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
