//! # Translation Cache
//!
//! Bounded memoization of text-translation results keyed by (text, source, target).
//!
//! ## Policy:
//! - **Capacity**: the store never holds more than `capacity` entries; inserting into a
//!   full store evicts the oldest-inserted surviving entry (FIFO, not access recency)
//! - **TTL**: an entry older than the TTL is treated as absent and purged lazily
//! - **Re-insertion**: setting an existing key moves it to the back of the queue
//!
//! ## Thread Safety:
//! Lookups purge expired entries, so both reads and writes take the one `Mutex`.

use crate::translation::languages::normalize_code;
use crate::translation::types::TranslationResult;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Normalized cache key. Equal keys imply a cache hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    source: String,
    target: String,
}

impl CacheKey {
    /// Trims the text and upper-cases both codes.
    pub fn new(text: &str, source: &str, target: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            source: normalize_code(source),
            target: normalize_code(target),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: TranslationResult,
    inserted_at: Instant,
}

/// `order` holds exactly the keys of `entries`, oldest insert first.
#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
}

impl CacheStore {
    fn remove(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|queued| queued != key);
        }
    }

    fn pop_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

/// FIFO + TTL translation cache.
#[derive(Debug)]
pub struct TranslationCache {
    store: Mutex<CacheStore>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl TranslationCache {
    /// Create a cache holding at most `capacity` entries; `ttl = None` disables expiry.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            store: Mutex::new(CacheStore::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, text: &str, source: &str, target: &str) -> Option<TranslationResult> {
        self.get_at(&CacheKey::new(text, source, target), Instant::now())
    }

    pub fn set(&self, text: &str, source: &str, target: &str, result: TranslationResult) {
        self.set_at(CacheKey::new(text, source, target), result, Instant::now());
    }

    /// Number of stored entries (expired ones not yet purged included).
    pub fn size(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut store = self.lock();
        store.entries.clear();
        store.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(entry.inserted_at) >= ttl,
            None => false,
        }
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<TranslationResult> {
        let mut store = self.lock();

        let expired = match store.entries.get(key) {
            Some(entry) if self.is_expired(entry, now) => true,
            Some(entry) => return Some(entry.result.clone()),
            None => return None,
        };

        if expired {
            store.remove(key);
            debug!("Cache entry expired and purged");
        }
        None
    }

    fn set_at(&self, key: CacheKey, result: TranslationResult, now: Instant) {
        let mut store = self.lock();

        // Replacing a key re-queues it at the back.
        store.remove(&key);
        self.purge_expired(&mut store, now);

        while store.entries.len() >= self.capacity {
            if store.pop_oldest().is_none() {
                break;
            }
            debug!(size = store.entries.len(), "Cache full, evicted oldest entry");
        }

        store.order.push_back(key.clone());
        store.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
    }

    /// Drop expired entries from the front of the queue.
    ///
    /// Insertion order equals age order, so expired entries are always at the front.
    fn purge_expired(&self, store: &mut CacheStore, now: Instant) {
        while let Some(oldest) = store.order.front() {
            match store.entries.get(oldest) {
                Some(entry) if !self.is_expired(entry, now) => break,
                _ => {
                    store.pop_oldest();
                }
            }
        }
    }
}
