//! TTL Cache with Request Coalescing
//!
//! Generic read-through cache for expensive repeated shell-outs. Entries are
//! keyed by a scope string (usually the repository root) and expire after a
//! short TTL. While a fetch for a key is in flight, concurrent callers for
//! the same key await its result instead of starting a second fetch.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};

use crate::utils::error::{AppError, AppResult};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // One sender per in-flight fetch; waiters subscribe and await the result.
    in_flight: HashMap<String, broadcast::Sender<Result<V, String>>>,
}

/// Read-through TTL cache with single-flight fetches per key.
pub struct TtlCache<V: Clone> {
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Return a fresh cached value, or fetch one.
    ///
    /// If a fetch for `key` is already in flight, awaits that fetch instead of
    /// starting another. On fetch failure the in-flight marker is cleared so a
    /// later call can retry; coalesced waiters observe the failure as a
    /// `Command` error carrying the original message.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        let waiter = {
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(key) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.value.clone());
                }
            }
            if let Some(tx) = inner.in_flight.get(key) {
                Some(tx.subscribe())
            } else {
                let (tx, _) = broadcast::channel(1);
                inner.in_flight.insert(key.to_string(), tx);
                None
            }
        };

        if let Some(mut rx) = waiter {
            return match rx.recv().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(AppError::command(message)),
                Err(_) => Err(AppError::internal("coalesced fetch was abandoned")),
            };
        }

        let result = fetcher().await;

        let mut inner = self.inner.lock().await;
        let tx = inner.in_flight.remove(key);
        if let Ok(value) = &result {
            inner.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        if let Some(tx) = tx {
            let shared = match &result {
                Ok(value) => Ok(value.clone()),
                Err(err) => Err(err.to_string()),
            };
            // No waiters is fine
            let _ = tx.send(shared);
        }
        result
    }

    /// Peek at a cached value without fetching.
    pub async fn get_if_fresh(&self, key: &str) -> Option<V> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Drop one key.
    pub async fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(key);
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
    }
}
