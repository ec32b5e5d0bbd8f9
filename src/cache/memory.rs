//! In-Memory Cache Store
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Expiry bookkeeping (tokio time, lazy eviction) invisible to callers

use super::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory cache using a HashMap with per-entry deadlines.
/// Data is lost when the process terminates.
///
/// Expired entries are evicted lazily on read; an entry read at or past
/// its deadline is reported absent and removed.
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Entry is past its deadline; evict under the write lock.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
            entries.remove(key);
            tracing::debug!("[InMemoryCache] Evicted expired key '{}'", key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        tracing::debug!("[InMemoryCache] Set key '{}' (ttl {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        tracing::debug!("[InMemoryCache] Deleted key '{}'", key);
        Ok(())
    }
}
