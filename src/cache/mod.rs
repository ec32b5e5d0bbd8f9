//! Cache Store Abstraction
//!
//! Information Hiding:
//! - Backend implementation details hidden behind trait
//! - Allows swapping between in-memory, Redis, memcached without API changes
//! - Values cross the boundary as serialized strings; callers own encoding

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub mod keys;
pub mod memory;

pub use memory::InMemoryCache;

/// Generic key/value store with per-entry time-to-live.
///
/// TTL is advisory expiry: an entry may be evicted before its TTL elapses,
/// but must not be observably present after it. Callers treat "absent" and
/// "expired" as the same outcome.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a value. Returns `None` for missing or expired entries.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under `key` for `ttl`. Overwrites any existing entry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove an entry. Deleting an absent key is a no-op, not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
