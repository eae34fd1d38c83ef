// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Result cache and its key scheme.
//!
//! Entries hold serialized JSON. Invalidation deletes the key and then
//! performs the repopulating read; nothing locks across the two steps, so a
//! concurrent read may briefly store a stale value. The database stays the
//! source of truth.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Cache key prefix for a user and their assignments.
pub const USER_CACHE_KEY_PREFIX: &str = "user";
/// Cache key prefix for a line item.
pub const LINE_ITEM_CACHE_KEY_PREFIX: &str = "line_item";
/// Cache key prefix for a stored refresh token.
pub const JWT_REFRESH_CACHE_KEY_PREFIX: &str = "jwt_refresh";
/// Cache key holding every LTI instance.
pub const LTI_INSTANCES_CACHE_KEY: &str = "lti_instances.all";

/// Builds `<prefix>.<identifier>`.
#[must_use]
pub fn generate_cache_key(prefix: &str, identifier: &str) -> String {
    format!("{prefix}.{identifier}")
}

/// Key of the cached user with assignments.
#[must_use]
pub fn user_cache_key(username: &str) -> String {
    generate_cache_key(USER_CACHE_KEY_PREFIX, username)
}

/// Key of a cached line item.
#[must_use]
pub fn line_item_cache_key(line_item_id: i64) -> String {
    generate_cache_key(LINE_ITEM_CACHE_KEY_PREFIX, &line_item_id.to_string())
}

/// Key of a user's current refresh token.
#[must_use]
pub fn jwt_refresh_cache_key(username: &str) -> String {
    generate_cache_key(JWT_REFRESH_CACHE_KEY_PREFIX, username)
}

/// A key-value store for serialized query results.
pub trait ResultCache: Send + Sync {
    /// Reads an entry.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores an entry, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Removes an entry. Returns whether it existed.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry.
    fn clear(&self);

    /// Reports whether the cache can serve requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// Deletes `key` and immediately stores the freshly loaded value.
///
/// A loader returning `None` leaves the key absent.
///
/// # Errors
///
/// Returns the loader's error. The key stays deleted in that case.
pub fn invalidate_and_warm<C, E, F>(cache: &C, key: &str, load: F) -> Result<bool, E>
where
    C: ResultCache + ?Sized,
    F: FnOnce() -> Result<Option<String>, E>,
{
    cache.delete(key);
    match load()? {
        Some(value) => {
            cache.set(key, value);
            debug!(key, "Cache entry refreshed");
            Ok(true)
        }
        None => {
            debug!(key, "Cache entry removed");
            Ok(false)
        }
    }
}

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// Process local cache with an optional time to live.
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl InMemoryResultCache {
    /// Creates a cache whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: None,
        }
    }

    /// Creates a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Returns the number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResultCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResultCache for InMemoryResultCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        let expired: bool = entries
            .get(key)?
            .expires_at
            .is_some_and(|expires_at| expires_at <= Instant::now());
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: String) {
        let expires_at: Option<Instant> = self.ttl.map(|ttl| Instant::now() + ttl);
        self.lock()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
