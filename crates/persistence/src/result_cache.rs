// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Result cache stored in the roster database.
//!
//! Entries live in the `result_cache` table, so the server and every console
//! run connected to the same database share them. A console command that
//! refreshes or invalidates an entry is seen by the server on its next read.
//!
//! The cache talks to the database over its own connection. Cache traffic
//! therefore never joins, or waits on, a transaction open on the roster
//! connection. Database errors are logged and degrade to a miss.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use simple_roster::ResultCache;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::backend::PersistenceBackend;
use crate::data_models::{from_db_timestamp, to_db_timestamp};
use crate::error::PersistenceError;
use crate::{BackendConnection, mutations, queries};

/// A [`ResultCache`] backed by the `result_cache` table.
pub struct DatabaseResultCache {
    conn: Mutex<BackendConnection>,
    ttl: Option<Duration>,
}

impl DatabaseResultCache {
    pub(crate) const fn new(conn: BackendConnection, ttl: Option<Duration>) -> Self {
        Self {
            conn: Mutex::new(conn),
            ttl,
        }
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn entry_count(&self) -> Result<i64, PersistenceError> {
        let mut conn = self.lock();
        dispatch!(conn: &mut *conn, queries::result_cache, count_cache_entries())
    }

    fn lock(&self) -> MutexGuard<'_, BackendConnection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expires_at(&self, now: OffsetDateTime) -> Option<String> {
        let ttl: time::Duration = time::Duration::try_from(self.ttl?).ok()?;
        now.checked_add(ttl).map(to_db_timestamp)
    }
}

impl std::fmt::Debug for DatabaseResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseResultCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn is_expired(expires_at: Option<&str>, now: OffsetDateTime) -> bool {
    expires_at.is_some_and(|value| !from_db_timestamp(value).is_ok_and(|at| at > now))
}

impl ResultCache for DatabaseResultCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.lock();
        let (payload, expires_at): (String, Option<String>) =
            match dispatch!(conn: &mut *conn, queries::result_cache, get_cache_entry(key)) {
                Ok(Some(entry)) => entry,
                Ok(None) => return None,
                Err(e) => {
                    warn!(key, error = %e, "Result cache read failed");
                    return None;
                }
            };

        if is_expired(expires_at.as_deref(), OffsetDateTime::now_utc()) {
            if let Err(e) =
                dispatch!(conn: &mut *conn, mutations::result_cache, delete_cache_entry(key))
            {
                warn!(key, error = %e, "Failed to evict expired cache entry");
            }
            debug!(key, "Expired cache entry evicted");
            return None;
        }

        Some(payload)
    }

    fn set(&self, key: &str, value: String) {
        let expires_at: Option<String> = self.expires_at(OffsetDateTime::now_utc());
        let mut conn = self.lock();
        if let Err(e) = dispatch!(
            conn: &mut *conn,
            mutations::result_cache,
            put_cache_entry(key, &value, expires_at.as_deref())
        ) {
            warn!(key, error = %e, "Result cache write failed");
        }
    }

    fn delete(&self, key: &str) -> bool {
        let mut conn = self.lock();
        match dispatch!(conn: &mut *conn, mutations::result_cache, delete_cache_entry(key)) {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key, error = %e, "Result cache delete failed");
                false
            }
        }
    }

    fn clear(&self) {
        let mut conn = self.lock();
        match dispatch!(conn: &mut *conn, mutations::result_cache, clear_cache_entries()) {
            Ok(removed) => debug!(removed, "Result cache cleared"),
            Err(e) => warn!(error = %e, "Result cache clear failed"),
        }
    }

    fn is_available(&self) -> bool {
        let mut conn = self.lock();
        let result: Result<(), PersistenceError> = match &mut *conn {
            BackendConnection::Sqlite(conn) => conn.ping(),
            #[cfg(feature = "mysql")]
            BackendConnection::Mysql(conn) => conn.ping(),
        };
        result.is_ok()
    }
}
