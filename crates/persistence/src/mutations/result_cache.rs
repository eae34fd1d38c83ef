// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Result cache writes.
//!
//! `REPLACE INTO` is understood by both backends, so one body serves both.

use diesel::prelude::*;

use crate::diesel_schema::result_cache;
use crate::error::PersistenceError;

backend_fn! {
/// Stores an entry, replacing any previous value under the same key.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn put_cache_entry(
    conn: &mut _,
    cache_key: &str,
    payload: &str,
    expires_at: Option<&str>,
) -> Result<(), PersistenceError> {
    diesel::replace_into(result_cache::table)
        .values((
            result_cache::cache_key.eq(cache_key),
            result_cache::payload.eq(payload),
            result_cache::expires_at.eq(expires_at),
        ))
        .execute(conn)?;
    Ok(())
}
}

backend_fn! {
/// Removes one entry. Returns whether it existed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_cache_entry(conn: &mut _, cache_key: &str) -> Result<bool, PersistenceError> {
    let deleted: usize =
        diesel::delete(result_cache::table.filter(result_cache::cache_key.eq(cache_key)))
            .execute(conn)?;
    Ok(deleted > 0)
}
}

backend_fn! {
/// Removes every entry.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn clear_cache_entries(conn: &mut _) -> Result<usize, PersistenceError> {
    diesel::delete(result_cache::table)
        .execute(conn)
        .map_err(Into::into)
}
}
