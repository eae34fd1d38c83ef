// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Result cache reads.

use diesel::prelude::*;

use crate::diesel_schema::result_cache;
use crate::error::PersistenceError;

backend_fn! {
/// Reads the payload and expiry of one cache entry.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_cache_entry(
    conn: &mut _,
    cache_key: &str,
) -> Result<Option<(String, Option<String>)>, PersistenceError> {
    result_cache::table
        .filter(result_cache::cache_key.eq(cache_key))
        .select((result_cache::payload, result_cache::expires_at))
        .first::<(String, Option<String>)>(conn)
        .optional()
        .map_err(Into::into)
}
}

backend_fn! {
/// Counts stored cache entries, expired ones included.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_cache_entries(conn: &mut _) -> Result<i64, PersistenceError> {
    result_cache::table
        .count()
        .get_result::<i64>(conn)
        .map_err(Into::into)
}
}
