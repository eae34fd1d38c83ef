// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-through caching of the hot read paths.
//!
//! Cached values are JSON. An entry that no longer deserializes is treated
//! as a miss and replaced.

use serde::Serialize;
use serde::de::DeserializeOwned;
use simple_roster::{
    LTI_INSTANCES_CACHE_KEY, ResultCache, invalidate_and_warm, line_item_cache_key,
    user_cache_key,
};
use simple_roster_domain::{LineItem, LtiInstance, UserAssignments};
use tracing::{debug, warn};

use crate::Persistence;
use crate::error::PersistenceError;

fn read_cached<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Option<T> {
    let raw: String = cache.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => {
            debug!(key, "Cache hit");
            Some(value)
        }
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable cache entry");
            cache.delete(key);
            None
        }
    }
}

fn store<T: Serialize>(
    cache: &dyn ResultCache,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    cache.set(key, serde_json::to_string(value)?);
    Ok(())
}

/// Loads a user with their assignments, from the cache when possible.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the user does not exist, or an
/// error if the database fails.
pub fn user_with_assignments(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
    username: &str,
) -> Result<UserAssignments, PersistenceError> {
    let key: String = user_cache_key(username);
    if let Some(cached) = read_cached(cache, &key) {
        return Ok(cached);
    }

    let loaded: UserAssignments = persistence.find_user_with_assignments(username)?;
    store(cache, &key, &loaded)?;
    Ok(loaded)
}

/// Loads a line item, from the cache when possible.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn line_item(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
    line_item_id: i64,
) -> Result<Option<LineItem>, PersistenceError> {
    let key: String = line_item_cache_key(line_item_id);
    if let Some(cached) = read_cached(cache, &key) {
        return Ok(Some(cached));
    }

    let loaded: Option<LineItem> = persistence.get_line_item(line_item_id)?;
    if let Some(item) = &loaded {
        store(cache, &key, item)?;
    }
    Ok(loaded)
}

/// Loads all LTI instances, from the cache when possible.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn lti_instances(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
) -> Result<Vec<LtiInstance>, PersistenceError> {
    if let Some(cached) = read_cached(cache, LTI_INSTANCES_CACHE_KEY) {
        return Ok(cached);
    }

    let loaded: Vec<LtiInstance> = persistence.list_lti_instances()?;
    store(cache, LTI_INSTANCES_CACHE_KEY, &loaded)?;
    Ok(loaded)
}

/// Drops and reloads the cached entry of one user.
///
/// Returns `false` if the user no longer exists.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn warm_user(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
    username: &str,
) -> Result<bool, PersistenceError> {
    invalidate_and_warm(cache, &user_cache_key(username), || {
        match persistence.find_user_with_assignments(username) {
            Ok(loaded) => Ok(Some(serde_json::to_string(&loaded)?)),
            Err(PersistenceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    })
}

/// Drops and reloads the cached entry of one line item.
///
/// Returns `false` if the line item no longer exists.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn warm_line_item(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
    line_item_id: i64,
) -> Result<bool, PersistenceError> {
    invalidate_and_warm(cache, &line_item_cache_key(line_item_id), || {
        persistence
            .get_line_item(line_item_id)?
            .map(|item| serde_json::to_string(&item))
            .transpose()
            .map_err(PersistenceError::from)
    })
}

/// Drops and reloads the cached LTI instance list.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn warm_lti_instances(
    persistence: &mut Persistence,
    cache: &dyn ResultCache,
) -> Result<bool, PersistenceError> {
    invalidate_and_warm(cache, LTI_INSTANCES_CACHE_KEY, || {
        let loaded: Vec<LtiInstance> = persistence.list_lti_instances()?;
        Ok(Some(serde_json::to_string(&loaded)?))
    })
}
