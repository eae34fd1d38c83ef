// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use simple_roster::{
    BulkOperation, BulkOperationCollection, BulkOperationCollectionProcessor, BulkOperationType,
    CancelAssignmentsProcessor, InMemoryResultCache, ResultCache, STATE_ATTRIBUTE,
};
use simple_roster_domain::AssignmentState;

use crate::cache::{lti_instances, user_with_assignments};
use crate::tests::{
    create_test_persistence, new_lti_instance, seed_assignment, seed_line_item, seed_user,
};
use crate::{Persistence, ResultCacheHook};

/// A file database handle with the shared cache refreshed by its commits.
fn open_with_shared_cache(path: &Path) -> (Persistence, Arc<dyn ResultCache>) {
    let mut persistence = Persistence::new_with_file(path).unwrap();
    let cache: Arc<dyn ResultCache> = Arc::new(persistence.open_result_cache(None).unwrap());
    persistence.register_hook(ResultCacheHook::new(Arc::clone(&cache)));
    (persistence, cache)
}

#[test]
fn test_entries_are_shared_between_handles_on_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let (_first, first_cache) = open_with_shared_cache(&path);
    let (_second, second_cache) = open_with_shared_cache(&path);

    first_cache.set("key", String::from("value"));
    assert_eq!(second_cache.get("key"), Some(String::from("value")));

    assert!(second_cache.delete("key"));
    assert_eq!(first_cache.get("key"), None);
}

#[test]
fn test_commit_on_one_handle_refreshes_what_the_other_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let (mut server, server_cache) = open_with_shared_cache(&path);
    let (mut console, _console_cache) = open_with_shared_cache(&path);

    let user_id = seed_user(&mut console, "user1");
    let line_item_id = seed_line_item(&mut console, "math");
    seed_assignment(&mut console, user_id, line_item_id);

    let before = user_with_assignments(&mut server, server_cache.as_ref(), "user1").unwrap();
    assert_eq!(before.available_assignments().count(), 1);

    let collection = BulkOperationCollection::new(false).with(
        BulkOperation::new("user1", BulkOperationType::Update)
            .with_attribute(STATE_ATTRIBUTE, AssignmentState::Cancelled.as_str()),
    );
    let result = CancelAssignmentsProcessor
        .process(&mut console, &collection)
        .unwrap();
    assert!(!result.has_failures());

    let after = user_with_assignments(&mut server, server_cache.as_ref(), "user1").unwrap();
    assert_eq!(after.available_assignments().count(), 0);
}

#[test]
fn test_in_memory_database_cache_is_shared_between_connections() {
    let persistence = create_test_persistence();
    let first = persistence.open_result_cache(None).unwrap();
    let second = persistence.open_result_cache(None).unwrap();

    first.set("key", String::from("value"));

    assert_eq!(second.get("key"), Some(String::from("value")));
    assert!(second.is_available());
}

#[test]
fn test_set_replaces_previous_value() {
    let persistence = create_test_persistence();
    let cache = persistence.open_result_cache(None).unwrap();

    cache.set("key", String::from("old"));
    cache.set("key", String::from("new"));

    assert_eq!(cache.get("key"), Some(String::from("new")));
    assert_eq!(cache.entry_count().unwrap(), 1);
}

#[test]
fn test_expired_entry_reads_as_missing_and_is_evicted() {
    let persistence = create_test_persistence();
    let cache = persistence.open_result_cache(Some(Duration::ZERO)).unwrap();

    cache.set("key", String::from("value"));

    assert_eq!(cache.get("key"), None);
    assert_eq!(cache.entry_count().unwrap(), 0);
}

#[test]
fn test_entry_within_ttl_is_served() {
    let persistence = create_test_persistence();
    let cache = persistence
        .open_result_cache(Some(Duration::from_secs(3600)))
        .unwrap();

    cache.set("key", String::from("value"));

    assert_eq!(cache.get("key"), Some(String::from("value")));
}

#[test]
fn test_clear_removes_every_entry() {
    let persistence = create_test_persistence();
    let cache = persistence.open_result_cache(None).unwrap();
    cache.set("a", String::from("1"));
    cache.set("b", String::from("2"));

    cache.clear();

    assert_eq!(cache.entry_count().unwrap(), 0);
    assert!(!cache.delete("a"));
}

#[test]
fn test_lti_instance_insert_refreshes_cached_list() {
    let mut persistence = create_test_persistence();
    let cache = Arc::new(InMemoryResultCache::new());
    persistence.register_hook(ResultCacheHook::new(cache.clone()));
    assert!(lti_instances(&mut persistence, cache.as_ref()).unwrap().is_empty());

    persistence
        .insert_lti_instances(&[new_lti_instance(1), new_lti_instance(2)])
        .unwrap();

    let cached = lti_instances(&mut persistence, cache.as_ref()).unwrap();
    assert_eq!(cached.len(), 2);
}
