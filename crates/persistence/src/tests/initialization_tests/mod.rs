// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Backend initialization tests.
//!
//! Connection establishment, migrations and foreign key enforcement are also
//! exercised implicitly by every other persistence test.

use crate::Persistence;
use crate::tests::{create_test_persistence, seed_user};

#[test]
fn test_persistence_initialization() {
    let result = Persistence::new_in_memory();
    assert!(result.is_ok());
}

#[test]
fn test_multiple_in_memory_instances_are_isolated() {
    let mut db1 = create_test_persistence();
    let mut db2 = create_test_persistence();

    seed_user(&mut db1, "user1");

    assert_eq!(db1.count_users().unwrap(), 1, "db1 should have 1 user");
    assert_eq!(db2.count_users().unwrap(), 0, "db2 should have 0 users");
}

#[test]
fn test_migrations_applied_on_initialization() {
    let mut persistence = create_test_persistence();

    assert!(persistence.list_line_items().unwrap().is_empty());
    assert!(persistence.list_lti_instances().unwrap().is_empty());
    assert_eq!(persistence.count_assignments().unwrap(), 0);
}

#[test]
fn test_foreign_key_enforcement_is_enabled() {
    let mut persistence = create_test_persistence();
    assert!(persistence.verify_foreign_key_enforcement().is_ok());
}

#[test]
fn test_ping_succeeds_on_open_database() {
    let mut persistence = create_test_persistence();
    assert!(persistence.ping().is_ok());
}

#[test]
fn test_file_database_persists_between_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.sqlite");

    {
        let mut persistence = Persistence::new_with_file(&path).unwrap();
        seed_user(&mut persistence, "user1");
    }

    let mut reopened = Persistence::new_with_file(&path).unwrap();
    assert!(reopened.get_user_by_username("user1").unwrap().is_some());
}
