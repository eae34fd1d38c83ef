// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod initialization_tests;
mod line_item_tests;
mod result_cache_tests;
mod roster_assignment_tests;

use std::sync::{Arc, Mutex};

use simple_roster_domain::{NewAssignment, NewLineItem, NewLtiInstance, NewUser};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::error::PersistenceError;
use crate::{Persistence, PostCommitHook, TouchedEntities};

/// Lowest cost bcrypt accepts. Keeps the tests fast.
pub const TEST_HASH_COST: u32 = 4;

pub fn test_now() -> OffsetDateTime {
    datetime!(2026-03-10 12:00 UTC)
}

pub fn create_test_persistence() -> Persistence {
    Persistence::new_in_memory().expect("in-memory database")
}

pub fn new_user(username: &str, group_id: Option<&str>) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: format!("{username}-password"),
        group_id: group_id.map(str::to_string),
    }
}

pub fn new_line_item(slug: &str, max_attempts: u32) -> NewLineItem {
    NewLineItem {
        uri: format!("https://delivery.example/{slug}"),
        label: format!("Line item {slug}"),
        slug: slug.to_string(),
        starts_at: Some(datetime!(2026-03-01 00:00 UTC)),
        ends_at: Some(datetime!(2026-03-31 23:59:59 UTC)),
        max_attempts,
    }
}

pub fn new_lti_instance(index: u32) -> NewLtiInstance {
    NewLtiInstance {
        label: format!("infra_{index}"),
        lti_link: format!("http://infra_{index}.example/"),
        lti_key: format!("key_{index}"),
        lti_secret: format!("secret_{index}"),
    }
}

pub fn seed_user(persistence: &mut Persistence, username: &str) -> i64 {
    persistence
        .insert_users(&[new_user(username, None)], TEST_HASH_COST)
        .expect("insert user")[0]
}

pub fn seed_line_item(persistence: &mut Persistence, slug: &str) -> i64 {
    persistence
        .insert_line_items(&[new_line_item(slug, 2)])
        .expect("insert line item")[0]
}

pub fn seed_assignment(persistence: &mut Persistence, user_id: i64, line_item_id: i64) -> i64 {
    persistence
        .insert_assignments(
            &[NewAssignment {
                user_id,
                line_item_id,
            }],
            test_now(),
        )
        .expect("insert assignment")[0]
}

/// Records every touched set a hook receives.
#[derive(Clone, Default)]
pub struct RecordingHook {
    pub calls: Arc<Mutex<Vec<TouchedEntities>>>,
}

impl RecordingHook {
    pub fn calls(&self) -> Vec<TouchedEntities> {
        self.calls.lock().unwrap().clone()
    }
}

impl PostCommitHook for RecordingHook {
    fn after_commit(
        &self,
        _persistence: &mut Persistence,
        touched: &TouchedEntities,
    ) -> Result<(), PersistenceError> {
        self.calls.lock().unwrap().push(touched.clone());
        Ok(())
    }
}

/// A hook that always fails.
pub struct FailingHook;

impl PostCommitHook for FailingHook {
    fn after_commit(
        &self,
        _persistence: &mut Persistence,
        _touched: &TouchedEntities,
    ) -> Result<(), PersistenceError> {
        Err(PersistenceError::Other(String::from("hook exploded")))
    }
}
