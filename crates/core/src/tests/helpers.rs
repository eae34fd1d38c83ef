// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;

use simple_roster_domain::{Assignment, AssignmentState, User, UserAssignments};

use crate::{AssignmentStore, StagedChange, StoreError};

/// Storage verbs observed by [`RecordingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    Begin,
    Flush,
    Commit,
    Rollback,
}

/// In-memory collaborator that records every transaction verb.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub users: HashMap<String, UserAssignments>,
    pub calls: Vec<StoreCall>,
    pub staged: Vec<StagedChange>,
    pub flushed: Vec<StagedChange>,
    pub fail_flush: bool,
}

impl RecordingStore {
    pub fn with_user(mut self, id: i64, username: &str, assignments: Vec<Assignment>) -> Self {
        self.users.insert(
            username.to_string(),
            UserAssignments {
                user: User {
                    id,
                    username: username.to_string(),
                    password_hash: String::from("hash"),
                    group_id: None,
                },
                assignments,
            },
        );
        self
    }

    pub fn called(&self, call: StoreCall) -> bool {
        self.calls.contains(&call)
    }
}

impl AssignmentStore for RecordingStore {
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Begin);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Rollback);
        self.staged.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Flush);
        if self.fail_flush {
            return Err(StoreError::Backend(String::from("disk full")));
        }
        self.flushed.append(&mut self.staged);
        Ok(())
    }

    fn persist(&mut self, change: StagedChange) {
        self.staged.push(change);
    }

    fn find_user_with_assignments(
        &mut self,
        username: &str,
    ) -> Result<UserAssignments, StoreError> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                identifier: username.to_string(),
            })
    }
}

pub fn create_assignment(
    id: i64,
    user_id: i64,
    line_item_id: i64,
    state: AssignmentState,
) -> Assignment {
    Assignment {
        id,
        user_id,
        line_item_id,
        state,
        attempts_count: 0,
        updated_at: time_zero(),
    }
}

fn time_zero() -> time::OffsetDateTime {
    time::OffsetDateTime::UNIX_EPOCH
}
