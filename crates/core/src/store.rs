// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The persistence collaborator used by the bulk processors.
//!
//! Processors only ever talk to storage through [`AssignmentStore`]. Changes
//! are staged with [`AssignmentStore::persist`] and written together by a
//! single [`AssignmentStore::flush`] inside an explicit transaction.

use simple_roster_domain::{AssignmentState, UserAssignments};

/// A pending mutation waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedChange {
    /// Insert a new `ready` assignment.
    CreateAssignment {
        /// The owning user.
        user_id: i64,
        /// The assigned line item.
        line_item_id: i64,
    },
    /// Move an existing assignment to a new state.
    UpdateAssignmentState {
        /// The assignment to update.
        assignment_id: i64,
        /// The owning user, used for cache invalidation.
        user_id: i64,
        /// The new state.
        state: AssignmentState,
    },
}

impl StagedChange {
    /// Returns the user affected by this change.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        match self {
            Self::CreateAssignment { user_id, .. }
            | Self::UpdateAssignmentState { user_id, .. } => *user_id,
        }
    }
}

/// Errors reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entity matched the lookup.
    NotFound {
        /// The entity kind.
        entity: &'static str,
        /// The lookup key.
        identifier: String,
    },
    /// More than one entity matched a lookup expected to be unique.
    NonUniqueResult {
        /// The entity kind.
        entity: &'static str,
        /// The lookup key.
        identifier: String,
    },
    /// Transaction handling was called out of order.
    Transaction(String),
    /// The underlying database failed.
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, identifier } => {
                write!(f, "No {entity} found for '{identifier}'")
            }
            Self::NonUniqueResult { entity, identifier } => {
                write!(f, "More than one {entity} found for '{identifier}'")
            }
            Self::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            Self::Backend(msg) => write!(f, "Database error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The storage verbs the bulk processors depend on.
pub trait AssignmentStore {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open or the database fails.
    fn begin_transaction(&mut self) -> Result<(), StoreError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the database fails.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Rolls back the open transaction and discards staged changes.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the database fails.
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Writes all staged changes.
    ///
    /// # Errors
    ///
    /// Returns an error if any staged change cannot be written.
    fn flush(&mut self) -> Result<(), StoreError>;

    /// Stages a change for the next flush.
    fn persist(&mut self, change: StagedChange);

    /// Loads a user and all of their assignments.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    fn find_user_with_assignments(&mut self, username: &str)
    -> Result<UserAssignments, StoreError>;
}
