// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transactional processing of bulk operation collections.
//!
//! Each operation is applied independently and reported in the
//! [`BulkResult`]. Durability is decided for the whole collection: one
//! failure rolls the transaction back, otherwise all staged changes are
//! flushed once and committed. Success log lines are buffered and only
//! emitted after the commit.

use std::str::FromStr;

use simple_roster_domain::{AssignmentState, UserAssignments};
use tracing::{debug, error, info, warn};

use crate::bulk::{
    BulkOperation, BulkOperationCollection, BulkOperationType, BulkResult, STATE_ATTRIBUTE,
};
use crate::error::CoreError;
use crate::store::{AssignmentStore, StagedChange, StoreError};

/// Applies a collection of bulk operations through a persistence collaborator.
pub trait BulkOperationCollectionProcessor {
    /// Processes every operation of the collection.
    ///
    /// Operation level failures are reported as `false` entries in the
    /// result and never abort the collection.
    ///
    /// # Errors
    ///
    /// Returns an error only when the transaction itself cannot be opened,
    /// flushed, committed or rolled back.
    fn process<S>(
        &self,
        store: &mut S,
        collection: &BulkOperationCollection,
    ) -> Result<BulkResult, CoreError>
    where
        S: AssignmentStore + ?Sized;
}

/// The changes one operation wants staged and its deferred log line.
struct OperationOutcome {
    changes: Vec<StagedChange>,
    message: String,
}

fn process_transactionally<S, F>(
    store: &mut S,
    collection: &BulkOperationCollection,
    expected: BulkOperationType,
    mut apply: F,
) -> Result<BulkResult, CoreError>
where
    S: AssignmentStore + ?Sized,
    F: FnMut(&mut S, &BulkOperation) -> Result<OperationOutcome, CoreError>,
{
    let dry_run: bool = collection.is_dry_run();
    let mut result: BulkResult = BulkResult::new();
    let mut pending_messages: Vec<String> = Vec::new();

    if !dry_run {
        store.begin_transaction()?;
    }

    for operation in collection {
        let outcome: Result<OperationOutcome, CoreError> =
            if operation.operation_type() == expected {
                apply(store, operation)
            } else {
                Err(CoreError::UnsupportedOperationType {
                    identifier: operation.identifier().to_string(),
                    received: operation.operation_type(),
                    expected,
                })
            };

        match outcome {
            Ok(outcome) => {
                if !dry_run {
                    for change in outcome.changes {
                        store.persist(change);
                    }
                }
                pending_messages.push(outcome.message);
                result.add_success(operation.identifier());
            }
            Err(err) => {
                warn!(
                    identifier = %operation.identifier(),
                    error = %err,
                    "Bulk operation failed"
                );
                result.add_failure(operation.identifier());
            }
        }
    }

    if dry_run {
        debug!(
            operations = collection.len(),
            failures = result.failure_count(),
            "Dry run, nothing persisted"
        );
        return Ok(result);
    }

    if result.has_failures() {
        warn!(
            failures = result.failure_count(),
            "Rolling back bulk operation batch"
        );
        store.rollback()?;
        return Ok(result);
    }

    if let Err(err) = store.flush().and_then(|()| store.commit()) {
        error!(error = %err, "Failed to persist bulk operation batch");
        if let Err(rollback_err) = store.rollback() {
            error!(error = %rollback_err, "Failed to roll back bulk operation batch");
        }
        return Err(err.into());
    }

    result.mark_applied();
    for message in pending_messages {
        info!("{message}");
    }

    Ok(result)
}

fn available_assignment_updates(
    user_assignments: &UserAssignments,
    state: AssignmentState,
) -> Vec<StagedChange> {
    user_assignments
        .available_assignments()
        .map(|assignment| StagedChange::UpdateAssignmentState {
            assignment_id: assignment.id,
            user_id: user_assignments.user.id,
            state,
        })
        .collect()
}

/// Gives each user a fresh `ready` assignment for the line item of their
/// most recent assignment, cancelling the ones still available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateAssignmentsProcessor;

impl BulkOperationCollectionProcessor for CreateAssignmentsProcessor {
    fn process<S>(
        &self,
        store: &mut S,
        collection: &BulkOperationCollection,
    ) -> Result<BulkResult, CoreError>
    where
        S: AssignmentStore + ?Sized,
    {
        process_transactionally(
            store,
            collection,
            BulkOperationType::Create,
            |store, operation| {
                let username: &str = operation.identifier();
                let user_assignments: UserAssignments =
                    store.find_user_with_assignments(username)?;

                let line_item_id: i64 = user_assignments
                    .last_assignment()
                    .map(|assignment| assignment.line_item_id)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "assignment",
                        identifier: username.to_string(),
                    })?;

                let mut changes: Vec<StagedChange> =
                    available_assignment_updates(&user_assignments, AssignmentState::Cancelled);
                changes.push(StagedChange::CreateAssignment {
                    user_id: user_assignments.user.id,
                    line_item_id,
                });

                Ok(OperationOutcome {
                    changes,
                    message: format!(
                        "Successful assignment create operation (line item id: {line_item_id}) for user with username: '{username}'"
                    ),
                })
            },
        )
    }
}

/// Moves every available assignment of each user to the state carried in
/// the operation's `state` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelAssignmentsProcessor;

impl BulkOperationCollectionProcessor for CancelAssignmentsProcessor {
    fn process<S>(
        &self,
        store: &mut S,
        collection: &BulkOperationCollection,
    ) -> Result<BulkResult, CoreError>
    where
        S: AssignmentStore + ?Sized,
    {
        process_transactionally(
            store,
            collection,
            BulkOperationType::Update,
            |store, operation| {
                let username: &str = operation.identifier();
                let raw_state: &str =
                    operation
                        .attribute(STATE_ATTRIBUTE)
                        .ok_or_else(|| CoreError::MissingAttribute {
                            identifier: username.to_string(),
                            attribute: STATE_ATTRIBUTE.to_string(),
                        })?;
                let state: AssignmentState = AssignmentState::from_str(raw_state)?;

                let user_assignments: UserAssignments =
                    store.find_user_with_assignments(username)?;
                let changes: Vec<StagedChange> =
                    available_assignment_updates(&user_assignments, state);

                Ok(OperationOutcome {
                    message: format!(
                        "Successful assignment update operation ({} assignment(s) set to '{state}') for user with username: '{username}'",
                        changes.len()
                    ),
                    changes,
                })
            },
        )
    }
}
