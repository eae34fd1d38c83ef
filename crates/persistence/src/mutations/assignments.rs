// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Assignment mutations.

use diesel::prelude::*;
use simple_roster::StagedChange;
use simple_roster_domain::{Assignment, AssignmentState, NewAssignment};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::{to_db_count, to_db_timestamp};
use crate::diesel_schema::assignments;
use crate::error::PersistenceError;

backend_fn! {
/// Inserts a batch of `ready` assignments with no attempts in one
/// transaction.
///
/// # Errors
///
/// Returns an error if a referenced user or line item does not exist or the
/// insert fails.
pub fn insert_assignments(
    conn: &mut _,
    new_assignments: &[NewAssignment],
    now: OffsetDateTime,
) -> Result<Vec<i64>, PersistenceError> {
    let updated_at: String = to_db_timestamp(now);

    conn.transaction(|conn| {
        let mut ids: Vec<i64> = Vec::with_capacity(new_assignments.len());

        for assignment in new_assignments {
            diesel::insert_into(assignments::table)
                .values((
                    assignments::user_id.eq(assignment.user_id),
                    assignments::line_item_id.eq(assignment.line_item_id),
                    assignments::state.eq(AssignmentState::Ready.as_str()),
                    assignments::attempts_count.eq(0),
                    assignments::updated_at.eq(&updated_at),
                ))
                .execute(conn)?;
            ids.push(conn.get_last_insert_rowid()?);
        }

        info!(count = ids.len(), "Inserted assignment batch");
        Ok(ids)
    })
}
}

backend_fn! {
/// Writes the state, attempt counter and timestamp of an assignment.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the assignment does not exist.
pub fn save_assignment(conn: &mut _, assignment: &Assignment) -> Result<(), PersistenceError> {
    let updated: usize = diesel::update(assignments::table.find(assignment.id))
        .set((
            assignments::state.eq(assignment.state.as_str()),
            assignments::attempts_count.eq(to_db_count(assignment.attempts_count)),
            assignments::updated_at.eq(to_db_timestamp(assignment.updated_at)),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(PersistenceError::NotFound(format!(
            "assignment {}",
            assignment.id
        )));
    }

    debug!(assignment_id = assignment.id, state = %assignment.state, "Assignment saved");
    Ok(())
}
}

backend_fn! {
/// Writes staged changes in order on the current connection.
///
/// The caller owns the surrounding transaction.
///
/// # Errors
///
/// Returns an error on the first change that cannot be written.
pub fn apply_staged_changes(
    conn: &mut _,
    changes: &[StagedChange],
    now: OffsetDateTime,
) -> Result<(), PersistenceError> {
    let updated_at: String = to_db_timestamp(now);

    for change in changes {
        match change {
            StagedChange::CreateAssignment {
                user_id,
                line_item_id,
            } => {
                diesel::insert_into(assignments::table)
                    .values((
                        assignments::user_id.eq(*user_id),
                        assignments::line_item_id.eq(*line_item_id),
                        assignments::state.eq(AssignmentState::Ready.as_str()),
                        assignments::attempts_count.eq(0),
                        assignments::updated_at.eq(&updated_at),
                    ))
                    .execute(conn)?;
            }
            StagedChange::UpdateAssignmentState {
                assignment_id,
                state,
                ..
            } => {
                let updated: usize = diesel::update(assignments::table.find(*assignment_id))
                    .set((
                        assignments::state.eq(state.as_str()),
                        assignments::updated_at.eq(&updated_at),
                    ))
                    .execute(conn)?;

                if updated == 0 {
                    return Err(PersistenceError::NotFound(format!(
                        "assignment {assignment_id}"
                    )));
                }
            }
        }
    }

    debug!(count = changes.len(), "Staged changes written");
    Ok(())
}
}
