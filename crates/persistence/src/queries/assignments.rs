// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Assignment queries.

use diesel::prelude::*;
use simple_roster_domain::{Assignment, AssignmentState};
use time::OffsetDateTime;

use crate::data_models::{AssignmentRow, to_db_timestamp};
use crate::diesel_schema::assignments;
use crate::error::PersistenceError;

backend_fn! {
/// Retrieves an assignment by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_assignment(
    conn: &mut _,
    assignment_id: i64,
) -> Result<Option<Assignment>, PersistenceError> {
    assignments::table
        .find(assignment_id)
        .select(AssignmentRow::as_select())
        .first(conn)
        .optional()?
        .map(Assignment::try_from)
        .transpose()
}
}

backend_fn! {
/// Lists `started` assignments last updated before `updated_before`.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_stuck_assignments(
    conn: &mut _,
    updated_before: OffsetDateTime,
    limit: i64,
) -> Result<Vec<Assignment>, PersistenceError> {
    let threshold: String = to_db_timestamp(updated_before);

    let rows: Vec<AssignmentRow> = assignments::table
        .filter(assignments::state.eq(AssignmentState::Started.as_str()))
        .filter(assignments::updated_at.lt(&threshold))
        .order(assignments::id.asc())
        .limit(limit)
        .select(AssignmentRow::as_select())
        .load(conn)?;

    rows.into_iter().map(Assignment::try_from).collect()
}
}

backend_fn! {
/// Counts all assignments.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_assignments(conn: &mut _) -> Result<i64, PersistenceError> {
    Ok(assignments::table.count().get_result(conn)?)
}
}

backend_fn! {
/// Counts assignments in a given state.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_assignments_in_state(
    conn: &mut _,
    state: AssignmentState,
) -> Result<i64, PersistenceError> {
    Ok(assignments::table
        .filter(assignments::state.eq(state.as_str()))
        .count()
        .get_result(conn)?)
}
}
