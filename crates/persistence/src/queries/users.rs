// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User queries.

use diesel::prelude::*;
use simple_roster_domain::{Assignment, User, UserAssignments};
use tracing::debug;

use crate::data_models::{AssignmentRow, UserFilter, UserRow};
use crate::diesel_schema::{assignments, users};
use crate::error::PersistenceError;

backend_fn! {
/// Retrieves a user by username.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the user is not found.
pub fn get_user_by_username(
    conn: &mut _,
    username: &str,
) -> Result<Option<User>, PersistenceError> {
    debug!(username, "Looking up user");

    let row: Option<UserRow> = users::table
        .filter(users::username.eq(username))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(User::from))
}
}

backend_fn! {
/// Retrieves a user by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_user_by_id(conn: &mut _, user_id: i64) -> Result<Option<User>, PersistenceError> {
    let row: Option<UserRow> = users::table
        .find(user_id)
        .select(UserRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(User::from))
}
}

backend_fn! {
/// Loads a user and all of their assignments, oldest first.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the user does not exist, or an
/// error if a stored row cannot be converted.
pub fn find_user_with_assignments(
    conn: &mut _,
    username: &str,
) -> Result<UserAssignments, PersistenceError> {
    let user: User = users::table
        .filter(users::username.eq(username))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?
        .map(User::from)
        .ok_or_else(|| PersistenceError::NotFound(format!("user '{username}'")))?;

    let rows: Vec<AssignmentRow> = assignments::table
        .filter(assignments::user_id.eq(user.id))
        .order(assignments::id.asc())
        .select(AssignmentRow::as_select())
        .load(conn)?;

    let assignments: Vec<Assignment> = rows
        .into_iter()
        .map(Assignment::try_from)
        .collect::<Result<_, _>>()?;

    debug!(username, count = assignments.len(), "Loaded user assignments");

    Ok(UserAssignments { user, assignments })
}
}

backend_fn! {
/// Lists `(id, username)` pairs with an id greater than `after_id`.
///
/// Username and line item filters are applied in SQL. The shard filter is
/// applied to the returned page, so a page may hold fewer than `limit`
/// entries while more users remain. Callers page on the returned
/// `last_id`, which is `None` once the table is exhausted.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_users_page(
    conn: &mut _,
    filter: &UserFilter,
    after_id: i64,
    limit: i64,
) -> Result<(Vec<(i64, String)>, Option<i64>), PersistenceError> {
    let mut query = users::table
        .select((users::id, users::username))
        .filter(users::id.gt(after_id))
        .order(users::id.asc())
        .limit(limit)
        .into_boxed();

    if !filter.usernames.is_empty() {
        query = query.filter(users::username.eq_any(filter.usernames.clone()));
    }

    if !filter.line_item_ids.is_empty() {
        query = query.filter(
            users::id.eq_any(
                assignments::table
                    .filter(assignments::line_item_id.eq_any(filter.line_item_ids.clone()))
                    .select(assignments::user_id),
            ),
        );
    }

    let rows: Vec<(i64, String)> = query.load(conn)?;
    let last_id: Option<i64> = rows.last().map(|(id, _)| *id);

    let page: Vec<(i64, String)> = match filter.shard {
        Some(shard) => rows.into_iter().filter(|(id, _)| shard.contains(*id)).collect(),
        None => rows,
    };

    Ok((page, last_id))
}
}

backend_fn! {
/// Counts all users.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_users(conn: &mut _) -> Result<i64, PersistenceError> {
    Ok(users::table.count().get_result(conn)?)
}
}
