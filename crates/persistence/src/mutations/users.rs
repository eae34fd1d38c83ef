// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User mutations.

use diesel::prelude::*;
use simple_roster_domain::NewUser;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::users;
use crate::error::PersistenceError;

backend_fn! {
/// Inserts a batch of users in one transaction.
///
/// Passwords are hashed with bcrypt at the given cost. A duplicate username
/// rolls back the whole batch.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `new_users` - The users to create
/// * `hash_cost` - The bcrypt cost factor
///
/// # Errors
///
/// Returns `PersistenceError::UniqueViolation` on a duplicate username, or an
/// error if hashing or the insert fails.
pub fn insert_users(
    conn: &mut _,
    new_users: &[NewUser],
    hash_cost: u32,
) -> Result<Vec<i64>, PersistenceError> {
    conn.transaction(|conn| {
        let mut ids: Vec<i64> = Vec::with_capacity(new_users.len());

        for new_user in new_users {
            // Hash the password using bcrypt
            let password_hash: String = bcrypt::hash(&new_user.password, hash_cost)
                .map_err(|e| PersistenceError::Other(format!("Failed to hash password: {e}")))?;

            diesel::insert_into(users::table)
                .values((
                    users::username.eq(&new_user.username),
                    users::password_hash.eq(&password_hash),
                    users::group_id.eq(new_user.group_id.as_deref()),
                ))
                .execute(conn)?;

            let user_id: i64 = conn.get_last_insert_rowid()?;
            debug!(user_id, username = %new_user.username, "User inserted");
            ids.push(user_id);
        }

        info!(count = ids.len(), "Inserted user batch");
        Ok(ids)
    })
}
}
