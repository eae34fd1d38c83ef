// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! LTI instance queries.

use diesel::prelude::*;
use simple_roster_domain::LtiInstance;

use crate::data_models::LtiInstanceRow;
use crate::diesel_schema::lti_instances;
use crate::error::PersistenceError;

backend_fn! {
/// Lists every LTI instance ordered by id.
///
/// The order is what the load balancer indexes into, so it must stay stable.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_lti_instances(conn: &mut _) -> Result<Vec<LtiInstance>, PersistenceError> {
    let rows: Vec<LtiInstanceRow> = lti_instances::table
        .order(lti_instances::id.asc())
        .select(LtiInstanceRow::as_select())
        .load(conn)?;

    Ok(rows.into_iter().map(LtiInstance::from).collect())
}
}

backend_fn! {
/// Retrieves an LTI instance by its OAuth consumer key.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_lti_instance_by_key(
    conn: &mut _,
    lti_key: &str,
) -> Result<Option<LtiInstance>, PersistenceError> {
    let row: Option<LtiInstanceRow> = lti_instances::table
        .filter(lti_instances::lti_key.eq(lti_key))
        .select(LtiInstanceRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(LtiInstance::from))
}
}
