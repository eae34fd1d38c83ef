// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! LTI instance mutations.

use diesel::prelude::*;
use simple_roster_domain::NewLtiInstance;
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::diesel_schema::lti_instances;
use crate::error::PersistenceError;

backend_fn! {
/// Inserts a batch of LTI instances in one transaction.
///
/// # Errors
///
/// Returns `PersistenceError::UniqueViolation` on a duplicate key, or an
/// error if the insert fails.
pub fn insert_lti_instances(
    conn: &mut _,
    instances: &[NewLtiInstance],
) -> Result<Vec<i64>, PersistenceError> {
    conn.transaction(|conn| {
        let mut ids: Vec<i64> = Vec::with_capacity(instances.len());

        for instance in instances {
            diesel::insert_into(lti_instances::table)
                .values((
                    lti_instances::label.eq(&instance.label),
                    lti_instances::lti_link.eq(&instance.lti_link),
                    lti_instances::lti_key.eq(&instance.lti_key),
                    lti_instances::lti_secret.eq(&instance.lti_secret),
                ))
                .execute(conn)?;
            ids.push(conn.get_last_insert_rowid()?);
        }

        info!(count = ids.len(), "Inserted LTI instance batch");
        Ok(ids)
    })
}
}
