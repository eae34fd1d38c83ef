// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Line item mutations.

use diesel::prelude::*;
use simple_roster_domain::NewLineItem;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::{to_db_count, to_db_timestamp};
use crate::diesel_schema::line_items;
use crate::error::PersistenceError;

backend_fn! {
/// Inserts a batch of line items in one transaction. New line items are
/// active.
///
/// # Errors
///
/// Returns `PersistenceError::UniqueViolation` on a duplicate slug, or an
/// error if the insert fails.
pub fn insert_line_items(
    conn: &mut _,
    new_line_items: &[NewLineItem],
) -> Result<Vec<i64>, PersistenceError> {
    conn.transaction(|conn| {
        let mut ids: Vec<i64> = Vec::with_capacity(new_line_items.len());

        for item in new_line_items {
            diesel::insert_into(line_items::table)
                .values((
                    line_items::uri.eq(&item.uri),
                    line_items::label.eq(&item.label),
                    line_items::slug.eq(&item.slug),
                    line_items::starts_at.eq(item.starts_at.map(to_db_timestamp)),
                    line_items::ends_at.eq(item.ends_at.map(to_db_timestamp)),
                    line_items::max_attempts.eq(to_db_count(item.max_attempts)),
                    line_items::is_active.eq(1),
                ))
                .execute(conn)?;

            let line_item_id: i64 = conn.get_last_insert_rowid()?;
            debug!(line_item_id, slug = %item.slug, "Line item inserted");
            ids.push(line_item_id);
        }

        info!(count = ids.len(), "Inserted line item batch");
        Ok(ids)
    })
}
}

backend_fn! {
/// Replaces the delivery URI of the line item with the given slug.
///
/// # Errors
///
/// Returns an error if the update fails.
/// Returns `Ok(None)` if no line item has that slug.
pub fn update_line_item_uri(
    conn: &mut _,
    slug: &str,
    uri: &str,
) -> Result<Option<i64>, PersistenceError> {
    let line_item_id: Option<i64> = line_items::table
        .filter(line_items::slug.eq(slug))
        .select(line_items::id)
        .first(conn)
        .optional()?;

    let Some(line_item_id) = line_item_id else {
        return Ok(None);
    };

    diesel::update(line_items::table.find(line_item_id))
        .set(line_items::uri.eq(uri))
        .execute(conn)?;

    info!(line_item_id, slug, "Line item URI updated");
    Ok(Some(line_item_id))
}
}

backend_fn! {
/// Sets the availability window of the given line items. `None` clears a
/// bound.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_line_item_dates(
    conn: &mut _,
    ids: &[i64],
    starts_at: Option<OffsetDateTime>,
    ends_at: Option<OffsetDateTime>,
) -> Result<usize, PersistenceError> {
    let updated: usize = diesel::update(line_items::table.filter(line_items::id.eq_any(ids)))
        .set((
            line_items::starts_at.eq(starts_at.map(to_db_timestamp)),
            line_items::ends_at.eq(ends_at.map(to_db_timestamp)),
        ))
        .execute(conn)?;

    info!(updated, "Line item dates updated");
    Ok(updated)
}
}

backend_fn! {
/// Activates or deactivates the given line items.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_line_items_active(
    conn: &mut _,
    ids: &[i64],
    is_active: bool,
) -> Result<usize, PersistenceError> {
    let updated: usize = diesel::update(line_items::table.filter(line_items::id.eq_any(ids)))
        .set(line_items::is_active.eq(i32::from(is_active)))
        .execute(conn)?;

    info!(updated, is_active, "Line item state updated");
    Ok(updated)
}
}
