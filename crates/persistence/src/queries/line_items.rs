// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Line item queries.

use diesel::prelude::*;
use simple_roster_domain::LineItem;
use tracing::debug;

use crate::data_models::LineItemRow;
use crate::diesel_schema::line_items;
use crate::error::PersistenceError;

fn convert_rows(rows: Vec<LineItemRow>) -> Result<Vec<LineItem>, PersistenceError> {
    rows.into_iter().map(LineItem::try_from).collect()
}

backend_fn! {
/// Retrieves a line item by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_line_item(
    conn: &mut _,
    line_item_id: i64,
) -> Result<Option<LineItem>, PersistenceError> {
    debug!(line_item_id, "Looking up line item");

    line_items::table
        .find(line_item_id)
        .select(LineItemRow::as_select())
        .first(conn)
        .optional()?
        .map(LineItem::try_from)
        .transpose()
}
}

backend_fn! {
/// Retrieves a line item by slug.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_line_item_by_slug(
    conn: &mut _,
    slug: &str,
) -> Result<Option<LineItem>, PersistenceError> {
    debug!(slug, "Looking up line item by slug");

    line_items::table
        .filter(line_items::slug.eq(slug))
        .select(LineItemRow::as_select())
        .first(conn)
        .optional()?
        .map(LineItem::try_from)
        .transpose()
}
}

backend_fn! {
/// Lists every line item ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_line_items(conn: &mut _) -> Result<Vec<LineItem>, PersistenceError> {
    let rows: Vec<LineItemRow> = line_items::table
        .order(line_items::id.asc())
        .select(LineItemRow::as_select())
        .load(conn)?;

    convert_rows(rows)
}
}

backend_fn! {
/// Lists the line items with the given ids.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_line_items_by_ids(
    conn: &mut _,
    ids: &[i64],
) -> Result<Vec<LineItem>, PersistenceError> {
    let rows: Vec<LineItemRow> = line_items::table
        .filter(line_items::id.eq_any(ids))
        .order(line_items::id.asc())
        .select(LineItemRow::as_select())
        .load(conn)?;

    convert_rows(rows)
}
}

backend_fn! {
/// Lists the line items with the given slugs.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_line_items_by_slugs(
    conn: &mut _,
    slugs: &[String],
) -> Result<Vec<LineItem>, PersistenceError> {
    let rows: Vec<LineItemRow> = line_items::table
        .filter(line_items::slug.eq_any(slugs))
        .order(line_items::id.asc())
        .select(LineItemRow::as_select())
        .load(conn)?;

    convert_rows(rows)
}
}
