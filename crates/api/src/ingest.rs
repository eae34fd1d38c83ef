// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! CSV ingestion of users, line items, LTI instances and assignments.
//!
//! Every ingester validates each row as it is read, buffers rows into
//! batches of the configured size and inserts one batch per transaction.
//! In dry run mode rows are still validated and counted but nothing is
//! written.

use std::cell::RefCell;
use std::collections::HashMap;

use simple_roster::{BatchReport, BatchSize, ResultCache, process_in_batches};
use simple_roster_domain::{
    NewAssignment, NewLineItem, NewLtiInstance, NewUser, parse_optional_timestamp,
    validate_line_item_fields, validate_lti_instance_fields, validate_max_attempts,
    validate_username,
};
use simple_roster_persistence::{Persistence, cache};
use time::OffsetDateTime;
use tracing::info;

use crate::csv_source::{CsvRow, CsvSource};
use crate::error::IngestError;

/// Columns of the users file.
pub const USER_COLUMNS: &[&str] = &["username", "password"];
/// Columns of the line items file.
pub const LINE_ITEM_COLUMNS: &[&str] = &[
    "uri",
    "label",
    "slug",
    "startTimestamp",
    "endTimestamp",
    "maxAttempts",
];
/// Columns of the LTI instances file.
pub const LTI_INSTANCE_COLUMNS: &[&str] = &["label", "ltiLink", "ltiKey", "ltiSecret"];
/// Columns of the assignments file.
pub const ASSIGNMENT_COLUMNS: &[&str] = &["username", "lineItemSlug"];

/// Options shared by every ingester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Rows per insert batch.
    pub batch: BatchSize,
    /// Validate and count only.
    pub dry_run: bool,
}

fn user_from_row(row: &CsvRow) -> Result<NewUser, IngestError> {
    let username: String =
        validate_username(row.required("username")?).map_err(|e| row.invalid(e))?;
    Ok(NewUser {
        username,
        password: row.required("password")?.to_string(),
        group_id: row.optional("groupId").map(str::to_string),
    })
}

fn line_item_from_row(row: &CsvRow) -> Result<NewLineItem, IngestError> {
    let line_item: NewLineItem = NewLineItem {
        uri: row.required("uri")?.to_string(),
        label: row.required("label")?.to_string(),
        slug: row.required("slug")?.to_string(),
        starts_at: parse_optional_timestamp(row.optional("startTimestamp").unwrap_or_default())
            .map_err(|e| row.invalid(e))?,
        ends_at: parse_optional_timestamp(row.optional("endTimestamp").unwrap_or_default())
            .map_err(|e| row.invalid(e))?,
        max_attempts: validate_max_attempts(row.optional("maxAttempts").unwrap_or_default())
            .map_err(|e| row.invalid(e))?,
    };
    validate_line_item_fields(&line_item).map_err(|e| row.invalid(e))?;
    Ok(line_item)
}

fn lti_instance_from_row(row: &CsvRow) -> Result<NewLtiInstance, IngestError> {
    let instance: NewLtiInstance = NewLtiInstance {
        label: row.required("label")?.to_string(),
        lti_link: row.required("ltiLink")?.to_string(),
        lti_key: row.required("ltiKey")?.to_string(),
        lti_secret: row.required("ltiSecret")?.to_string(),
    };
    validate_lti_instance_fields(&instance).map_err(|e| row.invalid(e))?;
    Ok(instance)
}

fn log_progress(noun: &'static str) -> impl FnMut(usize) {
    move |processed| info!(processed, "{noun} processed so far")
}

/// Imports users, hashing passwords with `hash_cost`.
///
/// # Errors
///
/// Returns the first row, CSV or database error. Batches inserted before
/// the error stay committed.
pub fn ingest_users(
    persistence: &mut Persistence,
    source: CsvSource,
    options: IngestOptions,
    hash_cost: u32,
) -> Result<BatchReport, IngestError> {
    let rows = source.rows().map(|row| user_from_row(&row?));
    process_in_batches(
        rows,
        options.batch,
        options.dry_run,
        |batch: Vec<NewUser>| {
            persistence.insert_users(&batch, hash_cost)?;
            Ok(())
        },
        log_progress("users"),
    )
}

/// Imports line items.
///
/// # Errors
///
/// Returns the first row, CSV or database error. Batches inserted before
/// the error stay committed.
pub fn ingest_line_items(
    persistence: &mut Persistence,
    source: CsvSource,
    options: IngestOptions,
) -> Result<BatchReport, IngestError> {
    let rows = source.rows().map(|row| line_item_from_row(&row?));
    process_in_batches(
        rows,
        options.batch,
        options.dry_run,
        |batch: Vec<NewLineItem>| {
            persistence.insert_line_items(&batch)?;
            Ok(())
        },
        log_progress("line items"),
    )
}

/// Imports LTI instances and refreshes the cached instance list.
///
/// # Errors
///
/// Returns the first row, CSV or database error. Batches inserted before
/// the error stay committed.
pub fn ingest_lti_instances(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    source: CsvSource,
    options: IngestOptions,
) -> Result<BatchReport, IngestError> {
    let rows = source.rows().map(|row| lti_instance_from_row(&row?));
    let report: BatchReport = process_in_batches(
        rows,
        options.batch,
        options.dry_run,
        |batch: Vec<NewLtiInstance>| {
            persistence.insert_lti_instances(&batch)?;
            Ok(())
        },
        log_progress("LTI instances"),
    )?;

    if report.flushed_batches > 0 {
        cache::warm_lti_instances(persistence, result_cache)?;
    }
    Ok(report)
}

/// Resolves usernames and line item slugs of assignment rows.
///
/// Line items are few and looked up once per slug.
struct AssignmentResolver<'a> {
    persistence: &'a mut Persistence,
    line_items: HashMap<String, i64>,
}

impl AssignmentResolver<'_> {
    fn resolve(&mut self, row: &CsvRow) -> Result<NewAssignment, IngestError> {
        let username: &str = row.required("username")?;
        let slug: &str = row.required("lineItemSlug")?;

        let user_id: i64 = self
            .persistence
            .get_user_by_username(username)?
            .ok_or_else(|| IngestError::UnknownUser {
                line: row.line(),
                username: username.to_string(),
            })?
            .id;

        let line_item_id: i64 = if let Some(id) = self.line_items.get(slug).copied() {
            id
        } else {
            let id: i64 = self
                .persistence
                .get_line_item_by_slug(slug)?
                .ok_or_else(|| IngestError::UnknownLineItem {
                    line: row.line(),
                    slug: slug.to_string(),
                })?
                .id;
            self.line_items.insert(slug.to_string(), id);
            id
        };

        Ok(NewAssignment {
            user_id,
            line_item_id,
        })
    }
}

/// Imports `ready` assignments from `username,lineItemSlug` rows.
///
/// Unknown users or line items abort the run, in dry run mode too.
///
/// # Errors
///
/// Returns the first row, CSV or database error. Batches inserted before
/// the error stay committed.
pub fn ingest_assignments(
    persistence: &mut Persistence,
    source: CsvSource,
    options: IngestOptions,
    now: OffsetDateTime,
) -> Result<BatchReport, IngestError> {
    let resolver: RefCell<AssignmentResolver<'_>> = RefCell::new(AssignmentResolver {
        persistence,
        line_items: HashMap::new(),
    });

    let rows = source
        .rows()
        .map(|row| resolver.borrow_mut().resolve(&row?));
    process_in_batches(
        rows,
        options.batch,
        options.dry_run,
        |batch: Vec<NewAssignment>| {
            resolver
                .borrow_mut()
                .persistence
                .insert_assignments(&batch, now)?;
            Ok(())
        },
        log_progress("assignments"),
    )
}
