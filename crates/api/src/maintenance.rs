// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Operator maintenance of line items and assignments.

use num_traits::ToPrimitive;
use simple_roster::BatchSize;
use simple_roster_domain::{Assignment, LineItem, validate_date_window};
use simple_roster_persistence::Persistence;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};

use crate::error::ApiError;

/// Identifies the line items a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemSelector {
    /// By database id.
    Ids(Vec<i64>),
    /// By slug.
    Slugs(Vec<String>),
}

/// Whether to activate or deactivate line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemStateChange {
    /// Make the line items launchable.
    Activate,
    /// Block launches.
    Deactivate,
}

impl LineItemStateChange {
    /// Parses `activate` or `deactivate`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other value.
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value.trim() {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            other => Err(ApiError::InvalidInput {
                field: String::from("toggle"),
                message: format!("expected 'activate' or 'deactivate', got '{other}'"),
            }),
        }
    }

    const fn is_active(self) -> bool {
        matches!(self, Self::Activate)
    }
}

/// Loads the selected line items.
///
/// # Errors
///
/// Returns an error if the selector is empty or names a line item that
/// does not exist.
pub fn select_line_items(
    persistence: &mut Persistence,
    selector: &LineItemSelector,
) -> Result<Vec<LineItem>, ApiError> {
    let (found, missing): (Vec<LineItem>, Option<String>) = match selector {
        LineItemSelector::Ids(ids) if !ids.is_empty() => {
            let found: Vec<LineItem> = persistence.list_line_items_by_ids(ids)?;
            let missing: Option<String> = ids
                .iter()
                .find(|id| !found.iter().any(|item| item.id == **id))
                .map(ToString::to_string);
            (found, missing)
        }
        LineItemSelector::Slugs(slugs) if !slugs.is_empty() => {
            let found: Vec<LineItem> = persistence.list_line_items_by_slugs(slugs)?;
            let missing: Option<String> = slugs
                .iter()
                .find(|slug| !found.iter().any(|item| &item.slug == *slug))
                .cloned();
            (found, missing)
        }
        _ => {
            return Err(ApiError::InvalidInput {
                field: String::from("line-item-ids"),
                message: String::from("at least one line item id or slug is required"),
            });
        }
    };

    if let Some(missing) = missing {
        return Err(ApiError::ResourceNotFound {
            resource_type: String::from("LineItem"),
            message: format!("Line item '{missing}' does not exist"),
        });
    }
    Ok(found)
}

/// Sets or clears the availability window of the selected line items.
///
/// Returns the number of line items changed, or that would be in a dry run.
///
/// # Errors
///
/// Returns an error if the end precedes the start, a line item does not
/// exist, or the database fails.
pub fn change_line_item_dates(
    persistence: &mut Persistence,
    selector: &LineItemSelector,
    starts_at: Option<OffsetDateTime>,
    ends_at: Option<OffsetDateTime>,
    dry_run: bool,
) -> Result<usize, ApiError> {
    validate_date_window(starts_at, ends_at)?;
    let ids: Vec<i64> = select_line_items(persistence, selector)?
        .iter()
        .map(|item| item.id)
        .collect();

    if dry_run {
        info!(count = ids.len(), "[DRY RUN] Line item dates would change");
        return Ok(ids.len());
    }

    let updated: usize = persistence.update_line_item_dates(&ids, starts_at, ends_at)?;
    info!(count = updated, starts_at = ?starts_at, ends_at = ?ends_at, "Changed line item dates");
    Ok(updated)
}

/// Activates or deactivates the selected line items.
///
/// Returns the number of line items changed, or that would be in a dry run.
///
/// # Errors
///
/// Returns an error if a line item does not exist or the database fails.
pub fn change_line_item_state(
    persistence: &mut Persistence,
    selector: &LineItemSelector,
    change: LineItemStateChange,
    dry_run: bool,
) -> Result<usize, ApiError> {
    let ids: Vec<i64> = select_line_items(persistence, selector)?
        .iter()
        .map(|item| item.id)
        .collect();

    if dry_run {
        info!(count = ids.len(), "[DRY RUN] Line item state would change");
        return Ok(ids.len());
    }

    let updated: usize = persistence.set_line_items_active(&ids, change.is_active())?;
    info!(count = updated, active = change.is_active(), "Changed line item state");
    Ok(updated)
}

/// Completes `started` assignments that have not been updated for
/// `threshold_secs`, one transaction per batch.
///
/// Returns the number of assignments completed, or that would be in a dry
/// run.
///
/// # Errors
///
/// Returns an error if the database fails. Batches committed before the
/// error stay committed.
pub fn garbage_collect_assignments(
    persistence: &mut Persistence,
    threshold_secs: i64,
    batch: BatchSize,
    dry_run: bool,
    now: OffsetDateTime,
) -> Result<usize, ApiError> {
    let updated_before: OffsetDateTime = now - Duration::seconds(threshold_secs);

    if dry_run {
        let stuck: usize = persistence
            .list_stuck_assignments(updated_before, i64::MAX)?
            .len();
        info!(count = stuck, "[DRY RUN] Stuck assignments would be completed");
        return Ok(stuck);
    }

    let limit: i64 = batch.get().to_i64().unwrap_or(i64::MAX);
    let mut collected: usize = 0;
    loop {
        let stuck: Vec<Assignment> = persistence.list_stuck_assignments(updated_before, limit)?;
        if stuck.is_empty() {
            break;
        }

        persistence.start_transaction()?;
        if let Err(e) = expire_all(persistence, stuck, now, &mut collected) {
            if let Err(rollback_err) = persistence.rollback_transaction() {
                error!(error = %rollback_err, "Failed to roll back garbage collection batch");
            }
            return Err(e);
        }
        persistence.commit_transaction()?;
        info!(collected, "Stuck assignments completed so far");
    }

    Ok(collected)
}

fn expire_all(
    persistence: &mut Persistence,
    stuck: Vec<Assignment>,
    now: OffsetDateTime,
    collected: &mut usize,
) -> Result<(), ApiError> {
    for mut assignment in stuck {
        assignment.expire(now)?;
        persistence.save_assignment(&assignment)?;
        *collected += 1;
    }
    Ok(())
}
