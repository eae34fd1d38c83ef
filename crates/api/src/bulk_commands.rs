// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bulk creation and cancellation of assignments from a username list.
//!
//! Usernames are read from the `username` column and handed to the bulk
//! processors one batch at a time, reusing a single collection that is
//! cleared between batches. Each batch commits or rolls back as a whole.
//!
//! A username listed more than once is processed once. Staged changes are
//! only written at the end of a batch, so a repeat would act on the state
//! from before the batch.

use std::collections::HashSet;

use simple_roster::{
    BatchReport, BulkOperation, BulkOperationCollection, BulkOperationCollectionProcessor,
    BulkOperationType, BulkResult, CancelAssignmentsProcessor, CreateAssignmentsProcessor,
    STATE_ATTRIBUTE, process_in_batches,
};
use simple_roster_domain::{AssignmentState, validate_username};
use simple_roster_persistence::Persistence;
use tracing::{debug, info, warn};

use crate::csv_source::{CsvRow, CsvSource};
use crate::error::IngestError;
use crate::ingest::IngestOptions;

/// Columns of a bulk assignment file.
pub const BULK_COLUMNS: &[&str] = &["username"];

/// Which bulk mutation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Give each user a fresh assignment.
    Create,
    /// Cancel each user's available assignments.
    Cancel,
}

impl BulkAction {
    const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Cancel => "cancelled",
        }
    }

    fn operation(self, username: &str) -> BulkOperation {
        match self {
            Self::Create => BulkOperation::new(username, BulkOperationType::Create),
            Self::Cancel => BulkOperation::new(username, BulkOperationType::Update)
                .with_attribute(STATE_ATTRIBUTE, AssignmentState::Cancelled.as_str()),
        }
    }

    fn process(
        self,
        persistence: &mut Persistence,
        collection: &BulkOperationCollection,
    ) -> Result<BulkResult, IngestError> {
        let result: BulkResult = match self {
            Self::Create => CreateAssignmentsProcessor.process(persistence, collection)?,
            Self::Cancel => CancelAssignmentsProcessor.process(persistence, collection)?,
        };
        Ok(result)
    }
}

/// Outcome of a bulk command run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkCommandReport {
    /// Usernames read from the source.
    pub processed: usize,
    /// Repeated usernames that were skipped.
    pub duplicates: usize,
    /// Users whose operation was committed, or would be in a dry run.
    pub succeeded: usize,
    /// Users whose operation failed.
    pub failed: Vec<String>,
    /// Successful operations discarded because their batch rolled back.
    pub rolled_back: usize,
    /// Whether nothing was committed by design.
    pub dry_run: bool,
}

impl BulkCommandReport {
    /// Returns whether any operation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Renders the operator facing summary line.
    #[must_use]
    pub fn summary(&self, action: BulkAction) -> String {
        let verb: &str = action.past_tense();
        if self.processed == 0 {
            return String::from("Nothing to process, no usernames found");
        }
        if self.dry_run {
            return format!(
                "[DRY RUN] {} assignment(s) would be {verb}, {} failure(s)",
                self.succeeded,
                self.failed.len()
            );
        }
        if self.has_failures() {
            return format!(
                "[WARNING] {} assignment(s) {verb}, {} failure(s), {} rolled back: {}",
                self.succeeded,
                self.failed.len(),
                self.rolled_back,
                self.failed.join(", ")
            );
        }
        format!("[OK] {} assignment(s) have been {verb}", self.succeeded)
    }

    fn record(&mut self, result: &BulkResult) {
        let successes: usize = result.success_count();
        if result.is_applied() || self.dry_run {
            self.succeeded += successes;
        } else {
            self.rolled_back += successes;
        }
        self.failed.extend(
            result
                .results()
                .iter()
                .filter(|(_, ok)| !**ok)
                .map(|(username, _)| username.clone()),
        );
    }
}

fn username_from_row(row: &CsvRow) -> Result<String, IngestError> {
    validate_username(row.required("username")?).map_err(|e| row.invalid(e))
}

/// Runs `action` for every username of `source`.
///
/// In dry run mode every batch still goes through the processor, which
/// resolves users and reports per-user outcomes without opening a
/// transaction.
///
/// # Errors
///
/// Returns the first CSV or row error, or a transaction failure. Batches
/// committed before the error stay committed.
pub fn run_bulk_assignments(
    persistence: &mut Persistence,
    source: CsvSource,
    action: BulkAction,
    options: IngestOptions,
) -> Result<BulkCommandReport, IngestError> {
    let mut report: BulkCommandReport = BulkCommandReport {
        dry_run: options.dry_run,
        ..BulkCommandReport::default()
    };
    let mut collection: BulkOperationCollection = BulkOperationCollection::new(options.dry_run);
    let mut seen: HashSet<String> = HashSet::new();

    let rows = source.rows().map(|row| username_from_row(&row?));
    let batches: BatchReport = process_in_batches(
        rows,
        options.batch,
        false,
        |usernames: Vec<String>| {
            for username in usernames {
                let operation: BulkOperation = action.operation(&username);
                if seen.insert(username) {
                    collection.add(operation);
                } else {
                    debug!(
                        username = operation.identifier(),
                        "Skipping repeated username"
                    );
                    report.duplicates += 1;
                }
            }
            if collection.is_empty() {
                return Ok(());
            }

            let result: BulkResult = action.process(persistence, &collection)?;
            if result.has_failures() {
                warn!(
                    failures = result.failure_count(),
                    applied = result.is_applied(),
                    "Bulk batch had failures"
                );
            }
            report.record(&result);
            collection.clear();
            Ok(())
        },
        |processed| info!(processed, "Usernames processed so far"),
    )?;

    report.processed = batches.processed;
    if report.duplicates > 0 {
        info!(
            duplicates = report.duplicates,
            "Repeated usernames were skipped"
        );
    }
    Ok(report)
}
