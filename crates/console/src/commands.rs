// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Console command services.
//!
//! Each function validates its options before touching the database, runs
//! the matching api-crate service and turns the result into an [`Outcome`]
//! the binary prints.

use std::path::PathBuf;
use std::sync::Arc;

use simple_roster::{BatchReport, BatchSize, ResultCache};
use simple_roster_api::{
    ASSIGNMENT_COLUMNS, BULK_COLUMNS, BulkAction, BulkCommandReport, CsvSource, IngestOptions,
    LINE_ITEM_COLUMNS, LTI_INSTANCE_COLUMNS, LineItemSelector, LineItemStateChange, RosterConfig,
    USER_COLUMNS, UserWarmupOptions, WarmupReport, change_line_item_dates, change_line_item_state,
    garbage_collect_assignments, ingest_assignments, ingest_line_items, ingest_lti_instances,
    ingest_users, parse_delimiter, parse_shard, resolve_line_item_slugs, run_bulk_assignments,
    warm_up_line_items, warm_up_lti_instances, warm_up_users,
};
use simple_roster_persistence::{Persistence, ResultCacheHook};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::error::CommandError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Everything a command needs: the database, the cache it refreshes and the
/// configuration.
pub struct Console {
    /// The database, with the cache refresh hook registered.
    pub persistence: Persistence,
    /// The result cache.
    pub cache: Arc<dyn ResultCache>,
    /// Runtime configuration.
    pub config: RosterConfig,
    /// Whether mutations are only reported.
    pub dry_run: bool,
}

impl Console {
    /// Wires the cache described by `config` into `persistence`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database backed cache cannot be opened.
    pub fn new(
        mut persistence: Persistence,
        config: RosterConfig,
        dry_run: bool,
    ) -> Result<Self, CommandError> {
        let cache: Arc<dyn ResultCache> = config.build_cache(&persistence)?;
        persistence.register_hook(ResultCacheHook::new(Arc::clone(&cache)));
        Ok(Self {
            persistence,
            cache,
            config,
            dry_run,
        })
    }
}

/// What a command reports back to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The summary line.
    pub message: String,
    /// Whether part of the work failed; the process exits with 1.
    pub failed: bool,
}

impl Outcome {
    const fn ok(message: String) -> Self {
        Self {
            message,
            failed: false,
        }
    }
}

/// The kinds of CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    /// `username,password[,groupId]`
    Users,
    /// `uri,label,slug,startTimestamp,endTimestamp,maxAttempts`; empty timestamps are unbounded
    LineItems,
    /// `label,ltiLink,ltiKey,ltiSecret`
    LtiInstances,
    /// `username,lineItemSlug`
    Assignments,
}

impl IngestKind {
    const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Users => USER_COLUMNS,
            Self::LineItems => LINE_ITEM_COLUMNS,
            Self::LtiInstances => LTI_INSTANCE_COLUMNS,
            Self::Assignments => ASSIGNMENT_COLUMNS,
        }
    }

    const fn noun(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::LineItems => "line items",
            Self::LtiInstances => "LTI instances",
            Self::Assignments => "assignments",
        }
    }
}

/// Where a CSV file is read from and how it is batched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    /// The file path.
    pub path: PathBuf,
    /// Single-character field delimiter.
    pub delimiter: String,
    /// Storage backend name.
    pub storage: String,
    /// Rows per batch.
    pub batch: i64,
}

impl SourceOptions {
    fn open(
        &self,
        required: &[&str],
        dry_run: bool,
    ) -> Result<(CsvSource, IngestOptions), CommandError> {
        let batch: BatchSize = BatchSize::new(self.batch)?;
        let delimiter: u8 = parse_delimiter(&self.delimiter)?;
        let source: CsvSource = CsvSource::open(&self.path, &self.storage, delimiter, required)?;
        debug!(path = %self.path.display(), batch = batch.get(), dry_run, "Opened CSV source");
        Ok((source, IngestOptions { batch, dry_run }))
    }
}

/// Imports a CSV file.
///
/// # Errors
///
/// Returns an error if the options are invalid, a row is rejected or the
/// database fails. Batches committed before the error stay committed.
pub fn ingest(
    console: &mut Console,
    kind: IngestKind,
    source: &SourceOptions,
) -> Result<Outcome, CommandError> {
    let (csv, options): (CsvSource, IngestOptions) = source.open(kind.columns(), console.dry_run)?;
    info!(kind = kind.noun(), path = %source.path.display(), "Starting ingestion");

    let report: BatchReport = match kind {
        IngestKind::Users => ingest_users(
            &mut console.persistence,
            csv,
            options,
            console.config.password_hash_cost,
        )?,
        IngestKind::LineItems => ingest_line_items(&mut console.persistence, csv, options)?,
        IngestKind::LtiInstances => ingest_lti_instances(
            &mut console.persistence,
            console.cache.as_ref(),
            csv,
            options,
        )?,
        IngestKind::Assignments => ingest_assignments(
            &mut console.persistence,
            csv,
            options,
            OffsetDateTime::now_utc(),
        )?,
    };

    Ok(Outcome::ok(report.summary(kind.noun())))
}

/// Creates or cancels assignments for the usernames of a CSV file.
///
/// # Errors
///
/// Returns an error if the options are invalid, a row is rejected or a
/// transaction fails. Per-user failures are reported in the outcome.
pub fn bulk_assignments(
    console: &mut Console,
    action: BulkAction,
    source: &SourceOptions,
) -> Result<Outcome, CommandError> {
    let (csv, options): (CsvSource, IngestOptions) = source.open(BULK_COLUMNS, console.dry_run)?;
    let report: BulkCommandReport =
        run_bulk_assignments(&mut console.persistence, csv, action, options)?;

    Ok(Outcome {
        message: report.summary(action),
        failed: report.has_failures(),
    })
}

/// Completes assignments stuck in `started`.
///
/// # Errors
///
/// Returns an error if the batch size is invalid or the database fails.
pub fn garbage_collect(
    console: &mut Console,
    batch: i64,
    now: OffsetDateTime,
) -> Result<Outcome, CommandError> {
    let batch: BatchSize = BatchSize::new(batch)?;
    let collected: usize = garbage_collect_assignments(
        &mut console.persistence,
        console.config.assignment_stuck_threshold_secs,
        batch,
        console.dry_run,
        now,
    )?;

    let message: String = if collected == 0 {
        String::from("Nothing to collect, no stuck assignments found")
    } else if console.dry_run {
        format!("[DRY RUN] {collected} stuck assignment(s) would be completed")
    } else {
        format!("[OK] {collected} stuck assignment(s) have been completed")
    };
    Ok(Outcome::ok(message))
}

/// Filters of the user cache warm-up, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserWarmupFilters {
    /// Only these usernames.
    pub usernames: Vec<String>,
    /// Only users assigned to these line items.
    pub line_item_slugs: Vec<String>,
    /// Shard count.
    pub modulo: Option<i64>,
    /// Shard handled by this run.
    pub remainder: Option<i64>,
    /// Users per page.
    pub batch: i64,
}

/// Refreshes the cached assignments of users.
///
/// # Errors
///
/// Returns an error if the batch size or the sharding options are invalid,
/// a slug is unknown, or the database fails.
pub fn cache_warmup_users(
    console: &mut Console,
    filters: UserWarmupFilters,
) -> Result<Outcome, CommandError> {
    let batch: BatchSize = BatchSize::new(filters.batch)?;
    parse_shard(filters.modulo, filters.remainder)?;

    let options: UserWarmupOptions = UserWarmupOptions {
        usernames: filters.usernames,
        line_item_slugs: filters.line_item_slugs,
        shard: filters.modulo.zip(filters.remainder),
        batch,
    };
    let report: WarmupReport =
        warm_up_users(&mut console.persistence, console.cache.as_ref(), &options)?;
    Ok(Outcome::ok(report.summary("user")))
}

/// Refreshes the cached line items, all of them without a selector.
///
/// # Errors
///
/// Returns an error if a slug is unknown or the database fails.
pub fn cache_warmup_line_items(
    console: &mut Console,
    ids: Vec<i64>,
    slugs: &[String],
) -> Result<Outcome, CommandError> {
    let ids: Vec<i64> = if slugs.is_empty() {
        ids
    } else {
        resolve_line_item_slugs(&mut console.persistence, slugs)?
    };
    let report: WarmupReport =
        warm_up_line_items(&mut console.persistence, console.cache.as_ref(), &ids)?;
    Ok(Outcome::ok(report.summary("line item")))
}

/// Refreshes the cached LTI instance list.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn cache_warmup_lti_instances(console: &mut Console) -> Result<Outcome, CommandError> {
    let report: WarmupReport =
        warm_up_lti_instances(&mut console.persistence, console.cache.as_ref())?;
    Ok(Outcome::ok(report.summary("LTI instance")))
}

/// Builds a selector, ids taking precedence over slugs.
#[must_use]
pub fn line_item_selector(ids: Vec<i64>, slugs: Vec<String>) -> LineItemSelector {
    if ids.is_empty() {
        LineItemSelector::Slugs(slugs)
    } else {
        LineItemSelector::Ids(ids)
    }
}

/// Parses `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
///
/// # Errors
///
/// Returns an error naming `option` if neither format matches.
pub fn parse_date(option: &'static str, value: &str) -> Result<OffsetDateTime, CommandError> {
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(parsed);
    }
    Date::parse(value, DATE_FORMAT)
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| CommandError::InvalidDate {
            option,
            value: value.to_string(),
        })
}

/// Sets or clears the availability window of line items.
///
/// # Errors
///
/// Returns an error if a date is invalid, the window is inverted, a line
/// item is unknown or the database fails.
pub fn change_dates(
    console: &mut Console,
    selector: &LineItemSelector,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Outcome, CommandError> {
    let starts_at: Option<OffsetDateTime> = start_date
        .map(|value| parse_date("start-date", value))
        .transpose()?;
    let ends_at: Option<OffsetDateTime> = end_date
        .map(|value| parse_date("end-date", value))
        .transpose()?;

    let changed: usize = change_line_item_dates(
        &mut console.persistence,
        selector,
        starts_at,
        ends_at,
        console.dry_run,
    )?;

    let message: String = if console.dry_run {
        format!("[DRY RUN] {changed} line item(s) would be updated")
    } else {
        format!("[OK] {changed} line item(s) have been updated")
    };
    Ok(Outcome::ok(message))
}

/// Activates or deactivates line items.
///
/// # Errors
///
/// Returns an error if the toggle is unknown, a line item is unknown or the
/// database fails.
pub fn change_state(
    console: &mut Console,
    toggle: &str,
    selector: &LineItemSelector,
) -> Result<Outcome, CommandError> {
    let change: LineItemStateChange = LineItemStateChange::parse(toggle)?;
    let changed: usize =
        change_line_item_state(&mut console.persistence, selector, change, console.dry_run)?;

    let verb: &str = match change {
        LineItemStateChange::Activate => "activated",
        LineItemStateChange::Deactivate => "deactivated",
    };
    let message: String = if console.dry_run {
        format!("[DRY RUN] {changed} line item(s) would be {verb}")
    } else {
        format!("[OK] {changed} line item(s) have been {verb}")
    };
    Ok(Outcome::ok(message))
}
