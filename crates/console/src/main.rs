// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! # simple-roster-console
//!
//! Operator commands: CSV ingestion, bulk assignment changes, cache
//! warm-up, line item maintenance and garbage collection.
//!
//! Every mutating command is a dry run unless `--force` is given. A command
//! exits with 1 when it fails or when part of a bulk run failed.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use simple_roster_api::{BulkAction, DatabaseArgs, RosterArgs, RosterConfig};
use simple_roster_persistence::Persistence;
use time::OffsetDateTime;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_log::AsTrace;

use crate::commands::{
    Console, IngestKind, Outcome, SourceOptions, UserWarmupFilters, bulk_assignments,
    cache_warmup_line_items, cache_warmup_lti_instances, cache_warmup_users, change_dates,
    change_state, garbage_collect, ingest, line_item_selector,
};
use crate::error::CommandError;

fn main() {
    let args: Args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .without_time()
        .init();

    match args.run() {
        Ok(outcome) if outcome.failed => {
            warn!("{}", outcome.message);
            std::process::exit(1);
        }
        Ok(outcome) => info!("{}", outcome.message),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}

/// Simple Roster Console - operator commands
#[derive(Debug, Parser)]
#[command(name = "simple-roster-console", author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Apply changes; without it mutating commands only report
    #[arg(short, long, global = true)]
    force: bool,

    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    roster: RosterArgs,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

impl Args {
    fn run(self) -> Result<Outcome, CommandError> {
        let config: RosterConfig = self.roster.into_config()?;
        let persistence: Persistence = self.database.open()?;
        let dry_run: bool = !self.force;
        if dry_run {
            info!("Dry run, use --force to apply changes");
        }

        let mut console: Console = Console::new(persistence, config, dry_run)?;
        self.command.run(&mut console)
    }

    fn log_level(&self) -> LevelFilter {
        self.verbosity.log_level_filter().as_trace()
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import users, line items, LTI instances or assignments from CSV
    #[command(subcommand)]
    Ingest(IngestCommand),

    /// Bulk changes and garbage collection of assignments
    #[command(subcommand)]
    Assignments(AssignmentsCommand),

    /// Refresh result cache entries
    #[command(subcommand)]
    CacheWarmup(CacheWarmupCommand),

    /// Line item maintenance
    #[command(subcommand)]
    LineItems(LineItemsCommand),
}

impl Command {
    fn run(self, console: &mut Console) -> Result<Outcome, CommandError> {
        match self {
            Self::Ingest(command) => command.run(console),
            Self::Assignments(command) => command.run(console),
            Self::CacheWarmup(command) => command.run(console),
            Self::LineItems(command) => command.run(console),
        }
    }
}

/// CSV source options.
#[derive(Debug, Clone, ClapArgs)]
struct SourceArgs {
    /// Path of the CSV file
    path: PathBuf,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Storage the file is read from
    #[arg(long, default_value = "local")]
    storage: String,
}

impl SourceArgs {
    fn with_batch(self, batch: i64) -> SourceOptions {
        SourceOptions {
            path: self.path,
            delimiter: self.delimiter,
            storage: self.storage,
            batch,
        }
    }
}

#[derive(Debug, Clone, ClapArgs)]
struct IngestArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Rows per transaction
    #[arg(short, long, default_value_t = 1000)]
    batch: i64,
}

#[derive(Debug, Subcommand)]
enum IngestCommand {
    /// Columns: username, password, optional groupId
    Users(IngestArgs),
    /// Columns: uri, label, slug, startTimestamp, endTimestamp, maxAttempts
    LineItems(IngestArgs),
    /// Columns: label, ltiLink, ltiKey, ltiSecret
    LtiInstances(IngestArgs),
    /// Columns: username, lineItemSlug
    Assignments(IngestArgs),
}

impl IngestCommand {
    fn run(self, console: &mut Console) -> Result<Outcome, CommandError> {
        let (kind, args): (IngestKind, IngestArgs) = match self {
            Self::Users(args) => (IngestKind::Users, args),
            Self::LineItems(args) => (IngestKind::LineItems, args),
            Self::LtiInstances(args) => (IngestKind::LtiInstances, args),
            Self::Assignments(args) => (IngestKind::Assignments, args),
        };
        ingest(console, kind, &args.source.with_batch(args.batch))
    }
}

#[derive(Debug, Clone, ClapArgs)]
struct BulkArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Usernames per transaction
    #[arg(short, long, default_value_t = 100)]
    batch: i64,
}

#[derive(Debug, Subcommand)]
enum AssignmentsCommand {
    /// Cancel the available assignments of every listed user
    BulkCancel(BulkArgs),
    /// Give every listed user a new assignment on their last line item
    BulkCreate(BulkArgs),
    /// Complete assignments stuck in the started state
    GarbageCollect {
        /// Assignments per transaction
        #[arg(short, long, default_value_t = 100)]
        batch: i64,
    },
}

impl AssignmentsCommand {
    fn run(self, console: &mut Console) -> Result<Outcome, CommandError> {
        match self {
            Self::BulkCancel(args) => bulk_assignments(
                console,
                BulkAction::Cancel,
                &args.source.with_batch(args.batch),
            ),
            Self::BulkCreate(args) => bulk_assignments(
                console,
                BulkAction::Create,
                &args.source.with_batch(args.batch),
            ),
            Self::GarbageCollect { batch } => {
                garbage_collect(console, batch, OffsetDateTime::now_utc())
            }
        }
    }
}

/// Line item selection by id or slug.
#[derive(Debug, Clone, ClapArgs)]
struct LineItemArgs {
    /// Comma separated line item ids
    #[arg(long, value_delimiter = ',', conflicts_with = "line_item_slugs")]
    line_item_ids: Vec<i64>,

    /// Comma separated line item slugs
    #[arg(long, value_delimiter = ',')]
    line_item_slugs: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum CacheWarmupCommand {
    /// Warm the assignment entries of users
    Users {
        /// Comma separated usernames
        #[arg(long, value_delimiter = ',')]
        usernames: Vec<String>,

        /// Comma separated slugs; only users assigned to them are warmed
        #[arg(long, value_delimiter = ',')]
        line_item_slugs: Vec<String>,

        /// Number of shards the user table is split into
        #[arg(long)]
        modulo: Option<i64>,

        /// Shard handled by this run, `0 <= remainder < modulo`
        #[arg(long)]
        remainder: Option<i64>,

        /// Users loaded per page
        #[arg(short, long, default_value_t = 1000)]
        batch: i64,
    },
    /// Warm line item entries, all of them without a selector
    LineItems(LineItemArgs),
    /// Warm the LTI instance list
    LtiInstances,
}

impl CacheWarmupCommand {
    fn run(self, console: &mut Console) -> Result<Outcome, CommandError> {
        match self {
            Self::Users {
                usernames,
                line_item_slugs,
                modulo,
                remainder,
                batch,
            } => cache_warmup_users(
                console,
                UserWarmupFilters {
                    usernames,
                    line_item_slugs,
                    modulo,
                    remainder,
                    batch,
                },
            ),
            Self::LineItems(args) => {
                cache_warmup_line_items(console, args.line_item_ids, &args.line_item_slugs)
            }
            Self::LtiInstances => cache_warmup_lti_instances(console),
        }
    }
}

#[derive(Debug, Subcommand)]
enum LineItemsCommand {
    /// Set or clear the availability window; omitted dates are cleared
    ChangeDates {
        #[command(flatten)]
        line_items: LineItemArgs,

        /// Window start, YYYY-MM-DD or RFC 3339
        #[arg(long)]
        start_date: Option<String>,

        /// Window end, YYYY-MM-DD or RFC 3339
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Activate or deactivate line items
    ChangeState {
        /// `activate` or `deactivate`
        toggle: String,

        #[command(flatten)]
        line_items: LineItemArgs,
    },
}

impl LineItemsCommand {
    fn run(self, console: &mut Console) -> Result<Outcome, CommandError> {
        match self {
            Self::ChangeDates {
                line_items,
                start_date,
                end_date,
            } => change_dates(
                console,
                &line_item_selector(line_items.line_item_ids, line_items.line_item_slugs),
                start_date.as_deref(),
                end_date.as_deref(),
            ),
            Self::ChangeState { toggle, line_items } => change_state(
                console,
                &toggle,
                &line_item_selector(line_items.line_item_ids, line_items.line_item_slugs),
            ),
        }
    }
}

#[cfg(test)]
mod tests;
