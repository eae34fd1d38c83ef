// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! # xtask - Simple Roster project automation
//!
//! - `cargo xtask ci` runs lint, build and the default test suite.
//! - `cargo xtask test-mariadb` runs the ignored backend validation tests of
//!   `simple-roster-persistence` against a disposable `MariaDB` container.
//! - `cargo xtask verify-migrations` applies both migration sets and fails
//!   if the resulting schemas differ.
//!
//! Plain `cargo test` never needs a database server; everything that does
//! is opt-in and orchestrated here.

#![deny(
    clippy::pedantic,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::process::Output;
use std::thread::sleep;
use std::time::Duration;

use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use color_eyre::{eyre::eyre, eyre::Context, Result};
use diesel::sql_types::{Integer, Text};
use diesel::{Connection, MysqlConnection, QueryableByName, RunQueryDsl, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use duct::cmd;
use tracing::level_filters::LevelFilter;
use tracing_log::AsTrace;

const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("../crates/persistence/migrations");
const MYSQL_MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../crates/persistence/migrations_mysql");

const PERSISTENCE_PACKAGE: &str = "simple-roster-persistence";

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .without_time()
        .init();

    if let Err(err) = args.run() {
        tracing::error!("{err:?}");
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(bin_name = "cargo xtask", styles = clap_cargo::style::CLAP_STYLING)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

impl Args {
    fn run(self) -> Result<()> {
        self.command.run()
    }

    fn log_level(&self) -> LevelFilter {
        self.verbosity.log_level_filter().as_trace()
    }
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Run CI checks (lint, build, test)
    CI,

    /// Build every target, with and without the `mysql` feature
    #[command(visible_alias = "b")]
    Build,

    /// Lint clippy, docs and formatting
    #[command(visible_alias = "l")]
    Lint,

    /// Fix formatting issues in the project
    #[command(visible_alias = "fmt")]
    FixFormatting,

    /// Run the default test suite
    #[command(visible_alias = "t")]
    Test,

    /// Run `MariaDB` backend validation tests
    #[command(visible_alias = "tm")]
    TestMariadb,

    /// Verify schema parity between `SQLite` and `MySQL` migrations
    #[command(visible_alias = "vm")]
    VerifyMigrations,
}

impl Command {
    fn run(self) -> Result<()> {
        match self {
            Self::CI => ci(),
            Self::Build => build(),
            Self::Lint => lint(),
            Self::FixFormatting => run_cargo_nightly(&["fmt", "--all"]),
            Self::Test => test(),
            Self::TestMariadb => test_mariadb(),
            Self::VerifyMigrations => verify_migrations(),
        }
    }
}

fn ci() -> Result<()> {
    lint()?;
    build()?;
    test()
}

fn build() -> Result<()> {
    run_cargo(&["build", "--all-targets"])?;
    run_cargo(&["build", "--all-targets", "--all-features"])
}

fn lint() -> Result<()> {
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ])?;
    lint_docs()?;
    run_cargo_nightly(&["fmt", "--all", "--check"])
}

/// Builds the docs of every default package with docs.rs flags.
fn lint_docs() -> Result<()> {
    let meta = MetadataCommand::new()
        .exec()
        .wrap_err("failed to get cargo metadata")?;

    for package in meta.workspace_default_packages() {
        cmd(
            "cargo",
            ["doc", "--no-deps", "--package", package.name.as_str()],
        )
        .env_remove("CARGO")
        .env("RUSTUP_TOOLCHAIN", "nightly")
        .env("RUSTDOCFLAGS", "--cfg docsrs -D warnings")
        .run_with_trace()?;
    }
    Ok(())
}

fn test() -> Result<()> {
    run_cargo(&["test", "--all-targets"])?;
    run_cargo(&["test", "--doc"])
}

fn run_cargo(args: &[&str]) -> Result<()> {
    cmd("cargo", args).run_with_trace()?;
    Ok(())
}

fn run_cargo_nightly(args: &[&str]) -> Result<()> {
    cmd("cargo", args)
        // set by cargo when running a subcommand
        .env_remove("CARGO")
        .env("RUSTUP_TOOLCHAIN", "nightly")
        .run_with_trace()?;
    Ok(())
}

/// A disposable `MariaDB` 11 container, removed on drop.
struct MariadbContainer {
    name: &'static str,
    database: &'static str,
    user: &'static str,
    password: &'static str,
    port: u16,
}

impl MariadbContainer {
    /// Starts the container and waits up to 30 seconds for it to accept
    /// queries.
    fn start(
        name: &'static str,
        database: &'static str,
        password: &'static str,
        port: u16,
    ) -> Result<Self> {
        cmd!("docker", "--version")
            .run_with_trace()
            .wrap_err("Docker is not available. Please install Docker.")?;

        let container = Self {
            name,
            database,
            user: "roster",
            password,
            port,
        };
        container.remove();

        tracing::info!(container = name, port, "Starting MariaDB container");
        cmd!(
            "docker",
            "run",
            "--name",
            name,
            "-e",
            format!("MARIADB_DATABASE={database}"),
            "-e",
            format!("MARIADB_USER={}", container.user),
            "-e",
            format!("MARIADB_PASSWORD={password}"),
            "-e",
            "MARIADB_ROOT_PASSWORD=root_password",
            "-p",
            format!("{port}:3306"),
            "-d",
            "mariadb:11"
        )
        .run_with_trace()
        .wrap_err("Failed to start MariaDB container")?;

        for attempt in 1..=30 {
            sleep(Duration::from_secs(1));
            tracing::debug!(attempt, "Waiting for MariaDB");
            let probe = cmd!(
                "docker",
                "exec",
                name,
                "mariadb",
                "-u",
                container.user,
                format!("-p{password}"),
                "-e",
                "SELECT 1"
            )
            .stdout_null()
            .stderr_null()
            .run();
            if probe.is_ok() {
                tracing::info!("MariaDB is ready");
                return Ok(container);
            }
        }

        Err(eyre!("MariaDB did not become ready within timeout"))
    }

    fn url(&self) -> String {
        format!(
            "mysql://{}:{}@127.0.0.1:{}/{}",
            self.user, self.password, self.port, self.database
        )
    }

    fn remove(&self) {
        let _ = cmd!("docker", "stop", self.name)
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run();
        let _ = cmd!("docker", "rm", self.name)
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run();
    }
}

impl Drop for MariadbContainer {
    fn drop(&mut self) {
        tracing::info!(container = self.name, "Removing MariaDB container");
        self.remove();
    }
}

/// Runs the `#[ignore]`d backend validation tests against `MariaDB`.
///
/// The tests read `DATABASE_URL` and refuse to run unless
/// `SIMPLE_ROSTER_TEST_BACKEND=mariadb`, so they cannot be picked up by a
/// plain `cargo test --ignored` by accident. Port 3307 must be free.
fn test_mariadb() -> Result<()> {
    let container = MariadbContainer::start(
        "simple-roster-test-mariadb",
        "simple_roster_test",
        "test_password",
        3307,
    )?;

    tracing::info!("Running MariaDB backend validation tests");
    cmd!(
        "cargo",
        "test",
        "--package",
        PERSISTENCE_PACKAGE,
        "--features",
        "mysql",
        "backend_validation_tests",
        "--",
        "--ignored",
        "--test-threads=1"
    )
    .env("DATABASE_URL", container.url())
    .env("SIMPLE_ROSTER_TEST_BACKEND", "mariadb")
    .run_with_trace()
    .wrap_err("MariaDB backend validation tests failed")?;

    tracing::info!("MariaDB backend validation completed successfully");
    Ok(())
}

/// Applies `migrations/` to an in-memory `SQLite` database and
/// `migrations_mysql/` to a `MariaDB` container, then compares tables,
/// columns, keys and indexes. Port 3308 must be free.
fn verify_migrations() -> Result<()> {
    let container = MariadbContainer::start(
        "simple-roster-verify-migrations",
        "simple_roster_verify",
        "verify_password",
        3308,
    )?;

    let mut sqlite_conn = SqliteConnection::establish(":memory:")
        .wrap_err("Failed to create SQLite in-memory database")?;
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut sqlite_conn)
        .wrap_err("Failed to enable foreign keys on SQLite")?;
    sqlite_conn
        .run_pending_migrations(SQLITE_MIGRATIONS)
        .map_err(|e| eyre!("Failed to apply SQLite migrations: {e}"))?;
    tracing::info!("SQLite migrations applied");

    let mut mysql_conn =
        MysqlConnection::establish(&container.url()).wrap_err("Failed to connect to MariaDB")?;
    mysql_conn
        .run_pending_migrations(MYSQL_MIGRATIONS)
        .map_err(|e| eyre!("Failed to apply MySQL migrations: {e}"))?;
    tracing::info!("MySQL migrations applied");

    let sqlite_schema: Schema = introspect_sqlite_schema(&mut sqlite_conn)?;
    let mysql_schema: Schema = introspect_mysql_schema(&mut mysql_conn, container.database)?;

    let mismatches: Vec<String> = compare_schemas(&sqlite_schema, &mysql_schema);
    if mismatches.is_empty() {
        tracing::info!(
            tables = sqlite_schema.tables.len(),
            "Schema parity verification passed"
        );
        return Ok(());
    }
    Err(eyre!(
        "Schema parity check failed:\n{}",
        mismatches
            .iter()
            .map(|m| format!("  - {m}"))
            .collect::<Vec<String>>()
            .join("\n")
    ))
}

/// Backend-neutral view of a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Schema {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Table {
    /// Column name to `(normalized type, nullable)`.
    columns: BTreeMap<String, (&'static str, bool)>,
    primary_keys: BTreeSet<String>,
    /// `(column, referenced table, referenced column)`
    foreign_keys: BTreeSet<(String, String, String)>,
    unique_constraints: BTreeSet<Vec<String>>,
    /// Column lists of non-unique indexes.
    indexes: BTreeSet<Vec<String>>,
}

fn introspect_sqlite_schema(conn: &mut SqliteConnection) -> Result<Schema> {
    #[derive(QueryableByName)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    #[derive(QueryableByName)]
    struct ColumnInfo {
        #[diesel(sql_type = Text)]
        name: String,
        #[diesel(sql_type = Text)]
        r#type: String,
        #[diesel(sql_type = Integer)]
        notnull: i32,
        #[diesel(sql_type = Integer)]
        pk: i32,
    }

    #[derive(QueryableByName)]
    struct ForeignKeyInfo {
        #[diesel(sql_type = Text)]
        table: String,
        #[diesel(sql_type = Text)]
        from: String,
        #[diesel(sql_type = Text)]
        to: String,
    }

    #[derive(QueryableByName)]
    struct IndexInfo {
        #[diesel(sql_type = Text)]
        name: String,
        #[diesel(sql_type = Text)]
        origin: String,
    }

    #[derive(QueryableByName)]
    struct IndexColumnInfo {
        #[diesel(sql_type = Text)]
        name: String,
    }

    let tables: Vec<TableName> = diesel::sql_query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' \
         AND name != '__diesel_schema_migrations' ORDER BY name",
    )
    .load(conn)
    .wrap_err("Failed to query SQLite tables")?;

    let mut schema = Schema::default();
    for table in tables {
        let mut info = Table::default();

        let columns: Vec<ColumnInfo> =
            diesel::sql_query(format!("PRAGMA table_info({})", table.name))
                .load(conn)
                .wrap_err_with(|| format!("Failed to get columns of {}", table.name))?;
        for column in columns {
            info.columns.insert(
                column.name.clone(),
                (normalize_sqlite_type(&column.r#type), column.notnull == 0),
            );
            if column.pk > 0 {
                info.primary_keys.insert(column.name);
            }
        }

        let foreign_keys: Vec<ForeignKeyInfo> =
            diesel::sql_query(format!("PRAGMA foreign_key_list({})", table.name))
                .load(conn)
                .wrap_err_with(|| format!("Failed to get foreign keys of {}", table.name))?;
        info.foreign_keys.extend(
            foreign_keys
                .into_iter()
                .map(|fk| (fk.from, fk.table, fk.to)),
        );

        let indexes: Vec<IndexInfo> =
            diesel::sql_query(format!("PRAGMA index_list({})", table.name))
                .load(conn)
                .wrap_err_with(|| format!("Failed to get indexes of {}", table.name))?;
        for index in indexes {
            let columns: Vec<String> =
                diesel::sql_query(format!("PRAGMA index_info({})", index.name))
                    .load::<IndexColumnInfo>(conn)
                    .wrap_err_with(|| format!("Failed to get columns of index {}", index.name))?
                    .into_iter()
                    .map(|c| c.name)
                    .collect();

            // origin 'u' covers UNIQUE constraints, including sqlite_autoindex_*
            if index.origin == "u" {
                info.unique_constraints.insert(columns);
            } else if !index.name.starts_with("sqlite_autoindex_") {
                info.indexes.insert(columns);
            }
        }

        schema.tables.insert(table.name, info);
    }

    Ok(schema)
}

fn introspect_mysql_schema(conn: &mut MysqlConnection, database: &str) -> Result<Schema> {
    #[derive(QueryableByName)]
    struct TableName {
        #[diesel(sql_type = Text)]
        table_name: String,
    }

    #[derive(QueryableByName)]
    struct ColumnInfo {
        #[diesel(sql_type = Text)]
        column_name: String,
        #[diesel(sql_type = Text)]
        data_type: String,
        #[diesel(sql_type = Text)]
        is_nullable: String,
        #[diesel(sql_type = Text)]
        column_key: String,
    }

    #[derive(QueryableByName)]
    #[allow(clippy::struct_field_names)]
    struct ForeignKeyInfo {
        #[diesel(sql_type = Text)]
        column_name: String,
        #[diesel(sql_type = Text)]
        referenced_table_name: String,
        #[diesel(sql_type = Text)]
        referenced_column_name: String,
    }

    #[derive(QueryableByName)]
    struct IndexColumn {
        #[diesel(sql_type = Text)]
        index_name: String,
        #[diesel(sql_type = Text)]
        column_name: String,
        #[diesel(sql_type = Integer)]
        non_unique: i32,
    }

    let tables: Vec<TableName> = diesel::sql_query(
        "SELECT table_name FROM information_schema.tables WHERE table_schema = ? \
         AND table_name != '__diesel_schema_migrations' ORDER BY table_name",
    )
    .bind::<Text, _>(database)
    .load(conn)
    .wrap_err("Failed to query MySQL tables")?;

    let mut schema = Schema::default();
    for table in tables {
        let mut info = Table::default();

        let columns: Vec<ColumnInfo> = diesel::sql_query(
            "SELECT column_name, data_type, is_nullable, column_key \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )
        .bind::<Text, _>(database)
        .bind::<Text, _>(&table.table_name)
        .load(conn)
        .wrap_err_with(|| format!("Failed to get columns of {}", table.table_name))?;
        for column in columns {
            info.columns.insert(
                column.column_name.clone(),
                (
                    normalize_mysql_type(&column.data_type),
                    column.is_nullable == "YES",
                ),
            );
            if column.column_key == "PRI" {
                info.primary_keys.insert(column.column_name);
            }
        }

        let foreign_keys: Vec<ForeignKeyInfo> = diesel::sql_query(
            "SELECT column_name, referenced_table_name, referenced_column_name \
             FROM information_schema.key_column_usage \
             WHERE table_schema = ? AND table_name = ? AND referenced_table_name IS NOT NULL",
        )
        .bind::<Text, _>(database)
        .bind::<Text, _>(&table.table_name)
        .load(conn)
        .wrap_err_with(|| format!("Failed to get foreign keys of {}", table.table_name))?;
        info.foreign_keys.extend(foreign_keys.into_iter().map(|fk| {
            (
                fk.column_name,
                fk.referenced_table_name,
                fk.referenced_column_name,
            )
        }));

        let index_columns: Vec<IndexColumn> = diesel::sql_query(
            "SELECT index_name, column_name, non_unique FROM information_schema.statistics \
             WHERE table_schema = ? AND table_name = ? AND index_name != 'PRIMARY' \
             ORDER BY index_name, seq_in_index",
        )
        .bind::<Text, _>(database)
        .bind::<Text, _>(&table.table_name)
        .load(conn)
        .wrap_err_with(|| format!("Failed to get indexes of {}", table.table_name))?;

        let mut grouped: BTreeMap<(String, bool), Vec<String>> = BTreeMap::new();
        for column in index_columns {
            grouped
                .entry((column.index_name, column.non_unique == 0))
                .or_default()
                .push(column.column_name);
        }
        for ((_, unique), columns) in grouped {
            if unique {
                info.unique_constraints.insert(columns);
            } else {
                info.indexes.insert(columns);
            }
        }

        schema.tables.insert(table.table_name, info);
    }

    Ok(schema)
}

fn normalize_sqlite_type(sqlite_type: &str) -> &'static str {
    let upper = sqlite_type.to_uppercase();
    if upper.contains("INT") {
        "integer"
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        "real"
    } else if upper.contains("BLOB") {
        "blob"
    } else {
        "text"
    }
}

fn normalize_mysql_type(mysql_type: &str) -> &'static str {
    match mysql_type.to_uppercase().as_str() {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => "integer",
        "DECIMAL" | "NUMERIC" | "FLOAT" | "DOUBLE" | "REAL" => "real",
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => "blob",
        _ => "text",
    }
}

/// Lists every difference between the two schemas.
///
/// `InnoDB` creates an index for each foreign key column, so extra
/// single-column indexes on foreign keys are accepted on the `MySQL` side.
fn compare_schemas(sqlite: &Schema, mysql: &Schema) -> Vec<String> {
    let mut mismatches: Vec<String> = Vec::new();

    for name in sqlite.tables.keys() {
        if !mysql.tables.contains_key(name) {
            mismatches.push(format!("table '{name}' exists only in SQLite"));
        }
    }
    for name in mysql.tables.keys() {
        if !sqlite.tables.contains_key(name) {
            mismatches.push(format!("table '{name}' exists only in MySQL"));
        }
    }

    for (name, lite) in &sqlite.tables {
        let Some(my) = mysql.tables.get(name) else {
            continue;
        };

        if lite.columns != my.columns {
            mismatches.push(format!(
                "columns of '{name}' differ\n    SQLite: {:?}\n    MySQL:  {:?}",
                lite.columns, my.columns
            ));
        }
        if lite.primary_keys != my.primary_keys {
            mismatches.push(format!(
                "primary key of '{name}' differs: {:?} vs {:?}",
                lite.primary_keys, my.primary_keys
            ));
        }
        if lite.foreign_keys != my.foreign_keys {
            mismatches.push(format!(
                "foreign keys of '{name}' differ: {:?} vs {:?}",
                lite.foreign_keys, my.foreign_keys
            ));
        }
        if lite.unique_constraints != my.unique_constraints {
            mismatches.push(format!(
                "unique constraints of '{name}' differ: {:?} vs {:?}",
                lite.unique_constraints, my.unique_constraints
            ));
        }

        for missing in lite.indexes.difference(&my.indexes) {
            mismatches.push(format!("index {missing:?} on '{name}' is missing in MySQL"));
        }
        for extra in my.indexes.difference(&lite.indexes) {
            let is_foreign_key_index: bool = extra.len() == 1
                && my
                    .foreign_keys
                    .iter()
                    .any(|(column, _, _)| *column == extra[0]);
            if !is_foreign_key_index {
                mismatches.push(format!("index {extra:?} on '{name}' exists only in MySQL"));
            }
        }
    }

    mismatches
}

/// Logs a `duct::Expression` before running it.
trait ExpressionExt {
    fn run_with_trace(&self) -> io::Result<Output>;
}

impl ExpressionExt for duct::Expression {
    fn run_with_trace(&self) -> io::Result<Output> {
        tracing::info!("running command: {:?}", self);
        self.run().inspect_err(|_| {
            tracing::error!("failed to run command: {:?}", self);
        })
    }
}
