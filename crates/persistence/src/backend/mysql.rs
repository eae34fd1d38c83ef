// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! MySQL/MariaDB-specific persistence utilities.
//!
//! Compiled only with the `mysql` feature, which needs the `MySQL` client
//! development libraries. Validation runs through `cargo xtask test-mariadb`,
//! which starts a `MariaDB` container, exports `DATABASE_URL` and runs the
//! ignored backend tests.
//!
//! ## Schema Parity
//!
//! `migrations/` (`SQLite`) and `migrations_mysql/` (`MySQL`) must describe the
//! same tables, columns, nullability, unique constraints, foreign keys and
//! indexes. `cargo xtask verify-migrations` checks this.

use diesel::dsl::sql;
use diesel::sql_types::{BigInt, Integer};
use diesel::{Connection, MysqlConnection, QueryableByName, RunQueryDsl};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

use crate::error::PersistenceError;

/// Result type for foreign key check query.
#[derive(QueryableByName)]
struct ForeignKeyCheck {
    #[diesel(sql_type = Integer)]
    fk_checks: i32,
}

/// Helper row struct for the liveness probe.
#[derive(QueryableByName)]
struct PingRow {
    #[diesel(sql_type = BigInt)]
    alive: i64,
}

/// `MySQL`-specific migrations.
pub const MYSQL_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations_mysql");

/// Returns the auto-increment id of the last insert on this connection.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_last_insert_rowid(conn: &mut MysqlConnection) -> Result<i64, PersistenceError> {
    Ok(diesel::select(sql::<BigInt>("LAST_INSERT_ID()")).get_result(conn)?)
}

/// Connects to MySQL/MariaDB and runs migrations.
///
/// # Errors
///
/// Returns an error if connection or migration fails.
pub fn initialize_database(database_url: &str) -> Result<MysqlConnection, PersistenceError> {
    info!("Initializing MySQL database");

    let mut conn: MysqlConnection = MysqlConnection::establish(database_url)
        .map_err(|e| PersistenceError::DatabaseConnectionFailed(e.to_string()))?;

    run_migrations(&mut conn).map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;

    Ok(conn)
}

/// Run pending migrations on the provided `MySQL` connection.
///
/// # Errors
///
/// Returns an error if migration execution fails.
pub fn run_migrations(
    conn: &mut MysqlConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Running MySQL database migrations");
    conn.run_pending_migrations(MYSQL_MIGRATIONS)?;
    Ok(())
}

/// Verify that `foreign_key_checks` is on.
///
/// # Errors
///
/// Returns an error if verification fails.
pub fn verify_foreign_key_enforcement(conn: &mut MysqlConnection) -> Result<(), PersistenceError> {
    // NOTE: This is raw SQL (justified - Diesel has no system variable query DSL)
    let check: ForeignKeyCheck = diesel::sql_query("SELECT @@foreign_key_checks AS fk_checks")
        .get_result(conn)
        .map_err(|e| {
            PersistenceError::QueryFailed(format!("Failed to verify foreign key enforcement: {e}"))
        })?;

    if check.fk_checks != 1 {
        return Err(PersistenceError::ForeignKeyEnforcementNotEnabled);
    }

    debug!("MySQL foreign key enforcement is enabled");
    Ok(())
}

/// Checks the connection answers a trivial query.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn ping(conn: &mut MysqlConnection) -> Result<(), PersistenceError> {
    let row: PingRow = diesel::sql_query("SELECT 1 AS alive").get_result(conn)?;
    if row.alive == 1 {
        Ok(())
    } else {
        Err(PersistenceError::QueryFailed(String::from(
            "Unexpected liveness probe result",
        )))
    }
}
