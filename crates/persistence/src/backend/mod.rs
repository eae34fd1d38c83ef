// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Database backend-specific code.
//!
//! This module isolates backend-specific initialization, migration,
//! and helper functions that cannot be expressed in backend-agnostic
//! Diesel DSL.
//!
//! ## Backend Support
//!
//! - `sqlite`: `SQLite` backend (default for development and testing)
//! - `mysql`: MySQL/MariaDB backend, compiled with the `mysql` feature
//!
//! All roster queries and mutations live in `queries/` and `mutations/`
//! and must work across all supported backends.

#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::{Connection, SqliteConnection};

#[cfg(feature = "mysql")]
use diesel::MysqlConnection;

use crate::error::PersistenceError;

/// Trait for backend-specific operations.
///
/// Query and mutation functions stay monomorphic per backend (see
/// `backend_fn!`), and reach backend-specific SQL only through this trait.
pub trait PersistenceBackend: Connection<TransactionManager = AnsiTransactionManager> {
    /// Retrieves the last inserted row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError>;

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError>;

    /// Runs a trivial statement to prove the connection is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database does not answer.
    fn ping(&mut self) -> Result<(), PersistenceError>;

    /// Opens a transaction (or a savepoint when one is already open).
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the statement.
    fn begin(&mut self) -> Result<(), PersistenceError> {
        AnsiTransactionManager::begin_transaction(self).map_err(Into::into)
    }

    /// Commits the innermost open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the commit.
    fn commit(&mut self) -> Result<(), PersistenceError> {
        AnsiTransactionManager::commit_transaction(self).map_err(Into::into)
    }

    /// Rolls back the innermost open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the rollback.
    fn rollback(&mut self) -> Result<(), PersistenceError> {
        AnsiTransactionManager::rollback_transaction(self).map_err(Into::into)
    }
}

impl PersistenceBackend for SqliteConnection {
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError> {
        sqlite::get_last_insert_rowid(self)
    }

    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        sqlite::verify_foreign_key_enforcement(self)
    }

    fn ping(&mut self) -> Result<(), PersistenceError> {
        sqlite::ping(self)
    }
}

#[cfg(feature = "mysql")]
impl PersistenceBackend for MysqlConnection {
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError> {
        mysql::get_last_insert_rowid(self)
    }

    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        mysql::verify_foreign_key_enforcement(self)
    }

    fn ping(&mut self) -> Result<(), PersistenceError> {
        mysql::ping(self)
    }
}
