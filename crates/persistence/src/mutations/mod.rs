// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Backend-agnostic mutation modules.
//!
//! This module contains all state-changing operations for the persistence layer.
//! Most mutations use Diesel DSL and are backend-agnostic, with minimal use of
//! backend-specific helpers (e.g., `last_insert_rowid()` for `SQLite`).
//!
//! ## Module Organization
//!
//! - `users`: Batched user inserts (passwords hashed here)
//! - `line_items`: Line item inserts and URI/date/active updates
//! - `lti_instances`: Batched LTI instance inserts
//! - `assignments`: Assignment inserts, state updates and staged-change flushing
//! - `result_cache`: Shared cache entry writes
//!
//! ## Backend-Specific Code
//!
//! Backend-specific helpers (e.g., `get_last_insert_rowid()`) are imported from
//! the `backend` module. All other code uses Diesel DSL exclusively.

pub mod assignments;
pub mod line_items;
pub mod lti_instances;
pub mod result_cache;
pub mod users;
