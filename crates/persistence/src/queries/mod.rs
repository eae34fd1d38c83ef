// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Query modules for persistence layer.
//!
//! This module contains all read-only queries for the persistence layer.
//!
//! ## Module Organization
//!
//! - `users`: User lookups, warm-up listing and counts
//! - `line_items`: Line item lookups by id and slug
//! - `lti_instances`: LTI instance listing and key lookups
//! - `assignments`: Assignment lookups and stuck-attempt listing
//! - `result_cache`: Shared cache entry reads
//!
//! ## Backend-Specific Functions
//!
//! All query functions are generated in backend-specific monomorphic versions:
//! - Functions suffixed with `_sqlite` for `SQLite`
//! - Functions suffixed with `_mysql` for `MySQL`/`MariaDB` (`mysql` feature)
//!
//! The `Persistence` adapter in `lib.rs` dispatches to the appropriate version
//! based on the active backend connection.

pub mod assignments;
pub mod line_items;
pub mod lti_instances;
pub mod result_cache;
pub mod users;
