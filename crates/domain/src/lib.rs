// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod assignment;
mod error;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use assignment::{Assignment, AssignmentState, NewAssignment};
pub use error::DomainError;
pub use types::{
    LineItem, LtiInstance, NewLineItem, NewLtiInstance, NewUser, User, UserAssignments,
};
pub use validation::{
    parse_optional_timestamp, validate_date_window, validate_line_item_fields,
    validate_lti_instance_fields, validate_max_attempts, validate_username,
};
