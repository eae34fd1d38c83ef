// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::assignment::AssignmentState;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Username is empty or invalid.
    InvalidUsername(String),
    /// A required field is empty or malformed.
    InvalidField {
        /// The field name.
        field: String,
        /// Description of the problem.
        reason: String,
    },
    /// A timestamp could not be parsed.
    InvalidTimestamp {
        /// The raw value.
        value: String,
        /// The parser error.
        error: String,
    },
    /// The line item end date precedes its start date.
    InvalidDateWindow {
        /// The start of the window (RFC 3339).
        starts_at: String,
        /// The end of the window (RFC 3339).
        ends_at: String,
    },
    /// Max attempts is not a non-negative integer.
    InvalidMaxAttempts(String),
    /// An assignment state string is not recognised.
    InvalidAssignmentState(String),
    /// The line item is inactive or outside of its date window.
    LineItemUnavailable {
        /// The line item slug.
        slug: String,
    },
    /// The assignment cannot be launched in its current state.
    AssignmentUnavailable {
        /// The assignment id.
        assignment_id: i64,
        /// The current state.
        state: AssignmentState,
    },
    /// All allowed attempts have been consumed.
    MaxAttemptsReached {
        /// The assignment id.
        assignment_id: i64,
        /// The line item's attempt limit.
        max_attempts: u32,
    },
    /// A state transition is not permitted from the current state.
    InvalidStateTransition {
        /// The assignment id.
        assignment_id: i64,
        /// The current state.
        from: AssignmentState,
        /// The requested transition.
        action: &'static str,
    },
    /// The line item given does not belong to the assignment.
    LineItemMismatch {
        /// The assignment id.
        assignment_id: i64,
        /// The line item id that was supplied.
        line_item_id: i64,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername(msg) => write!(f, "Invalid username: {msg}"),
            Self::InvalidField { field, reason } => {
                write!(f, "Invalid value for '{field}': {reason}")
            }
            Self::InvalidTimestamp { value, error } => {
                write!(f, "Failed to parse timestamp '{value}': {error}")
            }
            Self::InvalidDateWindow { starts_at, ends_at } => {
                write!(
                    f,
                    "End date {ends_at} must not be earlier than start date {starts_at}"
                )
            }
            Self::InvalidMaxAttempts(value) => {
                write!(f, "Invalid max attempts '{value}': must be a non-negative integer")
            }
            Self::InvalidAssignmentState(value) => {
                write!(f, "Invalid assignment state: '{value}'")
            }
            Self::LineItemUnavailable { slug } => {
                write!(f, "Line item '{slug}' is not available")
            }
            Self::AssignmentUnavailable {
                assignment_id,
                state,
            } => {
                write!(
                    f,
                    "Assignment {assignment_id} is not available (state: {state})"
                )
            }
            Self::MaxAttemptsReached {
                assignment_id,
                max_attempts,
            } => {
                write!(
                    f,
                    "Assignment {assignment_id} has reached the maximum of {max_attempts} attempts"
                )
            }
            Self::InvalidStateTransition {
                assignment_id,
                from,
                action,
            } => {
                write!(
                    f,
                    "Cannot {action} assignment {assignment_id} in state '{from}'"
                )
            }
            Self::LineItemMismatch {
                assignment_id,
                line_item_id,
            } => {
                write!(
                    f,
                    "Line item {line_item_id} does not belong to assignment {assignment_id}"
                )
            }
        }
    }
}

impl std::error::Error for DomainError {}
