// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Assignment lifecycle.
//!
//! An assignment links one user to one line item. Its state moves along
//! `ready → started → (ready | completed)` through launches and outcomes,
//! and any non-terminal state may be cancelled.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::DomainError;
use crate::types::LineItem;

/// The lifecycle state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentState {
    /// Assigned and launchable.
    #[default]
    Ready,
    /// An attempt is in progress.
    Started,
    /// All attempts consumed. Terminal.
    Completed,
    /// Withdrawn by an operator. Terminal.
    Cancelled,
}

impl AssignmentState {
    /// Converts this state to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns whether the assignment still counts as available to its user.
    ///
    /// Available assignments are exactly the ones a bulk cancel may touch.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.is_terminal()
    }
}

impl FromStr for AssignmentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ready" => Ok(Self::Ready),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidAssignmentState(s.to_string())),
        }
    }
}

impl std::fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Database identifier.
    pub id: i64,
    /// The owning user.
    pub user_id: i64,
    /// The assigned line item.
    pub line_item_id: i64,
    /// Current lifecycle state.
    pub state: AssignmentState,
    /// Number of attempts started so far.
    pub attempts_count: u32,
    /// Last state change.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Assignment {
    fn ensure_line_item(&self, line_item: &LineItem) -> Result<(), DomainError> {
        if line_item.id != self.line_item_id {
            return Err(DomainError::LineItemMismatch {
                assignment_id: self.id,
                line_item_id: line_item.id,
            });
        }
        Ok(())
    }

    /// Starts (or resumes) an attempt for an LTI launch.
    ///
    /// A `ready` assignment moves to `started` and consumes one attempt.
    /// A `started` assignment is relaunched without consuming another one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the line item is not the assignment's or is not available at `now`
    /// - the assignment is in a terminal state
    /// - the line item's attempt limit has already been reached
    pub fn begin_attempt(
        &mut self,
        line_item: &LineItem,
        now: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_line_item(line_item)?;

        if !line_item.is_available_at(now) {
            return Err(DomainError::LineItemUnavailable {
                slug: line_item.slug.clone(),
            });
        }

        match self.state {
            AssignmentState::Started => Ok(()),
            AssignmentState::Ready => {
                if line_item.has_max_attempts() && self.attempts_count >= line_item.max_attempts {
                    return Err(DomainError::MaxAttemptsReached {
                        assignment_id: self.id,
                        max_attempts: line_item.max_attempts,
                    });
                }
                self.attempts_count += 1;
                self.state = AssignmentState::Started;
                self.updated_at = now;
                Ok(())
            }
            AssignmentState::Completed | AssignmentState::Cancelled => {
                Err(DomainError::AssignmentUnavailable {
                    assignment_id: self.id,
                    state: self.state,
                })
            }
        }
    }

    /// Finishes the running attempt after an outcome has been received.
    ///
    /// The assignment returns to `ready` while attempts remain, and becomes
    /// `completed` once the line item's limit is consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment is not `started` or the line item
    /// does not belong to it.
    pub fn complete(
        &mut self,
        line_item: &LineItem,
        now: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_line_item(line_item)?;

        if self.state != AssignmentState::Started {
            return Err(DomainError::InvalidStateTransition {
                assignment_id: self.id,
                from: self.state,
                action: "complete",
            });
        }

        self.state =
            if line_item.has_max_attempts() && self.attempts_count >= line_item.max_attempts {
                AssignmentState::Completed
            } else {
                AssignmentState::Ready
            };
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment is already terminal.
    pub fn cancel(&mut self, now: OffsetDateTime) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                assignment_id: self.id,
                from: self.state,
                action: "cancel",
            });
        }
        self.state = AssignmentState::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Force-completes an attempt that was started but never reported back.
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment is not `started`.
    pub fn expire(&mut self, now: OffsetDateTime) -> Result<(), DomainError> {
        if self.state != AssignmentState::Started {
            return Err(DomainError::InvalidStateTransition {
                assignment_id: self.id,
                from: self.state,
                action: "expire",
            });
        }
        self.state = AssignmentState::Completed;
        self.updated_at = now;
        Ok(())
    }
}

/// Input for creating an assignment. New assignments always start `ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    /// The owning user.
    pub user_id: i64,
    /// The assigned line item.
    pub line_item_id: i64,
}
