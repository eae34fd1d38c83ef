// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::assignment::Assignment;

/// A test-taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Database identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Bcrypt hash of the user's password.
    pub password_hash: String,
    /// Optional group used for LTI load balancing.
    pub group_id: Option<String>,
}

/// Input for creating a user.
///
/// The password is kept in plain text until the persistence layer hashes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
    /// Optional group identifier.
    pub group_id: Option<String>,
}

/// A deliverable test definition (a delivery in the assessment platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Database identifier.
    pub id: i64,
    /// Delivery URI on the assessment platform.
    pub uri: String,
    /// Human readable label.
    pub label: String,
    /// Unique slug.
    pub slug: String,
    /// Start of the availability window.
    #[serde(with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    /// End of the availability window.
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    /// Attempt limit; `0` means unlimited.
    pub max_attempts: u32,
    /// Inactive line items cannot be launched.
    pub is_active: bool,
}

impl LineItem {
    /// Returns whether the line item limits attempts.
    #[must_use]
    pub const fn has_max_attempts(&self) -> bool {
        self.max_attempts > 0
    }

    /// Returns whether the line item can be launched at `now`.
    #[must_use]
    pub fn is_available_at(&self, now: OffsetDateTime) -> bool {
        if !self.is_active {
            return false;
        }
        let started = self.starts_at.is_none_or(|start| start <= now);
        let not_ended = self.ends_at.is_none_or(|end| now <= end);
        started && not_ended
    }
}

/// Input for creating a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    /// Delivery URI.
    pub uri: String,
    /// Human readable label.
    pub label: String,
    /// Unique slug.
    pub slug: String,
    /// Start of the availability window.
    pub starts_at: Option<OffsetDateTime>,
    /// End of the availability window.
    pub ends_at: Option<OffsetDateTime>,
    /// Attempt limit; `0` means unlimited.
    pub max_attempts: u32,
}

/// An LTI tool provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtiInstance {
    /// Database identifier.
    pub id: i64,
    /// Human readable label.
    pub label: String,
    /// Launch URL.
    pub lti_link: String,
    /// OAuth consumer key.
    pub lti_key: String,
    /// OAuth consumer secret.
    pub lti_secret: String,
}

/// Input for creating an LTI instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLtiInstance {
    /// Human readable label.
    pub label: String,
    /// Launch URL.
    pub lti_link: String,
    /// OAuth consumer key.
    pub lti_key: String,
    /// OAuth consumer secret.
    pub lti_secret: String,
}

/// A user together with all of their assignments, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignments {
    /// The user.
    pub user: User,
    /// The user's assignments ordered by id.
    pub assignments: Vec<Assignment>,
}

impl UserAssignments {
    /// Returns the most recently created assignment, if any.
    #[must_use]
    pub fn last_assignment(&self) -> Option<&Assignment> {
        self.assignments.iter().max_by_key(|a| a.id)
    }

    /// Returns the assignments that are not in a terminal state.
    pub fn available_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.state.is_available())
    }

    /// Looks up one of the user's assignments by id.
    #[must_use]
    pub fn assignment(&self, assignment_id: i64) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == assignment_id)
    }
}
