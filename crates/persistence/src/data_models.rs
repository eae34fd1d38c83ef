// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row types and their conversion into domain values.
//!
//! Timestamps are stored as UTC text with second precision
//! (`YYYY-MM-DDTHH:MM:SSZ`) so string comparison orders them correctly on
//! every backend.

use std::str::FromStr;

use diesel::prelude::*;
use num_traits::ToPrimitive;
use simple_roster_domain::{Assignment, AssignmentState, LineItem, LtiInstance, User};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::diesel_schema::{assignments, line_items, lti_instances, users};
use crate::error::PersistenceError;

/// Formats a timestamp for storage.
#[must_use]
pub fn to_db_timestamp(value: OffsetDateTime) -> String {
    let utc: OffsetDateTime = value.to_offset(UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
    ))
    .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns an error if the value is not RFC 3339.
pub fn from_db_timestamp(value: &str) -> Result<OffsetDateTime, PersistenceError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| PersistenceError::CorruptRow(format!("timestamp '{value}': {e}")))
}

fn from_optional_db_timestamp(
    value: Option<&str>,
) -> Result<Option<OffsetDateTime>, PersistenceError> {
    value.map(from_db_timestamp).transpose()
}

fn to_count(value: i32, column: &str) -> Result<u32, PersistenceError> {
    value
        .to_u32()
        .ok_or_else(|| PersistenceError::CorruptRow(format!("negative {column}: {value}")))
}

/// Converts a domain count to its column value, saturating at `i32::MAX`.
#[must_use]
pub fn to_db_count(value: u32) -> i32 {
    value.to_i32().unwrap_or(i32::MAX)
}

/// Diesel Queryable struct for user rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub group_id: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            group_id: row.group_id,
        }
    }
}

/// Diesel Queryable struct for line item rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = line_items)]
pub struct LineItemRow {
    pub id: i64,
    pub uri: String,
    pub label: String,
    pub slug: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub max_attempts: i32,
    pub is_active: i32,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = PersistenceError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            uri: row.uri,
            label: row.label,
            slug: row.slug,
            starts_at: from_optional_db_timestamp(row.starts_at.as_deref())?,
            ends_at: from_optional_db_timestamp(row.ends_at.as_deref())?,
            max_attempts: to_count(row.max_attempts, "max_attempts")?,
            is_active: row.is_active != 0,
        })
    }
}

/// Diesel Queryable struct for LTI instance rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = lti_instances)]
pub struct LtiInstanceRow {
    pub id: i64,
    pub label: String,
    pub lti_link: String,
    pub lti_key: String,
    pub lti_secret: String,
}

impl From<LtiInstanceRow> for LtiInstance {
    fn from(row: LtiInstanceRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            lti_link: row.lti_link,
            lti_key: row.lti_key,
            lti_secret: row.lti_secret,
        }
    }
}

/// Diesel Queryable struct for assignment rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = assignments)]
pub struct AssignmentRow {
    pub id: i64,
    pub user_id: i64,
    pub line_item_id: i64,
    pub state: String,
    pub attempts_count: i32,
    pub updated_at: String,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = PersistenceError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            line_item_id: row.line_item_id,
            state: AssignmentState::from_str(&row.state)
                .map_err(|e| PersistenceError::CorruptRow(e.to_string()))?,
            attempts_count: to_count(row.attempts_count, "attempts_count")?,
            updated_at: from_db_timestamp(&row.updated_at)?,
        })
    }
}

/// Filters applied when listing usernames for cache warm-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Only these usernames (empty means all).
    pub usernames: Vec<String>,
    /// Only users assigned to one of these line items (empty means all).
    pub line_item_ids: Vec<i64>,
    /// Only users whose `id % modulo == remainder`.
    pub shard: Option<UserShard>,
}

/// Euclidean sharding of users by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserShard {
    modulo: i64,
    remainder: i64,
}

impl UserShard {
    /// Creates a shard selector. Requires `modulo >= 1` and
    /// `0 <= remainder < modulo`.
    #[must_use]
    pub const fn new(modulo: i64, remainder: i64) -> Option<Self> {
        if modulo < 1 || remainder < 0 || remainder >= modulo {
            return None;
        }
        Some(Self { modulo, remainder })
    }

    /// Returns whether a user id belongs to this shard.
    #[must_use]
    pub const fn contains(&self, user_id: i64) -> bool {
        user_id.rem_euclid(self.modulo) == self.remainder
    }
}
