// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::DomainError;
use crate::types::{NewLineItem, NewLtiInstance};

/// Validates and normalizes a username.
///
/// Surrounding whitespace is removed. Usernames may not contain whitespace
/// or commas, since they travel through CSV files and comma-separated CLI
/// options.
///
/// # Errors
///
/// Returns an error if the username is empty or contains a forbidden character.
pub fn validate_username(username: &str) -> Result<String, DomainError> {
    let trimmed: &str = username.trim();

    if trimmed.is_empty() {
        return Err(DomainError::InvalidUsername(String::from(
            "Username cannot be empty",
        )));
    }

    if trimmed.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(DomainError::InvalidUsername(format!(
            "Username '{trimmed}' contains whitespace or a comma"
        )));
    }

    Ok(trimmed.to_string())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidField {
            field: field.to_string(),
            reason: String::from("cannot be empty"),
        });
    }
    Ok(())
}

/// Validates the required fields of a line item.
///
/// # Errors
///
/// Returns an error if the URI, label or slug is empty, or if the
/// availability window is inverted.
pub fn validate_line_item_fields(line_item: &NewLineItem) -> Result<(), DomainError> {
    require_non_empty("uri", &line_item.uri)?;
    require_non_empty("label", &line_item.label)?;
    require_non_empty("slug", &line_item.slug)?;
    validate_date_window(line_item.starts_at, line_item.ends_at)
}

/// Validates the required fields of an LTI instance.
///
/// # Errors
///
/// Returns an error if any field is empty or the link is not an HTTP(S) URL.
pub fn validate_lti_instance_fields(instance: &NewLtiInstance) -> Result<(), DomainError> {
    require_non_empty("label", &instance.label)?;
    require_non_empty("ltiLink", &instance.lti_link)?;
    require_non_empty("ltiKey", &instance.lti_key)?;
    require_non_empty("ltiSecret", &instance.lti_secret)?;

    if !(instance.lti_link.starts_with("http://") || instance.lti_link.starts_with("https://")) {
        return Err(DomainError::InvalidField {
            field: String::from("ltiLink"),
            reason: format!("'{}' is not an http(s) URL", instance.lti_link),
        });
    }

    Ok(())
}

/// Parses a max attempts column. An empty value means unlimited (`0`).
///
/// # Errors
///
/// Returns an error if the value is not a non-negative integer.
pub fn validate_max_attempts(value: &str) -> Result<u32, DomainError> {
    let trimmed: &str = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| DomainError::InvalidMaxAttempts(trimmed.to_string()))
}

/// Parses an optional timestamp.
///
/// Accepts either Unix seconds (the CSV format) or an RFC 3339 / ISO 8601
/// date-time (the CLI format). An empty value yields `None`.
///
/// # Errors
///
/// Returns an error if the value is neither format.
pub fn parse_optional_timestamp(value: &str) -> Result<Option<OffsetDateTime>, DomainError> {
    let trimmed: &str = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(seconds) = trimmed.parse::<i64>() {
        return OffsetDateTime::from_unix_timestamp(seconds)
            .map(Some)
            .map_err(|e| DomainError::InvalidTimestamp {
                value: trimmed.to_string(),
                error: e.to_string(),
            });
    }

    OffsetDateTime::parse(trimmed, &Rfc3339)
        .map(Some)
        .map_err(|e| DomainError::InvalidTimestamp {
            value: trimmed.to_string(),
            error: e.to_string(),
        })
}

/// Validates that an availability window is not inverted.
///
/// Open-ended windows (either bound missing) are always valid.
///
/// # Errors
///
/// Returns an error if `ends_at` is earlier than `starts_at`.
pub fn validate_date_window(
    starts_at: Option<OffsetDateTime>,
    ends_at: Option<OffsetDateTime>,
) -> Result<(), DomainError> {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if end < start => Err(DomainError::InvalidDateWindow {
            starts_at: start.format(&Rfc3339).unwrap_or_else(|_| start.to_string()),
            ends_at: end.format(&Rfc3339).unwrap_or_else(|_| end.to_string()),
        }),
        _ => Ok(()),
    }
}
