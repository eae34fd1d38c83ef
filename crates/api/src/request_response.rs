// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request and response data transfer objects.

use serde::{Deserialize, Serialize};
use simple_roster::BulkResult;
use simple_roster_domain::{Assignment, AssignmentState, LineItem};
use time::OffsetDateTime;

/// Body of `POST /api/v1/auth`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    /// The username.
    pub username: String,
    /// The plain-text password.
    pub password: String,
}

/// Response of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Access token for the user endpoints.
    pub access_token: String,
    /// Token exchangeable for new access tokens.
    pub refresh_token: String,
}

/// Body of `POST /api/v1/auth/token/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    /// The refresh token received at login.
    pub refresh_token: String,
}

/// Response of a token refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    /// The new access token.
    pub access_token: String,
}

/// Response of `GET /api/v1/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcheckResponse {
    /// Whether the database answered.
    pub is_database_available: bool,
    /// Whether the result cache answered.
    pub is_cache_available: bool,
}

/// Line item as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInfo {
    /// Line item id.
    pub id: i64,
    /// Delivery URI.
    pub uri: String,
    /// Label.
    pub label: String,
    /// Slug.
    pub slug: String,
    /// Start of the window.
    #[serde(with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    /// End of the window.
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    /// Attempt limit; `0` means unlimited.
    pub max_attempts: u32,
}

impl From<&LineItem> for LineItemInfo {
    fn from(line_item: &LineItem) -> Self {
        Self {
            id: line_item.id,
            uri: line_item.uri.clone(),
            label: line_item.label.clone(),
            slug: line_item.slug.clone(),
            starts_at: line_item.starts_at,
            ends_at: line_item.ends_at,
            max_attempts: line_item.max_attempts,
        }
    }
}

/// One assignment of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInfo {
    /// Assignment id.
    pub id: i64,
    /// Username of the owner.
    pub username: String,
    /// Current state.
    pub state: AssignmentState,
    /// Attempts started so far.
    pub attempts_count: u32,
    /// The assigned line item.
    pub line_item: LineItemInfo,
}

impl AssignmentInfo {
    /// Combines an assignment with its line item.
    #[must_use]
    pub fn new(username: &str, assignment: &Assignment, line_item: &LineItem) -> Self {
        Self {
            id: assignment.id,
            username: username.to_string(),
            state: assignment.state,
            attempts_count: assignment.attempts_count,
            line_item: LineItemInfo::from(line_item),
        }
    }
}

/// Response of `GET /api/v1/assignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListAssignmentsResponse {
    /// The user's available assignments.
    pub assignments: Vec<AssignmentInfo>,
}

/// Response of the bulk assignment endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAssignmentsResponse {
    /// Per-username outcomes and whether they were committed.
    pub data: BulkResult,
}

/// One event delivered to the update-line-items web hook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Sender assigned event id.
    pub event_id: String,
    /// The event name.
    pub event_name: String,
    /// When the event was triggered (unix seconds).
    pub triggered_timestamp: i64,
    /// Event specific payload.
    #[serde(default)]
    pub event_data: serde_json::Value,
}

/// Body of `POST /api/v1/web-hooks/update-line-items`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateLineItemsRequest {
    /// Instance that sent the events.
    #[serde(default)]
    pub source: Option<String>,
    /// The events.
    pub events: Vec<WebhookEvent>,
}

/// Outcome of one web hook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventStatus {
    /// The line item was updated.
    Accepted,
    /// The event was not applicable or superseded.
    Ignored,
    /// The event could not be applied.
    Error,
}

/// Per-event result of the web hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEventResult {
    /// The event id.
    pub event_id: String,
    /// What happened to the event.
    pub status: WebhookEventStatus,
}

/// Response of the update-line-items web hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateLineItemsResponse {
    /// One entry per received event, in request order.
    pub events: Vec<WebhookEventResult>,
}

/// An LTI 1.1 outcome request as received over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lti1p1OutcomeRequest {
    /// The raw query string carrying the OAuth parameters.
    pub query: String,
    /// The raw XML body.
    pub body: Vec<u8>,
}
