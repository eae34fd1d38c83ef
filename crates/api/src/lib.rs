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
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod bulk_commands;
mod cache_warmup;
mod config;
mod csv_source;
mod error;
mod handlers;
mod ingest;
mod maintenance;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedUser, AuthenticationService, SessionClaims, TokenKind, TokenPair};
pub use bulk_commands::{BULK_COLUMNS, BulkAction, BulkCommandReport, run_bulk_assignments};
pub use cache_warmup::{
    UserWarmupOptions, WarmupReport, parse_shard, resolve_line_item_slugs, warm_up_line_items,
    warm_up_lti_instances, warm_up_users,
};
pub use config::{
    CacheBackend, DatabaseArgs, JwtConfig, LtiConfig, RosterArgs, RosterConfig,
    WebhookCredentials,
};
pub use csv_source::{CsvRow, CsvSource, LOCAL_STORAGE, parse_delimiter};
pub use error::{
    ApiError, AuthError, IngestError, translate_core_error, translate_domain_error,
    translate_lti_error,
};
pub use handlers::{
    MAX_BULK_USERNAMES, REMOTE_DELIVERY_CREATED_EVENT, bulk_cancel_assignments,
    bulk_create_assignments, get_lti_link, healthcheck, list_assignments, login, logout,
    lti1p1_outcome, lti1p3_outcome, refresh_token, update_line_items,
};
pub use ingest::{
    ASSIGNMENT_COLUMNS, IngestOptions, LINE_ITEM_COLUMNS, LTI_INSTANCE_COLUMNS, USER_COLUMNS,
    ingest_assignments, ingest_line_items, ingest_lti_instances, ingest_users,
};
pub use maintenance::{
    LineItemSelector, LineItemStateChange, change_line_item_dates, change_line_item_state,
    garbage_collect_assignments, select_line_items,
};
pub use request_response::{
    AssignmentInfo, BulkAssignmentsResponse, HealthcheckResponse, LineItemInfo,
    ListAssignmentsResponse, LoginRequest, LoginResponse, Lti1p1OutcomeRequest,
    RefreshTokenRequest, RefreshTokenResponse, UpdateLineItemsRequest, UpdateLineItemsResponse,
    WebhookEvent, WebhookEventResult, WebhookEventStatus,
};
