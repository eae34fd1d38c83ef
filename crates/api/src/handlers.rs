// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transport independent request handlers.
//!
//! Every handler receives the persistence layer, the result cache and the
//! configuration explicitly. The current time is passed in so tests can pin
//! it.

use std::collections::{BTreeMap, HashSet};

use simple_roster::{
    BulkOperation, BulkOperationCollection, BulkOperationCollectionProcessor, BulkOperationType,
    BulkResult, CancelAssignmentsProcessor, CreateAssignmentsProcessor, ResultCache,
    STATE_ATTRIBUTE,
};
use simple_roster_domain::{Assignment, AssignmentState, LineItem, LtiInstance, UserAssignments};
use simple_roster_lti::{
    LaunchContext, LtiInstanceLoadBalancer, LtiLaunch, LtiVersion, OAUTH_CONSUMER_KEY,
    OAuthSigner, ReplaceResultRequest, build_lti1p1_launch, build_lti1p3_launch, find_parameter,
    parse_replace_result_request, query_parameters, replace_result_response,
    validate_outcome_token,
};
use simple_roster_persistence::{Persistence, PersistenceError, cache};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthenticatedUser, AuthenticationService, TokenPair};
use crate::config::RosterConfig;
use crate::error::{ApiError, AuthError};
use crate::request_response::{
    AssignmentInfo, BulkAssignmentsResponse, HealthcheckResponse, ListAssignmentsResponse,
    LoginRequest, LoginResponse, Lti1p1OutcomeRequest, RefreshTokenRequest, RefreshTokenResponse,
    UpdateLineItemsRequest, UpdateLineItemsResponse, WebhookEvent, WebhookEventResult,
    WebhookEventStatus,
};

/// Maximum number of usernames accepted by one bulk request.
pub const MAX_BULK_USERNAMES: usize = 1000;

/// The only web hook event that updates line items.
pub const REMOTE_DELIVERY_CREATED_EVENT: &str = "RemoteDeliveryCreatedEvent";

fn message_identifier() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

fn user_not_found(username: &str) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from("User"),
        message: format!("User '{username}' does not exist"),
    }
}

fn assignment_not_found(assignment_id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from("Assignment"),
        message: format!("Assignment {assignment_id} does not exist"),
    }
}

fn line_item_not_found(line_item_id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from("LineItem"),
        message: format!("Line item {line_item_id} does not exist"),
    }
}

fn load_user_assignments(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    username: &str,
) -> Result<UserAssignments, ApiError> {
    match cache::user_with_assignments(persistence, result_cache, username) {
        Ok(loaded) => Ok(loaded),
        Err(PersistenceError::NotFound(_)) => Err(user_not_found(username)),
        Err(e) => Err(e.into()),
    }
}

/// Reports whether the database and the cache respond.
#[must_use]
pub fn healthcheck(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
) -> HealthcheckResponse {
    let is_database_available: bool = match persistence.ping() {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Database healthcheck failed");
            false
        }
    };

    HealthcheckResponse {
        is_database_available,
        is_cache_available: result_cache.is_available(),
    }
}

/// Authenticates a user and issues session tokens.
///
/// # Errors
///
/// Returns an error if the credentials are wrong or the database fails.
pub fn login(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    config: &RosterConfig,
    request: &LoginRequest,
    now: OffsetDateTime,
) -> Result<LoginResponse, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("username"),
            message: String::from("username and password are required"),
        });
    }

    let tokens: TokenPair = AuthenticationService::login(
        persistence,
        result_cache,
        config,
        &request.username,
        &request.password,
        now,
    )?;

    Ok(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}

/// Issues a new access token for the user's current refresh token.
///
/// # Errors
///
/// Returns an error if the refresh token is invalid or stale.
pub fn refresh_token(
    result_cache: &dyn ResultCache,
    config: &RosterConfig,
    request: &RefreshTokenRequest,
    now: OffsetDateTime,
) -> Result<RefreshTokenResponse, ApiError> {
    let access_token: String =
        AuthenticationService::refresh(result_cache, &config.jwt, &request.refresh_token, now)?;
    Ok(RefreshTokenResponse { access_token })
}

/// Forgets the user's refresh token.
pub fn logout(result_cache: &dyn ResultCache, user: &AuthenticatedUser) {
    AuthenticationService::logout(result_cache, user);
}

/// Lists the current user's available assignments with their line items.
///
/// # Errors
///
/// Returns an error if the user no longer exists or the database fails.
pub fn list_assignments(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    user: &AuthenticatedUser,
) -> Result<ListAssignmentsResponse, ApiError> {
    let user_assignments: UserAssignments =
        load_user_assignments(persistence, result_cache, &user.username)?;

    let mut assignments: Vec<AssignmentInfo> = Vec::new();
    for assignment in user_assignments.available_assignments() {
        let line_item: LineItem =
            cache::line_item(persistence, result_cache, assignment.line_item_id)?
                .ok_or_else(|| line_item_not_found(assignment.line_item_id))?;
        assignments.push(AssignmentInfo::new(
            &user_assignments.user.username,
            assignment,
            &line_item,
        ));
    }

    debug!(username = %user.username, count = assignments.len(), "Listed assignments");
    Ok(ListAssignmentsResponse { assignments })
}

/// Starts an attempt on one of the user's assignments and returns the
/// signed launch for the configured LTI version.
///
/// # Errors
///
/// Returns an error if:
/// - the assignment does not exist or belongs to another user (404)
/// - the assignment or its line item is not available (409)
/// - no LTI instance is configured
/// - the database fails
pub fn get_lti_link(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    config: &RosterConfig,
    user: &AuthenticatedUser,
    assignment_id: i64,
    now: OffsetDateTime,
) -> Result<LtiLaunch, ApiError> {
    let user_assignments: UserAssignments =
        load_user_assignments(persistence, result_cache, &user.username)?;
    let mut assignment: Assignment = user_assignments
        .assignment(assignment_id)
        .cloned()
        .ok_or_else(|| assignment_not_found(assignment_id))?;

    let line_item: LineItem = cache::line_item(persistence, result_cache, assignment.line_item_id)?
        .ok_or_else(|| line_item_not_found(assignment.line_item_id))?;

    assignment.begin_attempt(&line_item, now)?;

    let instances: Vec<LtiInstance> = cache::lti_instances(persistence, result_cache)?;
    let balancer: LtiInstanceLoadBalancer<'_> =
        LtiInstanceLoadBalancer::new(config.lti.load_balancing_strategy, &instances);
    let instance: &LtiInstance = balancer.instance_for(&user_assignments.user)?;
    let context_id: String = balancer.context_id(&user_assignments.user, &line_item)?;

    let context: LaunchContext<'_> = LaunchContext {
        user: &user_assignments.user,
        assignment: &assignment,
        line_item: &line_item,
        instance,
        context_id: &context_id,
    };
    let launch: LtiLaunch = match config.lti.version {
        LtiVersion::V1p1 => build_lti1p1_launch(&config.lti.launch, &context)?,
        LtiVersion::V1p3 => build_lti1p3_launch(&config.lti.lti1p3, &context, now)?,
    };

    persistence.save_assignment(&assignment)?;

    info!(
        username = %user.username,
        assignment_id,
        attempts_count = assignment.attempts_count,
        instance = %instance.label,
        "Generated LTI launch"
    );
    Ok(launch)
}

fn bulk_collection(
    usernames: &[String],
    build: impl Fn(&str) -> BulkOperation,
) -> Result<BulkOperationCollection, ApiError> {
    if usernames.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("usernames"),
            message: String::from("at least one username is required"),
        });
    }
    if usernames.len() > MAX_BULK_USERNAMES {
        return Err(ApiError::PayloadTooLarge {
            received: usernames.len(),
            limit: MAX_BULK_USERNAMES,
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut collection: BulkOperationCollection = BulkOperationCollection::new(false);
    for username in usernames {
        let username: &str = username.trim();
        if username.is_empty() {
            return Err(ApiError::InvalidInput {
                field: String::from("usernames"),
                message: String::from("usernames cannot be empty"),
            });
        }
        if seen.insert(username) {
            collection.add(build(username));
        }
    }
    Ok(collection)
}

/// Gives each listed user a fresh assignment on the line item of their most
/// recent one, cancelling the assignments still available.
///
/// # Errors
///
/// Returns an error if the list is empty (400), longer than
/// [`MAX_BULK_USERNAMES`] (413), or the transaction fails.
pub fn bulk_create_assignments(
    persistence: &mut Persistence,
    usernames: &[String],
) -> Result<BulkAssignmentsResponse, ApiError> {
    let collection: BulkOperationCollection = bulk_collection(usernames, |username| {
        BulkOperation::new(username, BulkOperationType::Create)
    })?;

    let result: BulkResult = CreateAssignmentsProcessor.process(persistence, &collection)?;
    info!(
        requested = collection.len(),
        applied = result.is_applied(),
        failures = result.failure_count(),
        "Bulk assignment creation processed"
    );
    Ok(BulkAssignmentsResponse { data: result })
}

/// Cancels the available assignments of each listed user.
///
/// # Errors
///
/// Returns an error if the list is empty (400), longer than
/// [`MAX_BULK_USERNAMES`] (413), or the transaction fails.
pub fn bulk_cancel_assignments(
    persistence: &mut Persistence,
    usernames: &[String],
) -> Result<BulkAssignmentsResponse, ApiError> {
    let collection: BulkOperationCollection = bulk_collection(usernames, |username| {
        BulkOperation::new(username, BulkOperationType::Update)
            .with_attribute(STATE_ATTRIBUTE, AssignmentState::Cancelled.as_str())
    })?;

    let result: BulkResult = CancelAssignmentsProcessor.process(persistence, &collection)?;
    info!(
        requested = collection.len(),
        applied = result.is_applied(),
        failures = result.failure_count(),
        "Bulk assignment cancellation processed"
    );
    Ok(BulkAssignmentsResponse { data: result })
}

fn complete_assignment(
    persistence: &mut Persistence,
    request: &ReplaceResultRequest,
    now: OffsetDateTime,
) -> Result<String, ApiError> {
    let mut assignment: Assignment = persistence
        .get_assignment(request.assignment_id)?
        .ok_or_else(|| assignment_not_found(request.assignment_id))?;
    let line_item: LineItem = persistence
        .get_line_item(assignment.line_item_id)?
        .ok_or_else(|| line_item_not_found(assignment.line_item_id))?;

    assignment.complete(&line_item, now)?;
    persistence.save_assignment(&assignment)?;

    info!(
        assignment_id = assignment.id,
        state = %assignment.state,
        score = ?request.score,
        "Recorded LTI outcome"
    );
    Ok(replace_result_response(
        &message_identifier(),
        &request.message_identifier,
    ))
}

fn parse_outcome_body(body: &[u8]) -> Result<ReplaceResultRequest, ApiError> {
    let xml: &str = std::str::from_utf8(body).map_err(|_| ApiError::InvalidInput {
        field: String::from("body"),
        message: String::from("outcome body is not valid UTF-8"),
    })?;
    Ok(parse_replace_result_request(xml)?)
}

/// Handles an LTI 1.1 basic outcome callback.
///
/// The OAuth parameters travel in the query string and are signed against
/// the configured outcome service URL with the secret of the instance named
/// by `oauth_consumer_key`.
///
/// # Errors
///
/// Returns an error if:
/// - the consumer key is unknown or the signature is wrong (401)
/// - the body is not a `replaceResultRequest` (400)
/// - the assignment does not exist (404) or is not `started`
pub fn lti1p1_outcome(
    persistence: &mut Persistence,
    config: &RosterConfig,
    request: &Lti1p1OutcomeRequest,
    now: OffsetDateTime,
) -> Result<String, ApiError> {
    let url: &str = &config.lti.launch.outcome_service_url;
    let parameters: Vec<(String, String)> = query_parameters(&format!("{url}?{}", request.query));

    let consumer_key: &str = find_parameter(&parameters, OAUTH_CONSUMER_KEY).ok_or_else(|| {
        AuthError::AuthenticationFailed {
            reason: format!("Missing '{OAUTH_CONSUMER_KEY}'"),
        }
    })?;
    let instance: LtiInstance = persistence
        .get_lti_instance_by_key(consumer_key)?
        .ok_or_else(|| {
            warn!(consumer_key = %consumer_key, "Outcome for unknown consumer key");
            AuthError::AuthenticationFailed {
                reason: String::from("Unknown consumer key"),
            }
        })?;

    OAuthSigner::new(&instance.lti_key, &instance.lti_secret)
        .verify("POST", url, &parameters, &request.body)
        .map_err(|e| {
            warn!(consumer_key = %consumer_key, error = %e, "Rejected outcome signature");
            ApiError::from(e)
        })?;

    let outcome: ReplaceResultRequest = parse_outcome_body(&request.body)?;
    complete_assignment(persistence, &outcome, now)
}

/// Handles an LTI 1.3 basic outcome callback authorized by a service token.
///
/// # Errors
///
/// Returns an error if the token is invalid or lacks the basic outcome
/// scope (401), the body is malformed (400), or the assignment does not
/// exist (404) or is not `started`.
pub fn lti1p3_outcome(
    persistence: &mut Persistence,
    config: &RosterConfig,
    bearer_token: &str,
    body: &[u8],
    now: OffsetDateTime,
) -> Result<String, ApiError> {
    validate_outcome_token(&config.lti.lti1p3, bearer_token).map_err(|e| {
        warn!(error = %e, "Rejected LTI 1.3 outcome token");
        ApiError::from(e)
    })?;

    let outcome: ReplaceResultRequest = parse_outcome_body(body)?;
    complete_assignment(persistence, &outcome, now)
}

/// The line item change carried by a delivery event.
struct DeliveryUpdate<'a> {
    slug: &'a str,
    uri: &'a str,
}

fn delivery_update(event: &WebhookEvent) -> Option<DeliveryUpdate<'_>> {
    let slug: &str = event.event_data.get("alias")?.as_str()?.trim();
    let uri: &str = event.event_data.get("remoteDeliveryId")?.as_str()?.trim();
    if slug.is_empty() || uri.is_empty() {
        return None;
    }
    Some(DeliveryUpdate { slug, uri })
}

/// Applies delivery events to line items.
///
/// Only [`REMOTE_DELIVERY_CREATED_EVENT`] events are handled. When several
/// events target the same slug, only the most recently triggered one is
/// applied; the others are ignored. Each event reports its own status, so
/// the request as a whole never fails.
pub fn update_line_items(
    persistence: &mut Persistence,
    request: &UpdateLineItemsRequest,
) -> UpdateLineItemsResponse {
    let mut latest: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for (index, event) in request.events.iter().enumerate() {
        if event.event_name != REMOTE_DELIVERY_CREATED_EVENT {
            continue;
        }
        if let Some(update) = delivery_update(event) {
            let candidate: (i64, usize) = (event.triggered_timestamp, index);
            latest
                .entry(update.slug)
                .and_modify(|current| *current = (*current).max(candidate))
                .or_insert(candidate);
        }
    }

    let events: Vec<WebhookEventResult> = request
        .events
        .iter()
        .enumerate()
        .map(|(index, event)| WebhookEventResult {
            event_id: event.event_id.clone(),
            status: apply_event(persistence, &latest, index, event),
        })
        .collect();

    info!(
        source = request.source.as_deref().unwrap_or("unknown"),
        received = events.len(),
        accepted = events
            .iter()
            .filter(|e| e.status == WebhookEventStatus::Accepted)
            .count(),
        "Processed line item web hook"
    );
    UpdateLineItemsResponse { events }
}

fn apply_event(
    persistence: &mut Persistence,
    latest: &BTreeMap<&str, (i64, usize)>,
    index: usize,
    event: &WebhookEvent,
) -> WebhookEventStatus {
    if event.event_name != REMOTE_DELIVERY_CREATED_EVENT {
        debug!(event_id = %event.event_id, name = %event.event_name, "Ignored web hook event");
        return WebhookEventStatus::Ignored;
    }

    let Some(update) = delivery_update(event) else {
        warn!(event_id = %event.event_id, "Web hook event without alias or remoteDeliveryId");
        return WebhookEventStatus::Error;
    };

    if latest.get(update.slug).is_some_and(|(_, winner)| *winner != index) {
        debug!(event_id = %event.event_id, slug = %update.slug, "Superseded web hook event");
        return WebhookEventStatus::Ignored;
    }

    match persistence.update_line_item_uri(update.slug, update.uri) {
        Ok(Some(line_item_id)) => {
            info!(
                event_id = %event.event_id,
                line_item_id,
                uri = %update.uri,
                "Updated line item URI"
            );
            WebhookEventStatus::Accepted
        }
        Ok(None) => {
            warn!(
                event_id = %event.event_id,
                slug = %update.slug,
                "Web hook event for unknown line item"
            );
            WebhookEventStatus::Error
        }
        Err(e) => {
            error!(event_id = %event.event_id, error = %e, "Failed to update line item");
            WebhookEventStatus::Error
        }
    }
}
