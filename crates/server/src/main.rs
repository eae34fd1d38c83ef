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
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod session;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, RawQuery, State as AxumState},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::Serialize;
use simple_roster::ResultCache;
use simple_roster_api::{
    ApiError, BulkAssignmentsResponse, DatabaseArgs, HealthcheckResponse, ListAssignmentsResponse,
    LoginRequest, LoginResponse, Lti1p1OutcomeRequest, RefreshTokenRequest, RefreshTokenResponse,
    RosterArgs, RosterConfig, UpdateLineItemsRequest, UpdateLineItemsResponse,
    bulk_cancel_assignments, bulk_create_assignments, get_lti_link, healthcheck, list_assignments,
    login, logout, lti1p1_outcome, lti1p3_outcome, refresh_token, update_line_items,
};
use simple_roster_persistence::{Persistence, ResultCacheHook};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::session::{ApiKey, BearerToken, SessionUser, WebhookCaller};

/// Simple Roster Server - HTTP API for test takers, deliveries and operators
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    roster: RosterArgs,

    /// Address to bind the server to
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

/// Application state shared across handlers.
///
/// The persistence layer sits behind a Mutex; the cache and the
/// configuration are shared read-only.
#[derive(Clone)]
struct AppState {
    /// The database.
    persistence: Arc<Mutex<Persistence>>,
    /// The result cache, also refreshed by the persistence hook.
    cache: Arc<dyn ResultCache>,
    /// Runtime configuration.
    config: Arc<RosterConfig>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match err {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// Handler for GET `/api/v1/healthcheck`.
async fn handle_healthcheck(
    AxumState(app_state): AxumState<AppState>,
) -> Json<HealthcheckResponse> {
    let mut persistence = app_state.persistence.lock().await;
    Json(healthcheck(&mut persistence, app_state.cache.as_ref()))
}

/// Handler for POST `/api/v1/auth`.
async fn handle_login(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    info!(username = %req.username, "Handling login request");

    let mut persistence = app_state.persistence.lock().await;
    let response: LoginResponse = login(
        &mut persistence,
        app_state.cache.as_ref(),
        &app_state.config,
        &req,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/api/v1/auth/token/refresh`.
async fn handle_refresh_token(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, HttpError> {
    let response: RefreshTokenResponse = refresh_token(
        app_state.cache.as_ref(),
        &app_state.config,
        &req,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(response))
}

/// Handler for POST `/api/v1/auth/logout`.
async fn handle_logout(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user): SessionUser,
) -> StatusCode {
    logout(app_state.cache.as_ref(), &user);
    StatusCode::NO_CONTENT
}

/// Handler for GET `/api/v1/assignments`.
async fn handle_list_assignments(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<ListAssignmentsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListAssignmentsResponse =
        list_assignments(&mut persistence, app_state.cache.as_ref(), &user)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/api/v1/assignments/{assignment_id}/lti-link`.
async fn handle_get_lti_link(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(user): SessionUser,
    Path(assignment_id): Path<i64>,
) -> Result<Response, HttpError> {
    info!(username = %user.username, assignment_id, "Handling LTI link request");

    let mut persistence = app_state.persistence.lock().await;
    let launch = get_lti_link(
        &mut persistence,
        app_state.cache.as_ref(),
        &app_state.config,
        &user,
        assignment_id,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(launch).into_response())
}

/// Handler for POST `/api/v1/assignments`.
async fn handle_bulk_create_assignments(
    AxumState(app_state): AxumState<AppState>,
    _key: ApiKey,
    Json(usernames): Json<Vec<String>>,
) -> Result<(StatusCode, Json<BulkAssignmentsResponse>), HttpError> {
    info!(count = usernames.len(), "Handling bulk assignment creation");

    let mut persistence = app_state.persistence.lock().await;
    let response: BulkAssignmentsResponse = bulk_create_assignments(&mut persistence, &usernames)?;
    drop(persistence);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for DELETE `/api/v1/assignments`.
async fn handle_bulk_cancel_assignments(
    AxumState(app_state): AxumState<AppState>,
    _key: ApiKey,
    Json(usernames): Json<Vec<String>>,
) -> Result<Json<BulkAssignmentsResponse>, HttpError> {
    info!(count = usernames.len(), "Handling bulk assignment cancellation");

    let mut persistence = app_state.persistence.lock().await;
    let response: BulkAssignmentsResponse = bulk_cancel_assignments(&mut persistence, &usernames)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/api/v1/lti1p1/outcome`.
///
/// The OAuth parameters travel in the query string, the body is the POX
/// envelope.
async fn handle_lti1p1_outcome(
    AxumState(app_state): AxumState<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, HttpError> {
    let request: Lti1p1OutcomeRequest = Lti1p1OutcomeRequest {
        query: query.unwrap_or_default(),
        body: body.to_vec(),
    };

    let mut persistence = app_state.persistence.lock().await;
    let xml: String = lti1p1_outcome(
        &mut persistence,
        &app_state.config,
        &request,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(xml_response(xml))
}

/// Handler for POST `/api/v1/lti1p3/outcome`.
async fn handle_lti1p3_outcome(
    AxumState(app_state): AxumState<AppState>,
    BearerToken(token): BearerToken,
    body: Bytes,
) -> Result<Response, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let xml: String = lti1p3_outcome(
        &mut persistence,
        &app_state.config,
        &token,
        &body,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(xml_response(xml))
}

/// Handler for POST `/api/v1/web-hooks/update-line-items`.
async fn handle_update_line_items(
    AxumState(app_state): AxumState<AppState>,
    _caller: WebhookCaller,
    Json(req): Json<UpdateLineItemsRequest>,
) -> Json<UpdateLineItemsResponse> {
    info!(events = req.events.len(), "Handling update line items web hook");

    let mut persistence = app_state.persistence.lock().await;
    Json(update_line_items(&mut persistence, &req))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/v1/healthcheck", get(handle_healthcheck))
        .route("/api/v1/auth", post(handle_login))
        .route("/api/v1/auth/token/refresh", post(handle_refresh_token))
        .route("/api/v1/auth/logout", post(handle_logout))
        .route(
            "/api/v1/assignments",
            get(handle_list_assignments)
                .post(handle_bulk_create_assignments)
                .delete(handle_bulk_cancel_assignments),
        )
        .route(
            "/api/v1/assignments/{assignment_id}/lti-link",
            get(handle_get_lti_link),
        )
        .route("/api/v1/lti1p1/outcome", post(handle_lti1p1_outcome))
        .route("/api/v1/lti1p3/outcome", post(handle_lti1p3_outcome))
        .route(
            "/api/v1/web-hooks/update-line-items",
            post(handle_update_line_items),
        )
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Simple Roster server");

    let config: RosterConfig = args.roster.into_config()?;
    config.require_http_secrets()?;

    let mut persistence: Persistence = args.database.open()?;
    let cache: Arc<dyn ResultCache> = config.build_cache(&persistence)?;
    persistence.register_hook(ResultCacheHook::new(Arc::clone(&cache)));

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        cache,
        config: Arc::new(config),
    };

    let app: Router = build_router(app_state);

    let addr: std::net::SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use base64::Engine;
    use serde_json::{Value, json};
    use simple_roster::InMemoryResultCache;
    use simple_roster_api::{CacheBackend, JwtConfig, LtiConfig, WebhookCredentials};
    use simple_roster_domain::{
        AssignmentState, NewAssignment, NewLineItem, NewLtiInstance, NewUser,
    };
    use simple_roster_lti::{
        BASIC_OUTCOME_SCOPE, LaunchSettings, LoadBalancingStrategy, Lti1p3Settings, LtiVersion,
        OAUTH_BODY_HASH, OAuthSigner, body_hash, issue_service_token, percent_encode,
    };
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    const OUTCOME_SERVICE_URL: &str = "https://roster.example/api/v1/lti1p1/outcome";
    const API_KEY: &str = "test-api-key";

    fn create_test_config() -> RosterConfig {
        RosterConfig {
            jwt: JwtConfig {
                secret: String::from("test-jwt-secret"),
                access_token_ttl_secs: 3600,
                refresh_token_ttl_secs: 86400,
                issuer: String::from("simple-roster"),
            },
            lti: LtiConfig {
                version: LtiVersion::V1p1,
                load_balancing_strategy: LoadBalancingStrategy::Username,
                launch: LaunchSettings {
                    launch_presentation_return_url: String::from("https://roster.example/done"),
                    launch_presentation_locale: String::from("en-EN"),
                    outcome_service_url: String::from(OUTCOME_SERVICE_URL),
                },
                lti1p3: Lti1p3Settings {
                    platform_issuer: String::from("https://roster.example"),
                    client_id: String::from("roster-client"),
                    deployment_id: String::from("1"),
                    oidc_initiation_url: String::from("https://delivery.example/lti1p3/oidc"),
                    platform_secret: String::from("test-platform-secret"),
                    token_ttl_secs: 3600,
                },
            },
            app_api_key: String::from(API_KEY),
            webhook: WebhookCredentials {
                username: String::from("hook"),
                password: String::from("hook-password"),
            },
            cache_backend: CacheBackend::Memory,
            cache_ttl_secs: 0,
            password_hash_cost: 4,
            assignment_stuck_threshold_secs: 3600,
        }
    }

    /// Seeds `user1` and `user2` with one ready assignment each on an
    /// always-open line item. Returns the app state and the assignment ids.
    fn create_test_app_state() -> (AppState, Vec<i64>) {
        let cache: Arc<dyn ResultCache> = Arc::new(InMemoryResultCache::new());
        let mut persistence: Persistence =
            Persistence::new_in_memory().expect("Failed to create in-memory persistence");
        persistence.register_hook(ResultCacheHook::new(Arc::clone(&cache)));

        let user_ids: Vec<i64> = persistence
            .insert_users(
                &[
                    NewUser {
                        username: String::from("user1"),
                        password: String::from("user1-password"),
                        group_id: None,
                    },
                    NewUser {
                        username: String::from("user2"),
                        password: String::from("user2-password"),
                        group_id: None,
                    },
                ],
                4,
            )
            .unwrap();
        let line_item_id: i64 = persistence
            .insert_line_items(&[NewLineItem {
                uri: String::from("https://delivery.example/math"),
                label: String::from("Math"),
                slug: String::from("math"),
                starts_at: None,
                ends_at: None,
                max_attempts: 2,
            }])
            .unwrap()[0];
        persistence
            .insert_lti_instances(&[NewLtiInstance {
                label: String::from("infra_1"),
                lti_link: String::from("https://infra_1.example/"),
                lti_key: String::from("key_1"),
                lti_secret: String::from("secret_1"),
            }])
            .unwrap();
        let assignments: Vec<NewAssignment> = user_ids
            .iter()
            .map(|user_id| NewAssignment {
                user_id: *user_id,
                line_item_id,
            })
            .collect();
        let assignment_ids: Vec<i64> = persistence
            .insert_assignments(&assignments, OffsetDateTime::now_utc())
            .unwrap();

        let app_state: AppState = AppState {
            persistence: Arc::new(Mutex::new(persistence)),
            cache,
            config: Arc::new(create_test_config()),
        };
        (app_state, assignment_ids)
    }

    async fn send(app: &Router, request: Request<Body>) -> (HttpStatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status: HttpStatusCode = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body_bytes.to_vec())
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn api_key_request(method: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/api/v1/assignments")
            .header("content-type", "application/json")
            .header("x-api-key", API_KEY)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login_tokens(app: &Router, username: &str) -> Value {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/v1/auth",
                &json!({ "username": username, "password": format!("{username}-password") }),
            ),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    async fn access_token(app: &Router, username: &str) -> String {
        login_tokens(app, username).await["accessToken"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn assignment_state(app_state: &AppState, assignment_id: i64) -> AssignmentState {
        app_state
            .persistence
            .lock()
            .await
            .get_assignment(assignment_id)
            .unwrap()
            .unwrap()
            .state
    }

    async fn launch(app: &Router, token: &str, assignment_id: i64) {
        let (status, _) = send(
            app,
            bearer_request(
                "GET",
                &format!("/api/v1/assignments/{assignment_id}/lti-link"),
                token,
            ),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
    }

    fn replace_result_xml(assignment_id: i64) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
    <imsx_POXHeader>
        <imsx_POXRequestHeaderInfo>
            <imsx_version>V1.0</imsx_version>
            <imsx_messageIdentifier>msg-{assignment_id}</imsx_messageIdentifier>
        </imsx_POXRequestHeaderInfo>
    </imsx_POXHeader>
    <imsx_POXBody>
        <replaceResultRequest>
            <resultRecord>
                <sourcedGUID>
                    <sourcedId>{assignment_id}</sourcedId>
                </sourcedGUID>
                <result>
                    <resultScore>
                        <language>en</language>
                        <textString>0.5</textString>
                    </resultScore>
                </result>
            </resultRecord>
        </replaceResultRequest>
    </imsx_POXBody>
</imsx_POXEnvelopeRequest>"#
        )
    }

    fn signed_outcome_query(body: &str) -> String {
        let mut parameters: BTreeMap<String, String> = BTreeMap::new();
        parameters.insert(OAUTH_BODY_HASH.to_string(), body_hash(body.as_bytes()));
        OAuthSigner::new("key_1", "secret_1")
            .sign(
                "POST",
                OUTCOME_SERVICE_URL,
                parameters,
                "nonce-1",
                1_773_144_000,
            )
            .unwrap()
            .iter()
            .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
            .collect::<Vec<String>>()
            .join("&")
    }

    fn outcome_request(query: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/lti1p1/outcome?{query}"))
            .header("content-type", "application/xml")
            .body(Body::from(body))
            .unwrap()
    }

    fn webhook_request(username: &str, password: &str) -> Request<Body> {
        let credentials: String = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        let body: Value = json!({
            "source": "delivery-1",
            "events": [{
                "eventId": "e1",
                "eventName": "RemoteDeliveryCreatedEvent",
                "triggeredTimestamp": 1_565_602_390,
                "eventData": { "alias": "math", "remoteDeliveryId": "https://delivery.example/new" }
            }]
        });
        Request::builder()
            .method("POST")
            .uri("/api/v1/web-hooks/update-line-items")
            .header("content-type", "application/json")
            .header("authorization", format!("Basic {credentials}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthcheck_reports_database_and_cache() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/v1/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        let health: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            health,
            json!({ "isDatabaseAvailable": true, "isCacheAvailable": true })
        );
    }

    #[tokio::test]
    async fn test_login_returns_tokens() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let tokens: Value = login_tokens(&app, "user1").await;

        assert!(tokens["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(tokens["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth",
                &json!({ "username": "user1", "password": "nope" }),
            ),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        let error_response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error_response["error"], json!(true));
    }

    #[tokio::test]
    async fn test_assignments_require_a_bearer_token() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/api/v1/assignments")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        let error_response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error_response["error"], json!(true));
    }

    #[tokio::test]
    async fn test_list_assignments_returns_own_assignments() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state);
        let token: String = access_token(&app, "user1").await;

        let (status, body) = send(&app, bearer_request("GET", "/api/v1/assignments", &token)).await;

        assert_eq!(status, HttpStatusCode::OK);
        let listed: Value = serde_json::from_slice(&body).unwrap();
        let assignments = listed["assignments"].as_array().unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0]["id"], json!(assignment_ids[0]));
        assert_eq!(assignments[0]["username"], json!("user1"));
    }

    #[tokio::test]
    async fn test_lti_link_starts_the_assignment() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let token: String = access_token(&app, "user1").await;

        let (status, body) = send(
            &app,
            bearer_request(
                "GET",
                &format!("/api/v1/assignments/{}/lti-link", assignment_ids[0]),
                &token,
            ),
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        let link: Value = serde_json::from_slice(&body).unwrap();
        assert!(
            link["ltiLink"]
                .as_str()
                .is_some_and(|url| url.starts_with("https://infra_1.example/"))
        );
        assert_eq!(
            assignment_state(&app_state, assignment_ids[0]).await,
            AssignmentState::Started
        );
    }

    #[tokio::test]
    async fn test_lti_link_of_another_users_assignment_is_not_found() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let token: String = access_token(&app, "user1").await;

        let (status, _) = send(
            &app,
            bearer_request(
                "GET",
                &format!("/api/v1/assignments/{}/lti-link", assignment_ids[1]),
                &token,
            ),
        )
        .await;

        assert_eq!(status, HttpStatusCode::NOT_FOUND);
        assert_eq!(
            assignment_state(&app_state, assignment_ids[1]).await,
            AssignmentState::Ready
        );
    }

    #[tokio::test]
    async fn test_bulk_endpoints_require_the_api_key() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, _) = send(
            &app,
            json_request("DELETE", "/api/v1/assignments", &json!(["user1"])),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bulk_cancel_hides_the_assignment() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, body) = send(&app, api_key_request("DELETE", &json!(["user1"]))).await;

        assert_eq!(status, HttpStatusCode::OK);
        let result: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            result,
            json!({ "data": { "applied": true, "results": { "user1": true } } })
        );

        let token: String = access_token(&app, "user1").await;
        let (_, body) = send(&app, bearer_request("GET", "/api/v1/assignments", &token)).await;
        let listed: Value = serde_json::from_slice(&body).unwrap();
        assert!(listed["assignments"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_create_returns_created() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, body) =
            send(&app, api_key_request("POST", &json!(["user1", "user2"]))).await;

        assert_eq!(status, HttpStatusCode::CREATED);
        let result: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(result["data"]["applied"], json!(true));
    }

    #[tokio::test]
    async fn test_bulk_with_no_usernames_is_bad_request() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, _) = send(&app, api_key_request("POST", &json!([]))).await;

        assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_with_too_many_usernames_is_payload_too_large() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);
        let usernames: Vec<String> = (0..1001).map(|i| format!("user{i}")).collect();

        let (status, _) = send(&app, api_key_request("DELETE", &json!(usernames))).await;

        assert_eq!(status, HttpStatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_lti1p1_outcome_returns_the_assignment_to_ready() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let token: String = access_token(&app, "user1").await;
        launch(&app, &token, assignment_ids[0]).await;

        let body: String = replace_result_xml(assignment_ids[0]);
        let (status, response) = send(
            &app,
            outcome_request(&signed_outcome_query(&body), body),
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        let xml: String = String::from_utf8(response).unwrap();
        assert!(xml.contains("<imsx_codeMajor>success</imsx_codeMajor>"));
        assert_eq!(
            assignment_state(&app_state, assignment_ids[0]).await,
            AssignmentState::Ready
        );
    }

    #[tokio::test]
    async fn test_lti1p1_outcome_with_tampered_signature_is_rejected() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let token: String = access_token(&app, "user1").await;
        launch(&app, &token, assignment_ids[0]).await;

        let body: String = replace_result_xml(assignment_ids[0]);
        let query: String = signed_outcome_query(&body)
            .split('&')
            .map(|pair| {
                if pair.starts_with("oauth_signature=") {
                    String::from("oauth_signature=tampered")
                } else {
                    pair.to_string()
                }
            })
            .collect::<Vec<String>>()
            .join("&");
        let (status, _) = send(&app, outcome_request(&query, body)).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(
            assignment_state(&app_state, assignment_ids[0]).await,
            AssignmentState::Started
        );
    }

    #[tokio::test]
    async fn test_lti1p3_outcome_accepts_a_scoped_service_token() {
        let (app_state, assignment_ids) = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let token: String = access_token(&app, "user1").await;
        launch(&app, &token, assignment_ids[0]).await;

        let service_token: String = issue_service_token(
            &app_state.config.lti.lti1p3,
            &[BASIC_OUTCOME_SCOPE],
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        let (status, _) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/lti1p3/outcome")
                .header("authorization", format!("Bearer {service_token}"))
                .header("content-type", "application/xml")
                .body(Body::from(replace_result_xml(assignment_ids[0])))
                .unwrap(),
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(
            assignment_state(&app_state, assignment_ids[0]).await,
            AssignmentState::Ready
        );
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_credentials() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);

        let (status, _) = send(&app, webhook_request("hook", "wrong")).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_updates_the_line_item() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let (status, body) = send(&app, webhook_request("hook", "hook-password")).await;

        assert_eq!(status, HttpStatusCode::OK);
        let result: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            result,
            json!({ "events": [{ "eventId": "e1", "status": "accepted" }] })
        );
        let line_items = app_state
            .persistence
            .lock()
            .await
            .list_line_items()
            .unwrap();
        assert_eq!(line_items[0].uri, "https://delivery.example/new");
    }

    #[tokio::test]
    async fn test_refresh_after_logout_is_unauthorized() {
        let (app_state, _) = create_test_app_state();
        let app: Router = build_router(app_state);
        let tokens: Value = login_tokens(&app, "user1").await;
        let access: &str = tokens["accessToken"].as_str().unwrap();
        let refresh: &str = tokens["refreshToken"].as_str().unwrap();

        let (status, _) = send(&app, bearer_request("POST", "/api/v1/auth/logout", access)).await;
        assert_eq!(status, HttpStatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth/token/refresh",
                &json!({ "refreshToken": refresh }),
            ),
        )
        .await;
        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }
}
