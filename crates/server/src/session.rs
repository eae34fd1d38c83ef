// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request authentication extractors.
//!
//! Each protected route family authenticates differently:
//!
//! - user routes carry a session JWT as `Authorization: Bearer <token>`
//! - the bulk assignment routes carry the shared key in `X-Api-Key`
//! - the web hook uses `Authorization: Basic <base64(user:password)>`
//! - the LTI 1.3 outcome route carries a platform token as a bearer token,
//!   validated by the handler against the LTI settings

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use simple_roster_api::{AuthError, AuthenticatedUser, AuthenticationService};
use tracing::{debug, warn};

use crate::{AppState, ErrorResponse};

/// Header carrying the bulk endpoint API key.
pub const API_KEY_HEADER: &str = "x-api-key";

fn authorization<'a>(parts: &'a Parts, scheme: &str) -> Result<&'a str, SessionError> {
    let header: &str = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            debug!("Missing Authorization header");
            SessionError::MissingAuthorizationHeader
        })?
        .to_str()
        .map_err(|_| {
            warn!("Invalid Authorization header encoding");
            SessionError::InvalidAuthorizationHeader
        })?;

    header
        .strip_prefix(scheme)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            warn!(scheme = %scheme.trim(), "Authorization header has the wrong scheme");
            SessionError::InvalidAuthorizationHeader
        })
}

/// The user behind a valid session access token.
pub struct SessionUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token: &str = authorization(parts, "Bearer ")?;
        let user: AuthenticatedUser =
            AuthenticationService::validate_access_token(&state.config.jwt, token).map_err(
                |e| {
                    warn!(error = %e, "Session validation failed");
                    SessionError::Rejected(e)
                },
            )?;

        debug!(username = %user.username, "Session validated");
        Ok(Self(user))
    }
}

/// Proof that the request carried the configured API key.
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided: Option<&str> = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        AuthenticationService::verify_api_key(&state.config, provided).map_err(|e| {
            warn!(error = %e, "API key rejected");
            SessionError::Rejected(e)
        })?;
        Ok(Self)
    }
}

/// Proof that the request carried the web hook Basic credentials.
pub struct WebhookCaller;

impl FromRequestParts<AppState> for WebhookCaller {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let encoded: &str = authorization(parts, "Basic ")?;
        let decoded: Vec<u8> = STANDARD
            .decode(encoded)
            .map_err(|_| SessionError::InvalidAuthorizationHeader)?;
        let decoded: String =
            String::from_utf8(decoded).map_err(|_| SessionError::InvalidAuthorizationHeader)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(SessionError::InvalidAuthorizationHeader)?;

        AuthenticationService::verify_webhook_credentials(&state.config, username, password)
            .map_err(SessionError::Rejected)?;
        Ok(Self)
    }
}

/// A raw bearer token, validated by the handler that receives it.
pub struct BearerToken(pub String);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authorization(parts, "Bearer ")?.to_string()))
    }
}

/// Authentication extraction errors, all answered with 401.
#[derive(Debug)]
pub enum SessionError {
    /// Authorization header is missing.
    MissingAuthorizationHeader,
    /// Authorization header format is invalid.
    InvalidAuthorizationHeader,
    /// The credentials were checked and rejected.
    Rejected(AuthError),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let message: String = match self {
            Self::MissingAuthorizationHeader => String::from("Missing Authorization header"),
            Self::InvalidAuthorizationHeader => String::from("Invalid Authorization header"),
            Self::Rejected(err) => err.to_string(),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: true,
                message,
            }),
        )
            .into_response()
    }
}
