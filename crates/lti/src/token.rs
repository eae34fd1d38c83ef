// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! HS256 tokens exchanged with LTI 1.3 tools.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::LtiError;

/// Scope a tool must hold to post basic outcomes.
pub const BASIC_OUTCOME_SCOPE: &str = "https://purl.imsglobal.org/spec/lti-bo/scope/basicoutcome";

/// Platform side settings for LTI 1.3.
#[derive(Clone, PartialEq, Eq)]
pub struct Lti1p3Settings {
    /// The platform issuer (`iss`).
    pub platform_issuer: String,
    /// The tool's client id (`aud`).
    pub client_id: String,
    /// The deployment id sent with launches.
    pub deployment_id: String,
    /// The tool's OIDC login initiation endpoint.
    pub oidc_initiation_url: String,
    /// Shared HS256 secret.
    pub platform_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl_secs: i64,
}

impl std::fmt::Debug for Lti1p3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lti1p3Settings")
            .field("platform_issuer", &self.platform_issuer)
            .field("client_id", &self.client_id)
            .field("deployment_id", &self.deployment_id)
            .field("oidc_initiation_url", &self.oidc_initiation_url)
            .finish_non_exhaustive()
    }
}

/// Claims of the `lti_message_hint` carried through the OIDC login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHintClaims {
    /// The platform issuer.
    pub iss: String,
    /// The launched assignment, also used as result source id.
    pub assignment_id: i64,
    /// The delivery URI of the line item.
    pub line_item_uri: String,
    /// The LTI context id.
    pub context_id: String,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Claims of a service token authorising outcome calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTokenClaims {
    /// The platform issuer.
    pub iss: String,
    /// The tool client id.
    pub aud: String,
    /// Space separated granted scopes.
    pub scope: String,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl ServiceTokenClaims {
    /// Returns whether `scope` was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|granted| granted == scope)
    }
}

fn encode<T: Serialize>(settings: &Lti1p3Settings, claims: &T) -> Result<String, LtiError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(settings.platform_secret.as_bytes()),
    )
    .map_err(|e| LtiError::Token(e.to_string()))
}

/// Signs the message hint for a launch.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn issue_message_hint(
    settings: &Lti1p3Settings,
    assignment_id: i64,
    line_item_uri: &str,
    context_id: &str,
    now: OffsetDateTime,
) -> Result<String, LtiError> {
    let claims: MessageHintClaims = MessageHintClaims {
        iss: settings.platform_issuer.clone(),
        assignment_id,
        line_item_uri: line_item_uri.to_string(),
        context_id: context_id.to_string(),
        exp: now.unix_timestamp() + settings.token_ttl_secs,
    };
    encode(settings, &claims)
}

/// Signs a service token carrying `scopes`.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn issue_service_token(
    settings: &Lti1p3Settings,
    scopes: &[&str],
    now: OffsetDateTime,
) -> Result<String, LtiError> {
    let claims: ServiceTokenClaims = ServiceTokenClaims {
        iss: settings.platform_issuer.clone(),
        aud: settings.client_id.clone(),
        scope: scopes.join(" "),
        exp: now.unix_timestamp() + settings.token_ttl_secs,
    };
    encode(settings, &claims)
}

/// Validates a service token and requires the basic outcome scope.
///
/// # Errors
///
/// Returns an error if the token is invalid, expired, issued for another
/// audience or lacks the basic outcome scope.
pub fn validate_outcome_token(
    settings: &Lti1p3Settings,
    token: &str,
) -> Result<ServiceTokenClaims, LtiError> {
    let mut validation: Validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.platform_issuer.as_str()]);
    validation.set_audience(&[settings.client_id.as_str()]);

    let claims: ServiceTokenClaims = jsonwebtoken::decode::<ServiceTokenClaims>(
        token,
        &DecodingKey::from_secret(settings.platform_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| LtiError::Token(e.to_string()))?
    .claims;

    if !claims.has_scope(BASIC_OUTCOME_SCOPE) {
        return Err(LtiError::Token(format!(
            "missing scope '{BASIC_OUTCOME_SCOPE}'"
        )));
    }

    Ok(claims)
}

/// Decodes a message hint issued by [`issue_message_hint`].
///
/// # Errors
///
/// Returns an error if the hint is invalid or expired.
pub fn decode_message_hint(
    settings: &Lti1p3Settings,
    token: &str,
) -> Result<MessageHintClaims, LtiError> {
    let mut validation: Validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.platform_issuer.as_str()]);

    jsonwebtoken::decode::<MessageHintClaims>(
        token,
        &DecodingKey::from_secret(settings.platform_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| LtiError::Token(e.to_string()))
}
