// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Authentication and authorization logic.
//!
//! Users log in with their password and receive a short lived access token
//! plus a refresh token, both HS256 JWTs. The current refresh token of each
//! user is kept in the result cache; refreshing requires a match and logging
//! out forgets it.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use simple_roster::{ResultCache, jwt_refresh_cache_key};
use simple_roster_domain::User;
use simple_roster_persistence::Persistence;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::config::{JwtConfig, RosterConfig, WebhookCredentials};
use crate::error::{ApiError, AuthError};

/// The purpose of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Grants access to the user endpoints.
    Access,
    /// Can only be exchanged for a new access token.
    Refresh,
}

/// Claims carried by session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The username.
    pub sub: String,
    /// The issuer.
    pub iss: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Random token id.
    pub jti: String,
    /// Token purpose.
    pub typ: TokenKind,
}

/// A user authenticated through an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The username from the token subject.
    pub username: String,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// The access token.
    pub access_token: String,
    /// The refresh token.
    pub refresh_token: String,
}

fn encode_token(
    config: &JwtConfig,
    username: &str,
    kind: TokenKind,
    now: OffsetDateTime,
) -> Result<String, AuthError> {
    let ttl: i64 = match kind {
        TokenKind::Access => config.access_token_ttl_secs,
        TokenKind::Refresh => config.refresh_token_ttl_secs,
    };
    let claims: SessionClaims = SessionClaims {
        sub: username.to_string(),
        iss: config.issuer.clone(),
        iat: now.unix_timestamp(),
        exp: now.unix_timestamp() + ttl,
        jti: format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>()),
        typ: kind,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AuthError::AuthenticationFailed {
        reason: format!("Failed to issue token: {e}"),
    })
}

fn decode_token(
    config: &JwtConfig,
    token: &str,
    expected: TokenKind,
) -> Result<SessionClaims, AuthError> {
    let mut validation: Validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer.as_str()]);

    let claims: SessionClaims = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AuthError::AuthenticationFailed {
        reason: format!("Invalid token: {e}"),
    })?
    .claims;

    if claims.typ != expected {
        return Err(AuthError::AuthenticationFailed {
            reason: String::from("Invalid token: wrong token type"),
        });
    }

    Ok(claims)
}

/// Authentication service for session tokens and shared secrets.
pub struct AuthenticationService;

impl AuthenticationService {
    /// Verifies a username and password and issues a token pair.
    ///
    /// The refresh token replaces any previous one of the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist, the password is wrong,
    /// or the database fails.
    pub fn login(
        persistence: &mut Persistence,
        cache: &dyn ResultCache,
        config: &RosterConfig,
        username: &str,
        password: &str,
        now: OffsetDateTime,
    ) -> Result<TokenPair, ApiError> {
        let user: User = persistence
            .get_user_by_username(username.trim())?
            .ok_or_else(|| {
                debug!(username = %username, "Login for unknown user");
                AuthError::AuthenticationFailed {
                    reason: String::from("Invalid credentials"),
                }
            })?;

        let verified: bool = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !verified {
            warn!(username = %user.username, "Rejected login with wrong password");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Invalid credentials"),
            }
            .into());
        }

        let access_token: String =
            encode_token(&config.jwt, &user.username, TokenKind::Access, now)?;
        let refresh_token: String =
            encode_token(&config.jwt, &user.username, TokenKind::Refresh, now)?;
        cache.set(&jwt_refresh_cache_key(&user.username), refresh_token.clone());

        info!(username = %user.username, "User logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchanges the user's current refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or no longer the
    /// user's current refresh token.
    pub fn refresh(
        cache: &dyn ResultCache,
        config: &JwtConfig,
        refresh_token: &str,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims: SessionClaims = decode_token(config, refresh_token, TokenKind::Refresh)?;

        let current: Option<String> = cache.get(&jwt_refresh_cache_key(&claims.sub));
        if current.as_deref() != Some(refresh_token) {
            warn!(username = %claims.sub, "Rejected stale refresh token");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Refresh token is no longer valid"),
            });
        }

        debug!(username = %claims.sub, "Refreshed access token");
        encode_token(config, &claims.sub, TokenKind::Access, now)
    }

    /// Forgets the user's refresh token.
    pub fn logout(cache: &dyn ResultCache, user: &AuthenticatedUser) {
        let removed: bool = cache.delete(&jwt_refresh_cache_key(&user.username));
        info!(username = %user.username, had_refresh_token = removed, "User logged out");
    }

    /// Validates an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired or not an access
    /// token.
    pub fn validate_access_token(
        config: &JwtConfig,
        token: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let claims: SessionClaims = decode_token(config, token, TokenKind::Access)?;
        Ok(AuthenticatedUser {
            username: claims.sub,
        })
    }

    /// Checks the API key of the bulk endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or wrong.
    pub fn verify_api_key(config: &RosterConfig, provided: Option<&str>) -> Result<(), AuthError> {
        match provided {
            Some(key) if !config.app_api_key.is_empty() && key == config.app_api_key => Ok(()),
            Some(_) => Err(AuthError::AuthenticationFailed {
                reason: String::from("Invalid API key"),
            }),
            None => Err(AuthError::AuthenticationFailed {
                reason: String::from("API key is required"),
            }),
        }
    }

    /// Checks the Basic auth credentials of the web hook.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials do not match.
    pub fn verify_webhook_credentials(
        config: &RosterConfig,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let expected: &WebhookCredentials = &config.webhook;
        if expected.username.is_empty()
            || username != expected.username
            || password != expected.password
        {
            warn!(username = %username, "Rejected web hook credentials");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Invalid web hook credentials"),
            });
        }
        Ok(())
    }
}
