// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use thiserror::Error;

/// Errors raised while building launches or authenticating LTI traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LtiError {
    /// The OAuth signature did not match the request.
    #[error("Invalid OAuth signature")]
    InvalidSignature,
    /// The request body does not match `oauth_body_hash`.
    #[error("OAuth body hash mismatch")]
    BodyHashMismatch,
    /// A required protocol parameter is absent.
    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),
    /// No LTI instance is configured.
    #[error("No LTI instances are available")]
    NoInstances,
    /// Group based load balancing needs a user group.
    #[error("User '{username}' has no group id for group based load balancing")]
    MissingGroupId {
        /// The user without a group.
        username: String,
    },
    /// The load balancing strategy name is unknown.
    #[error("Unknown load balancing strategy '{0}'")]
    InvalidStrategy(String),
    /// The LTI version is unknown.
    #[error("Unsupported LTI version '{0}'")]
    InvalidVersion(String),
    /// The outcome XML could not be read.
    #[error("Malformed outcome request: {0}")]
    MalformedOutcome(String),
    /// A JWT could not be issued or validated.
    #[error("Token error: {0}")]
    Token(String),
    /// The signing key was rejected.
    #[error("Signing key error: {0}")]
    SigningKey(String),
}
