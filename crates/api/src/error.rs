// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use simple_roster::CoreError;
use simple_roster_domain::DomainError;
use simple_roster_lti::LtiError;
use simple_roster_persistence::PersistenceError;

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials or a token were rejected.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The caller is authenticated but may not perform the action.
    Unauthorized {
        /// The action that was attempted.
        action: String,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized { action } => write!(f, "Unauthorized: '{action}'"),
        }
    }
}

impl std::error::Error for AuthError {}

/// API-level errors.
///
/// These are distinct from domain/core errors and represent the API contract.
/// Each variant maps onto exactly one HTTP status at the server edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed.
    Unauthorized {
        /// The action that was attempted.
        action: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// The resource exists but is not in a state that allows the request.
    Conflict {
        /// A human-readable description of the conflict.
        message: String,
    },
    /// The request carries more items than allowed.
    PayloadTooLarge {
        /// The number of items received.
        received: usize,
        /// The maximum number of items.
        limit: usize,
    },
    /// A domain rule was violated.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized { action } => write!(f, "Unauthorized: '{action}'"),
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Conflict { message } => write!(f, "Conflict: {message}"),
            Self::PayloadTooLarge { received, limit } => {
                write!(
                    f,
                    "Request contains {received} items, the limit is {limit}"
                )
            }
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::Unauthorized { action } => Self::Unauthorized { action },
        }
    }
}

/// Translates a domain error into an API error.
///
/// Availability problems are conflicts with the current state; malformed
/// values are invalid input; everything else is a rule violation.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidUsername(message) => ApiError::InvalidInput {
            field: String::from("username"),
            message,
        },
        DomainError::InvalidField { field, reason } => ApiError::InvalidInput {
            field,
            message: reason,
        },
        DomainError::InvalidMaxAttempts(_) => ApiError::InvalidInput {
            field: String::from("maxAttempts"),
            message: err.to_string(),
        },
        DomainError::InvalidTimestamp { .. } | DomainError::InvalidDateWindow { .. } => {
            ApiError::InvalidInput {
                field: String::from("date"),
                message: err.to_string(),
            }
        }
        DomainError::InvalidAssignmentState(_) => ApiError::InvalidInput {
            field: String::from("state"),
            message: err.to_string(),
        },
        DomainError::LineItemUnavailable { .. }
        | DomainError::AssignmentUnavailable { .. }
        | DomainError::MaxAttemptsReached { .. } => ApiError::Conflict {
            message: err.to_string(),
        },
        DomainError::InvalidStateTransition { .. } => ApiError::DomainRuleViolation {
            rule: String::from("assignment_state_transition"),
            message: err.to_string(),
        },
        DomainError::LineItemMismatch { .. } => ApiError::DomainRuleViolation {
            rule: String::from("assignment_line_item"),
            message: err.to_string(),
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

/// Translates a core error into an API error.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::InvalidBatchSize(size) => ApiError::InvalidInput {
            field: String::from("batch"),
            message: format!("Batch size must be greater than zero, got {size}"),
        },
        CoreError::Store(_)
        | CoreError::UnsupportedOperationType { .. }
        | CoreError::MissingAttribute { .. } => ApiError::Internal {
            message: err.to_string(),
        },
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        translate_core_error(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(message) => Self::ResourceNotFound {
                resource_type: String::from("Resource"),
                message,
            },
            PersistenceError::UniqueViolation(message) => Self::Conflict { message },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Translates an LTI protocol error into an API error.
///
/// Signature and token problems are authentication failures.
#[must_use]
pub fn translate_lti_error(err: LtiError) -> ApiError {
    match err {
        LtiError::InvalidSignature
        | LtiError::BodyHashMismatch
        | LtiError::MissingParameter(_)
        | LtiError::Token(_) => ApiError::AuthenticationFailed {
            reason: err.to_string(),
        },
        LtiError::MalformedOutcome(_) => ApiError::InvalidInput {
            field: String::from("body"),
            message: err.to_string(),
        },
        LtiError::InvalidStrategy(_) | LtiError::InvalidVersion(_) => ApiError::InvalidInput {
            field: String::from("lti"),
            message: err.to_string(),
        },
        LtiError::NoInstances | LtiError::MissingGroupId { .. } | LtiError::SigningKey(_) => {
            ApiError::Internal {
                message: err.to_string(),
            }
        }
    }
}

impl From<LtiError> for ApiError {
    fn from(err: LtiError) -> Self {
        translate_lti_error(err)
    }
}

/// Errors raised while reading a CSV source or running a batch command.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Only local files can be read.
    #[error("Unsupported storage '{0}', only 'local' is available")]
    UnsupportedStorage(String),
    /// The delimiter is not a single byte.
    #[error("Invalid delimiter '{0}', expected a single ASCII character")]
    InvalidDelimiter(String),
    /// The source file could not be opened.
    #[error("Cannot read '{path}': {source}")]
    Open {
        /// The path that was opened.
        path: String,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },
    /// A CSV record could not be read.
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    /// A required column is absent from the header.
    #[error("Column '{column}' is not set in source file")]
    MissingColumn {
        /// The column name.
        column: String,
    },
    /// A required value is empty.
    #[error("Line {line}: column '{column}' cannot be empty")]
    EmptyValue {
        /// The 1-based line number.
        line: u64,
        /// The column name.
        column: String,
    },
    /// A row failed validation.
    #[error("Line {line}: {message}")]
    InvalidRow {
        /// The 1-based line number.
        line: u64,
        /// Description of the problem.
        message: String,
    },
    /// A row references a user that does not exist.
    #[error("Line {line}: user '{username}' does not exist")]
    UnknownUser {
        /// The 1-based line number.
        line: u64,
        /// The username.
        username: String,
    },
    /// A row references a line item that does not exist.
    #[error("Line {line}: line item '{slug}' does not exist")]
    UnknownLineItem {
        /// The 1-based line number.
        line: u64,
        /// The slug.
        slug: String,
    },
    /// An option was rejected before any processing.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Batch processing failed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The database failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
