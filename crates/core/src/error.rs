// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use simple_roster_domain::DomainError;

use crate::bulk::BulkOperationType;
use crate::store::StoreError;

/// Errors that can occur while processing bulk operations and batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The persistence collaborator failed.
    Store(StoreError),
    /// A batch size below one was requested.
    InvalidBatchSize(i64),
    /// An operation was handed to a processor that does not handle its type.
    UnsupportedOperationType {
        /// The operation identifier.
        identifier: String,
        /// The type that was received.
        received: BulkOperationType,
        /// The type the processor handles.
        expected: BulkOperationType,
    },
    /// An operation is missing a required attribute.
    MissingAttribute {
        /// The operation identifier.
        identifier: String,
        /// The attribute name.
        attribute: String,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::Store(err) => write!(f, "Persistence failure: {err}"),
            Self::InvalidBatchSize(size) => {
                write!(f, "Batch size must be greater than zero, got {size}")
            }
            Self::UnsupportedOperationType {
                identifier,
                received,
                expected,
            } => write!(
                f,
                "Operation '{identifier}' has type {received}, expected {expected}"
            ),
            Self::MissingAttribute {
                identifier,
                attribute,
            } => write!(
                f,
                "Operation '{identifier}' is missing the '{attribute}' attribute"
            ),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
