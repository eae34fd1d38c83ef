// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use simple_roster::CoreError;
use simple_roster_api::{ApiError, IngestError};

/// Errors that end a console command with exit code 1.
#[derive(Debug)]
pub enum CommandError {
    /// An option or a service call was rejected.
    Api(ApiError),
    /// A CSV import or bulk command failed.
    Ingest(IngestError),
    /// A date option could not be parsed.
    InvalidDate {
        /// The option name.
        option: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api(err) => write!(f, "{err}"),
            Self::Ingest(err) => write!(f, "{err}"),
            Self::InvalidDate { option, value } => write!(
                f,
                "--{option} '{value}' is not a valid date, expected YYYY-MM-DD or RFC 3339"
            ),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(err) => Some(err),
            Self::Ingest(err) => Some(err),
            Self::InvalidDate { .. } => None,
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<IngestError> for CommandError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        Self::Api(ApiError::from(err))
    }
}
