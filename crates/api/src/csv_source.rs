// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! CSV sources for the ingestion and bulk commands.
//!
//! Headers are matched case-insensitively after trimming. Required columns
//! are checked once against the header before any row is read.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::rc::Rc;

use csv::{Reader, ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::IngestError;

/// The only storage backend available to the console.
pub const LOCAL_STORAGE: &str = "local";

/// Normalizes a CSV header for case-insensitive, whitespace-tolerant matching.
fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Parses a `--delimiter` option.
///
/// # Errors
///
/// Returns an error unless the value is exactly one ASCII character.
pub fn parse_delimiter(value: &str) -> Result<u8, IngestError> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(IngestError::InvalidDelimiter(value.to_string())),
    }
}

/// An opened CSV file with a validated header.
pub struct CsvSource {
    reader: Reader<File>,
    columns: Rc<HashMap<String, usize>>,
}

impl std::fmt::Debug for CsvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSource")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl CsvSource {
    /// Opens `path` from `storage` and checks that every column of
    /// `required` is present in the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage is not `local`, the file cannot be
    /// read, or a required column is missing.
    pub fn open(
        path: &Path,
        storage: &str,
        delimiter: u8,
        required: &[&str],
    ) -> Result<Self, IngestError> {
        if storage != LOCAL_STORAGE {
            return Err(IngestError::UnsupportedStorage(storage.to_string()));
        }

        let mut reader: Reader<File> = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| IngestError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let headers: &StringRecord = reader.headers()?;
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, header)| (normalize_header(header), index))
            .collect();

        if let Some(missing) = required
            .iter()
            .find(|column| !columns.contains_key(&normalize_header(column)))
        {
            return Err(IngestError::MissingColumn {
                column: (*missing).to_string(),
            });
        }

        debug!(path = %path.display(), columns = columns.len(), "Opened CSV source");
        Ok(Self {
            reader,
            columns: Rc::new(columns),
        })
    }

    /// Returns whether the header contains `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(&normalize_header(column))
    }

    /// Streams the data rows.
    pub fn rows(self) -> impl Iterator<Item = Result<CsvRow, IngestError>> {
        let columns: Rc<HashMap<String, usize>> = self.columns;
        self.reader.into_records().map(move |record| {
            let record: StringRecord = record?;
            let line: u64 = record.position().map_or(0, csv::Position::line);
            Ok(CsvRow {
                line,
                record,
                columns: Rc::clone(&columns),
            })
        })
    }
}

/// One data row of a [`CsvSource`].
#[derive(Debug, Clone)]
pub struct CsvRow {
    line: u64,
    record: StringRecord,
    columns: Rc<HashMap<String, usize>>,
}

impl CsvRow {
    /// The 1-based line number in the file.
    #[must_use]
    pub const fn line(&self) -> u64 {
        self.line
    }

    /// Returns a value that must be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is unknown or the value is empty.
    pub fn required(&self, column: &str) -> Result<&str, IngestError> {
        self.optional(column).ok_or_else(|| IngestError::EmptyValue {
            line: self.line,
            column: column.to_string(),
        })
    }

    /// Returns a value, or `None` when the column is absent or empty.
    #[must_use]
    pub fn optional(&self, column: &str) -> Option<&str> {
        self.columns
            .get(&normalize_header(column))
            .and_then(|&index| self.record.get(index))
            .filter(|value| !value.is_empty())
    }

    /// Wraps a validation message with the row's line number.
    #[must_use]
    pub fn invalid(&self, message: impl std::fmt::Display) -> IngestError {
        IngestError::InvalidRow {
            line: self.line,
            message: message.to_string(),
        }
    }
}
