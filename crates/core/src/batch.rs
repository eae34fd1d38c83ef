// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Fixed-size batching of record streams.

use std::num::NonZeroUsize;
use std::str::FromStr;

use tracing::debug;

use crate::error::CoreError;

/// A validated batch size of at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// Validates a batch size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBatchSize`] if `value` is zero or negative.
    pub fn new(value: i64) -> Result<Self, CoreError> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(CoreError::InvalidBatchSize(value))
    }

    /// Returns the size.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl FromStr for BatchSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not an integer"))?;
        Self::new(value).map_err(|err| err.to_string())
    }
}

/// Summary of one batched run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records read from the source.
    pub processed: usize,
    /// Batches handed to the flush callback.
    pub flushed_batches: usize,
    /// Whether persistence was suppressed.
    pub dry_run: bool,
}

impl BatchReport {
    /// Renders the operator facing summary line.
    #[must_use]
    pub fn summary(&self, noun: &str) -> String {
        if self.dry_run {
            format!("[DRY RUN] {} {noun} would be processed", self.processed)
        } else if self.processed == 0 {
            format!("Nothing to process, no {noun} found")
        } else {
            format!(
                "[OK] {} {noun} have been successfully processed",
                self.processed
            )
        }
    }
}

/// Streams records into batches of `batch_size` and hands each full batch,
/// then the remainder, to `flush`.
///
/// Every record is validated by the source before it is counted; the first
/// error aborts the run. In dry run mode records are counted but `flush` is
/// never called. `progress` receives the running total once per batch.
///
/// # Errors
///
/// Returns the first error produced by the source or by `flush`.
pub fn process_in_batches<T, E, I, F, P>(
    records: I,
    batch_size: BatchSize,
    dry_run: bool,
    mut flush: F,
    mut progress: P,
) -> Result<BatchReport, E>
where
    I: IntoIterator<Item = Result<T, E>>,
    F: FnMut(Vec<T>) -> Result<(), E>,
    P: FnMut(usize),
{
    let size: usize = batch_size.get();
    let mut report: BatchReport = BatchReport {
        dry_run,
        ..BatchReport::default()
    };
    let mut buffer: Vec<T> = Vec::with_capacity(size);

    for record in records {
        buffer.push(record?);
        report.processed += 1;

        if buffer.len() >= size {
            let batch: Vec<T> = std::mem::replace(&mut buffer, Vec::with_capacity(size));
            if !dry_run {
                flush(batch)?;
                report.flushed_batches += 1;
            }
            debug!(processed = report.processed, "Batch complete");
            progress(report.processed);
        }
    }

    if !buffer.is_empty() {
        if !dry_run {
            flush(buffer)?;
            report.flushed_batches += 1;
        }
        progress(report.processed);
    }

    Ok(report)
}
