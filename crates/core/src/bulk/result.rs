// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use serde::Serialize;
use std::collections::BTreeMap;

/// Per-identifier outcome of one `process()` call.
///
/// `applied` is only set once the batch has been committed, so successes
/// reported in a rolled back or dry run batch were never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    applied: bool,
    results: BTreeMap<String, bool>,
}

impl BulkResult {
    /// Creates an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            applied: false,
            results: BTreeMap::new(),
        }
    }

    /// Records a successful operation.
    pub fn add_success(&mut self, identifier: &str) {
        self.results.insert(identifier.to_string(), true);
    }

    /// Records a failed operation.
    pub fn add_failure(&mut self, identifier: &str) {
        self.results.insert(identifier.to_string(), false);
    }

    /// Returns whether at least one operation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.results.values().any(|success| !success)
    }

    /// Returns whether the batch was committed.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.applied
    }

    pub(crate) const fn mark_applied(&mut self) {
        self.applied = true;
    }

    /// Returns the outcome of a single identifier, if it was processed.
    #[must_use]
    pub fn outcome(&self, identifier: &str) -> Option<bool> {
        self.results.get(identifier).copied()
    }

    /// Returns all outcomes ordered by identifier.
    #[must_use]
    pub const fn results(&self) -> &BTreeMap<String, bool> {
        &self.results
    }

    /// Returns the number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Counts the successful outcomes.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.values().filter(|success| **success).count()
    }

    /// Counts the failed outcomes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }
}
