// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Post-commit hooks.
//!
//! Hooks run after a transaction commits, or after a mutation that committed
//! on its own. They see which users, line items and LTI instances were
//! written and may read
//! through the same [`Persistence`] adapter. A failing hook is logged and
//! never undoes or fails the committed write.

use std::collections::BTreeSet;
use std::sync::Arc;

use simple_roster::ResultCache;
use tracing::debug;

use crate::Persistence;
use crate::cache::{warm_line_item, warm_lti_instances, warm_user};
use crate::error::PersistenceError;

/// Entities written by a committed unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedEntities {
    /// Ids of users whose assignments changed.
    pub user_ids: BTreeSet<i64>,
    /// Ids of line items that changed.
    pub line_item_ids: BTreeSet<i64>,
    /// Whether the LTI instance list changed.
    pub lti_instances: bool,
}

impl TouchedEntities {
    /// Touched users only.
    #[must_use]
    pub fn users<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            user_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Touched line items only.
    #[must_use]
    pub fn line_items<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            line_item_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// The LTI instance list only.
    #[must_use]
    pub fn lti_instances() -> Self {
        Self {
            lti_instances: true,
            ..Self::default()
        }
    }

    /// Returns whether nothing was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty() && self.line_item_ids.is_empty() && !self.lti_instances
    }

    /// Adds everything touched by `other`.
    pub fn merge(&mut self, other: Self) {
        self.user_ids.extend(other.user_ids);
        self.line_item_ids.extend(other.line_item_ids);
        self.lti_instances |= other.lti_instances;
    }
}

/// A callback invoked after a successful commit.
pub trait PostCommitHook: Send + Sync {
    /// Reacts to committed changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the hook's own work fails. The caller logs it.
    fn after_commit(
        &self,
        persistence: &mut Persistence,
        touched: &TouchedEntities,
    ) -> Result<(), PersistenceError>;
}

/// Refreshes the cached user, line item and LTI instance entries after a
/// commit.
pub struct ResultCacheHook {
    cache: Arc<dyn ResultCache>,
}

impl ResultCacheHook {
    /// Creates a hook that refreshes entries in `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn ResultCache>) -> Self {
        Self { cache }
    }
}

impl PostCommitHook for ResultCacheHook {
    fn after_commit(
        &self,
        persistence: &mut Persistence,
        touched: &TouchedEntities,
    ) -> Result<(), PersistenceError> {
        for user_id in &touched.user_ids {
            if let Some(user) = persistence.get_user_by_id(*user_id)? {
                warm_user(persistence, self.cache.as_ref(), &user.username)?;
            }
        }

        for line_item_id in &touched.line_item_ids {
            warm_line_item(persistence, self.cache.as_ref(), *line_item_id)?;
        }

        if touched.lti_instances {
            warm_lti_instances(persistence, self.cache.as_ref())?;
        }

        debug!(
            users = touched.user_ids.len(),
            line_items = touched.line_item_ids.len(),
            lti_instances = touched.lti_instances,
            "Result cache refreshed after commit"
        );
        Ok(())
    }
}
