// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Result cache warm-up.
//!
//! User entries are refreshed page by page over the whole user table, so
//! several workers can split the work with `--modulo`/`--remainder`.

use num_traits::ToPrimitive;
use simple_roster::{BatchSize, ResultCache};
use simple_roster_domain::LineItem;
use simple_roster_persistence::{Persistence, UserFilter, UserShard, cache};
use tracing::{debug, info};

use crate::error::ApiError;

/// Options of the user warm-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWarmupOptions {
    /// Only these usernames (empty means all).
    pub usernames: Vec<String>,
    /// Only users assigned to these line items (empty means all).
    pub line_item_slugs: Vec<String>,
    /// Euclidean sharding as `(modulo, remainder)`.
    pub shard: Option<(i64, i64)>,
    /// Users loaded per page.
    pub batch: BatchSize,
}

/// Outcome of a warm-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Entries refreshed.
    pub warmed: usize,
    /// Entries whose source row had disappeared.
    pub missing: usize,
}

impl WarmupReport {
    /// Renders the operator facing summary line.
    #[must_use]
    pub fn summary(&self, noun: &str) -> String {
        if self.warmed == 0 && self.missing == 0 {
            return format!("Nothing to warm up, no {noun} found");
        }
        format!(
            "[OK] {} {noun} cache entries have been successfully warmed up",
            self.warmed
        )
    }

    const fn record(&mut self, warmed: bool) {
        if warmed {
            self.warmed += 1;
        } else {
            self.missing += 1;
        }
    }
}

/// Validates `--modulo` and `--remainder`.
///
/// # Errors
///
/// Returns an error if only one of them is given, `modulo` is below one,
/// or `remainder` is outside `0..modulo`.
pub fn parse_shard(
    modulo: Option<i64>,
    remainder: Option<i64>,
) -> Result<Option<UserShard>, ApiError> {
    match (modulo, remainder) {
        (None, None) => Ok(None),
        (Some(modulo), Some(remainder)) => UserShard::new(modulo, remainder)
            .map(Some)
            .ok_or_else(|| ApiError::InvalidInput {
                field: String::from("remainder"),
                message: format!(
                    "remainder must satisfy 0 <= remainder < modulo, got modulo {modulo} and remainder {remainder}"
                ),
            }),
        (Some(_), None) => Err(ApiError::InvalidInput {
            field: String::from("remainder"),
            message: String::from("--modulo requires --remainder"),
        }),
        (None, Some(_)) => Err(ApiError::InvalidInput {
            field: String::from("modulo"),
            message: String::from("--remainder requires --modulo"),
        }),
    }
}

/// Resolves line item slugs to ids.
///
/// # Errors
///
/// Returns an error naming the first unknown slug.
pub fn resolve_line_item_slugs(
    persistence: &mut Persistence,
    slugs: &[String],
) -> Result<Vec<i64>, ApiError> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let found: Vec<LineItem> = persistence.list_line_items_by_slugs(slugs)?;
    if let Some(missing) = slugs
        .iter()
        .find(|slug| !found.iter().any(|item| &item.slug == *slug))
    {
        return Err(ApiError::ResourceNotFound {
            resource_type: String::from("LineItem"),
            message: format!("Line item '{missing}' does not exist"),
        });
    }
    Ok(found.iter().map(|item| item.id).collect())
}

/// Refreshes the cached assignments of every matching user.
///
/// # Errors
///
/// Returns an error if the options are invalid or the database fails.
pub fn warm_up_users(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    options: &UserWarmupOptions,
) -> Result<WarmupReport, ApiError> {
    let shard: Option<UserShard> = match options.shard {
        Some((modulo, remainder)) => parse_shard(Some(modulo), Some(remainder))?,
        None => None,
    };
    let filter: UserFilter = UserFilter {
        usernames: options.usernames.clone(),
        line_item_ids: resolve_line_item_slugs(persistence, &options.line_item_slugs)?,
        shard,
    };
    let limit: i64 = options.batch.get().to_i64().unwrap_or(i64::MAX);

    let mut report: WarmupReport = WarmupReport::default();
    let mut after_id: i64 = 0;
    loop {
        let (usernames, next): (Vec<(i64, String)>, Option<i64>) =
            persistence.list_users_page(&filter, after_id, limit)?;

        for (_, username) in &usernames {
            report.record(cache::warm_user(persistence, result_cache, username)?);
        }
        debug!(page = usernames.len(), after_id, "Warmed user page");

        match next {
            Some(last_id) => {
                after_id = last_id;
                info!(warmed = report.warmed, "Users warmed so far");
            }
            None => break,
        }
    }

    Ok(report)
}

/// Refreshes the cached line items, all of them when `ids` is empty.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn warm_up_line_items(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
    ids: &[i64],
) -> Result<WarmupReport, ApiError> {
    let ids: Vec<i64> = if ids.is_empty() {
        persistence
            .list_line_items()?
            .iter()
            .map(|item| item.id)
            .collect()
    } else {
        ids.to_vec()
    };

    let mut report: WarmupReport = WarmupReport::default();
    for line_item_id in ids {
        report.record(cache::warm_line_item(
            persistence,
            result_cache,
            line_item_id,
        )?);
    }
    Ok(report)
}

/// Refreshes the cached LTI instance list.
///
/// # Errors
///
/// Returns an error if the database fails.
pub fn warm_up_lti_instances(
    persistence: &mut Persistence,
    result_cache: &dyn ResultCache,
) -> Result<WarmupReport, ApiError> {
    let count: usize = persistence.list_lti_instances()?.len();
    cache::warm_lti_instances(persistence, result_cache)?;
    Ok(WarmupReport {
        warmed: count,
        missing: 0,
    })
}
