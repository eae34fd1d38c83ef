// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::str::FromStr;

use simple_roster_domain::{LineItem, LtiInstance, User};

use crate::error::LtiError;

/// How users are spread across LTI instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadBalancingStrategy {
    /// Hash the username.
    #[default]
    Username,
    /// Hash the user's group so a whole group lands on one instance.
    UserGroupId,
}

impl LoadBalancingStrategy {
    /// Returns the configuration name of the strategy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::UserGroupId => "userGroupId",
        }
    }
}

impl FromStr for LoadBalancingStrategy {
    type Err = LtiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "username" => Ok(Self::Username),
            "userGroupId" => Ok(Self::UserGroupId),
            other => Err(LtiError::InvalidStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Picks an LTI instance for a user with a stable `crc32(key) % n` mapping.
///
/// The same key always resolves to the same instance for a fixed
/// instance list, so repeated launches keep their session affinity.
#[derive(Debug, Clone, Copy)]
pub struct LtiInstanceLoadBalancer<'a> {
    strategy: LoadBalancingStrategy,
    instances: &'a [LtiInstance],
}

impl<'a> LtiInstanceLoadBalancer<'a> {
    /// Creates a balancer over `instances`, which must be in a stable order.
    #[must_use]
    pub const fn new(strategy: LoadBalancingStrategy, instances: &'a [LtiInstance]) -> Self {
        Self {
            strategy,
            instances,
        }
    }

    /// Returns the key hashed for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if group balancing is used and the user has no group.
    pub fn balancing_key<'u>(&self, user: &'u User) -> Result<&'u str, LtiError> {
        match self.strategy {
            LoadBalancingStrategy::Username => Ok(&user.username),
            LoadBalancingStrategy::UserGroupId => {
                user.group_id
                    .as_deref()
                    .ok_or_else(|| LtiError::MissingGroupId {
                        username: user.username.clone(),
                    })
            }
        }
    }

    /// Selects the instance for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if no instance exists or the balancing key is missing.
    pub fn instance_for(&self, user: &User) -> Result<&'a LtiInstance, LtiError> {
        let key: &str = self.balancing_key(user)?;
        select_by_key(self.instances, key)
    }

    /// Returns the LTI `context_id` for a launch.
    ///
    /// Username balancing uses the line item id, group balancing uses the
    /// group id so the tool can recognise a group session.
    ///
    /// # Errors
    ///
    /// Returns an error if group balancing is used and the user has no group.
    pub fn context_id(&self, user: &User, line_item: &LineItem) -> Result<String, LtiError> {
        match self.strategy {
            LoadBalancingStrategy::Username => Ok(line_item.id.to_string()),
            LoadBalancingStrategy::UserGroupId => self.balancing_key(user).map(str::to_string),
        }
    }
}

/// Maps `key` onto one of `instances`.
///
/// # Errors
///
/// Returns [`LtiError::NoInstances`] when `instances` is empty.
pub fn select_by_key<'a>(
    instances: &'a [LtiInstance],
    key: &str,
) -> Result<&'a LtiInstance, LtiError> {
    if instances.is_empty() {
        return Err(LtiError::NoInstances);
    }
    let hash: usize = usize::try_from(crc32fast::hash(key.as_bytes())).unwrap_or(usize::MAX);
    Ok(&instances[hash % instances.len()])
}
