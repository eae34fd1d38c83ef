// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Runtime configuration shared by the server and the console.
//!
//! Both binaries flatten [`RosterArgs`] and [`DatabaseArgs`] into their own
//! clap parsers, so every option can also be given through the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use simple_roster::{InMemoryResultCache, ResultCache};
use simple_roster_lti::{LaunchSettings, Lti1p3Settings, LoadBalancingStrategy, LtiVersion};
use simple_roster_persistence::Persistence;
use tracing::info;

use crate::error::{ApiError, translate_lti_error};

/// JWT settings for user sessions.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// HS256 signing secret.
    pub secret: String,
    /// Lifetime of access tokens.
    pub access_token_ttl_secs: i64,
    /// Lifetime of refresh tokens.
    pub refresh_token_ttl_secs: i64,
    /// The `iss` claim of issued tokens.
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// LTI launch and outcome settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtiConfig {
    /// Protocol version used for launches.
    pub version: LtiVersion,
    /// How users are spread across instances.
    pub load_balancing_strategy: LoadBalancingStrategy,
    /// LTI 1.1 launch parameters.
    pub launch: LaunchSettings,
    /// LTI 1.3 platform settings.
    pub lti1p3: Lti1p3Settings,
}

/// Credentials accepted by the update-line-items web hook.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookCredentials {
    /// Basic auth user.
    pub username: String,
    /// Basic auth password.
    pub password: String,
}

impl std::fmt::Debug for WebhookCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Where result cache entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// The `result_cache` table, shared by every process using the database.
    Database,
    /// Process memory. Other processes never see these entries.
    Memory,
}

impl FromStr for CacheBackend {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "database" => Ok(Self::Database),
            "memory" => Ok(Self::Memory),
            other => Err(ApiError::InvalidInput {
                field: String::from("cache-backend"),
                message: format!("expected 'database' or 'memory', got '{other}'"),
            }),
        }
    }
}

/// The full runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Session tokens.
    pub jwt: JwtConfig,
    /// LTI launches and outcomes.
    pub lti: LtiConfig,
    /// Key expected in the `X-Api-Key` header of the bulk endpoints.
    pub app_api_key: String,
    /// Basic auth credentials of the web hook.
    pub webhook: WebhookCredentials,
    /// Where result cache entries are kept.
    pub cache_backend: CacheBackend,
    /// Result cache entry lifetime; `0` keeps entries until invalidated.
    pub cache_ttl_secs: u64,
    /// Bcrypt cost used when importing users.
    pub password_hash_cost: u32,
    /// Age after which a `started` assignment is garbage collected.
    pub assignment_stuck_threshold_secs: i64,
}

impl std::fmt::Debug for RosterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterConfig")
            .field("jwt", &self.jwt)
            .field("lti", &self.lti)
            .field("webhook", &self.webhook)
            .field("cache_backend", &self.cache_backend)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("password_hash_cost", &self.password_hash_cost)
            .field(
                "assignment_stuck_threshold_secs",
                &self.assignment_stuck_threshold_secs,
            )
            .finish_non_exhaustive()
    }
}

impl RosterConfig {
    /// Creates the result cache described by `cache_backend` and
    /// `cache_ttl_secs`.
    ///
    /// The database backend stores entries next to the roster data in
    /// `persistence`'s database, where the server and console share them.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache connection cannot be opened.
    pub fn build_cache(&self, persistence: &Persistence) -> Result<Arc<dyn ResultCache>, ApiError> {
        let ttl: Option<Duration> =
            (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs));
        let cache: Arc<dyn ResultCache> = match self.cache_backend {
            CacheBackend::Database => Arc::new(persistence.open_result_cache(ttl)?),
            CacheBackend::Memory => Arc::new(
                ttl.map_or_else(InMemoryResultCache::new, InMemoryResultCache::with_ttl),
            ),
        };
        info!(backend = ?self.cache_backend, ttl = ?ttl, "Result cache ready");
        Ok(cache)
    }

    /// Checks the secrets needed to serve HTTP traffic.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first secret that is empty.
    pub fn require_http_secrets(&self) -> Result<(), ApiError> {
        let required: [(&str, &str); 4] = [
            ("jwt-secret", self.jwt.secret.as_str()),
            ("app-api-key", self.app_api_key.as_str()),
            ("webhook-username", self.webhook.username.as_str()),
            ("webhook-password", self.webhook.password.as_str()),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput {
                    field: field.to_string(),
                    message: String::from("must be configured"),
                });
            }
        }

        if self.lti.version == LtiVersion::V1p3 && self.lti.lti1p3.platform_secret.is_empty() {
            return Err(ApiError::InvalidInput {
                field: String::from("lti1p3-platform-secret"),
                message: String::from("must be configured for LTI 1.3"),
            });
        }

        Ok(())
    }
}

/// Command line and environment options that build a [`RosterConfig`].
#[derive(clap::Args, Debug, Clone)]
pub struct RosterArgs {
    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", default_value = "", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "JWT_ACCESS_TOKEN_TTL", default_value_t = 3600)]
    pub jwt_access_token_ttl: i64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "JWT_REFRESH_TOKEN_TTL", default_value_t = 86400)]
    pub jwt_refresh_token_ttl: i64,

    /// Issuer claim of session tokens
    #[arg(long, env = "JWT_ISSUER", default_value = "simple-roster")]
    pub jwt_issuer: String,

    /// LTI version used for launches (1.1 or 1.3)
    #[arg(long, env = "LTI_VERSION", default_value = "1.1")]
    pub lti_version: String,

    /// LTI load balancing strategy (username or userGroupId)
    #[arg(long, env = "LTI_INSTANCE_LOAD_BALANCING_STRATEGY", default_value = "username")]
    pub lti_load_balancing_strategy: String,

    /// Where the delivery sends the user after the test
    #[arg(long, env = "LTI_LAUNCH_PRESENTATION_RETURN_URL", default_value = "")]
    pub lti_launch_presentation_return_url: String,

    /// Locale passed to the delivery
    #[arg(long, env = "LTI_LAUNCH_PRESENTATION_LOCALE", default_value = "en-EN")]
    pub lti_launch_presentation_locale: String,

    /// Public URL of the LTI 1.1 outcome endpoint
    #[arg(long, env = "LTI_OUTCOME_SERVICE_URL", default_value = "")]
    pub lti_outcome_service_url: String,

    /// LTI 1.3 platform issuer
    #[arg(long, env = "LTI1P3_PLATFORM_ISSUER", default_value = "")]
    pub lti1p3_platform_issuer: String,

    /// LTI 1.3 tool client id
    #[arg(long, env = "LTI1P3_CLIENT_ID", default_value = "")]
    pub lti1p3_client_id: String,

    /// LTI 1.3 deployment id
    #[arg(long, env = "LTI1P3_DEPLOYMENT_ID", default_value = "1")]
    pub lti1p3_deployment_id: String,

    /// LTI 1.3 tool OIDC login initiation URL
    #[arg(long, env = "LTI1P3_OIDC_INITIATION_URL", default_value = "")]
    pub lti1p3_oidc_initiation_url: String,

    /// LTI 1.3 shared platform secret
    #[arg(long, env = "LTI1P3_PLATFORM_SECRET", default_value = "", hide_env_values = true)]
    pub lti1p3_platform_secret: String,

    /// LTI 1.3 token lifetime in seconds
    #[arg(long, env = "LTI1P3_TOKEN_TTL", default_value_t = 3600)]
    pub lti1p3_token_ttl: i64,

    /// API key of the bulk assignment endpoints
    #[arg(long, env = "APP_API_KEY", default_value = "", hide_env_values = true)]
    pub app_api_key: String,

    /// Basic auth user of the web hook
    #[arg(long, env = "WEBHOOK_BASIC_AUTH_USERNAME", default_value = "")]
    pub webhook_username: String,

    /// Basic auth password of the web hook
    #[arg(long, env = "WEBHOOK_BASIC_AUTH_PASSWORD", default_value = "", hide_env_values = true)]
    pub webhook_password: String,

    /// Result cache storage (database or memory)
    #[arg(long, env = "CACHE_BACKEND", default_value = "database")]
    pub cache_backend: String,

    /// Result cache lifetime in seconds (0 disables expiry)
    #[arg(long, env = "CACHE_TTL", default_value_t = 0)]
    pub cache_ttl: u64,

    /// Bcrypt cost for imported passwords
    #[arg(long, env = "PASSWORD_HASH_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub password_hash_cost: u32,

    /// Seconds after which a started assignment is considered stuck
    #[arg(long, env = "ASSIGNMENT_STUCK_THRESHOLD", default_value_t = 86400)]
    pub assignment_stuck_threshold: i64,
}

impl RosterArgs {
    /// Validates the options and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the LTI version, strategy or cache backend is
    /// unknown, the bcrypt cost is out of range, or a lifetime is not
    /// positive.
    pub fn into_config(self) -> Result<RosterConfig, ApiError> {
        let version: LtiVersion = self.lti_version.parse().map_err(translate_lti_error)?;
        let load_balancing_strategy: LoadBalancingStrategy = self
            .lti_load_balancing_strategy
            .parse()
            .map_err(translate_lti_error)?;
        let cache_backend: CacheBackend = self.cache_backend.parse()?;

        if !(4..=31).contains(&self.password_hash_cost) {
            return Err(ApiError::InvalidInput {
                field: String::from("password-hash-cost"),
                message: format!(
                    "bcrypt cost must be between 4 and 31, got {}",
                    self.password_hash_cost
                ),
            });
        }

        for (field, value) in [
            ("jwt-access-token-ttl", self.jwt_access_token_ttl),
            ("jwt-refresh-token-ttl", self.jwt_refresh_token_ttl),
            ("lti1p3-token-ttl", self.lti1p3_token_ttl),
            ("assignment-stuck-threshold", self.assignment_stuck_threshold),
        ] {
            if value <= 0 {
                return Err(ApiError::InvalidInput {
                    field: field.to_string(),
                    message: format!("must be greater than zero, got {value}"),
                });
            }
        }

        Ok(RosterConfig {
            jwt: JwtConfig {
                secret: self.jwt_secret,
                access_token_ttl_secs: self.jwt_access_token_ttl,
                refresh_token_ttl_secs: self.jwt_refresh_token_ttl,
                issuer: self.jwt_issuer,
            },
            lti: LtiConfig {
                version,
                load_balancing_strategy,
                launch: LaunchSettings {
                    launch_presentation_return_url: self.lti_launch_presentation_return_url,
                    launch_presentation_locale: self.lti_launch_presentation_locale,
                    outcome_service_url: self.lti_outcome_service_url,
                },
                lti1p3: Lti1p3Settings {
                    platform_issuer: self.lti1p3_platform_issuer,
                    client_id: self.lti1p3_client_id,
                    deployment_id: self.lti1p3_deployment_id,
                    oidc_initiation_url: self.lti1p3_oidc_initiation_url,
                    platform_secret: self.lti1p3_platform_secret,
                    token_ttl_secs: self.lti1p3_token_ttl,
                },
            },
            app_api_key: self.app_api_key,
            webhook: WebhookCredentials {
                username: self.webhook_username,
                password: self.webhook_password,
            },
            cache_backend,
            cache_ttl_secs: self.cache_ttl,
            password_hash_cost: self.password_hash_cost,
            assignment_stuck_threshold_secs: self.assignment_stuck_threshold,
        })
    }
}

/// Database selection options.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long, env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// `MySQL`/`MariaDB` connection URL; takes precedence over `--database`
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub mysql_url: Option<String>,
}

impl DatabaseArgs {
    /// Opens the selected database and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, or a `MySQL` URL is
    /// given to a build without the `mysql` feature.
    pub fn open(&self) -> Result<Persistence, ApiError> {
        if let Some(url) = &self.mysql_url {
            return open_mysql(url);
        }

        if let Some(path) = &self.database {
            info!(path = %path.display(), "Using file-based database");
            return Ok(Persistence::new_with_file(path)?);
        }

        info!("Using in-memory database");
        Ok(Persistence::new_in_memory()?)
    }
}

#[cfg(feature = "mysql")]
fn open_mysql(url: &str) -> Result<Persistence, ApiError> {
    info!("Using MySQL/MariaDB database");
    Ok(Persistence::new_with_mysql(url)?)
}

#[cfg(not(feature = "mysql"))]
fn open_mysql(_url: &str) -> Result<Persistence, ApiError> {
    Err(ApiError::InvalidInput {
        field: String::from("mysql-url"),
        message: String::from("this build does not include MySQL support"),
    })
}
