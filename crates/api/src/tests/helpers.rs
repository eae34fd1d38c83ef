// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use simple_roster::{BatchSize, InMemoryResultCache, ResultCache};
use simple_roster_domain::{NewAssignment, NewLineItem, NewLtiInstance, NewUser};
use simple_roster_lti::{
    LaunchSettings, Lti1p3Settings, LoadBalancingStrategy, LtiVersion, OAUTH_BODY_HASH,
    OAuthSigner, body_hash, percent_encode,
};
use simple_roster_persistence::{Persistence, ResultCacheHook};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    AuthenticatedUser, CacheBackend, CsvSource, IngestOptions, JwtConfig, LtiConfig,
    RosterConfig, WebhookCredentials,
};

pub const TEST_HASH_COST: u32 = 4;
pub const OUTCOME_SERVICE_URL: &str = "https://roster.example/api/v1/lti1p1/outcome";

pub fn test_now() -> OffsetDateTime {
    datetime!(2026-03-10 12:00 UTC)
}

pub fn create_test_config() -> RosterConfig {
    RosterConfig {
        jwt: JwtConfig {
            secret: String::from("test-jwt-secret"),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 86400,
            issuer: String::from("simple-roster"),
        },
        lti: LtiConfig {
            version: LtiVersion::V1p1,
            load_balancing_strategy: LoadBalancingStrategy::Username,
            launch: LaunchSettings {
                launch_presentation_return_url: String::from("https://roster.example/done"),
                launch_presentation_locale: String::from("en-EN"),
                outcome_service_url: String::from(OUTCOME_SERVICE_URL),
            },
            lti1p3: Lti1p3Settings {
                platform_issuer: String::from("https://roster.example"),
                client_id: String::from("roster-client"),
                deployment_id: String::from("1"),
                oidc_initiation_url: String::from("https://delivery.example/lti1p3/oidc"),
                platform_secret: String::from("test-platform-secret"),
                token_ttl_secs: 3600,
            },
        },
        app_api_key: String::from("test-api-key"),
        webhook: WebhookCredentials {
            username: String::from("hook"),
            password: String::from("hook-password"),
        },
        cache_backend: CacheBackend::Memory,
        cache_ttl_secs: 0,
        password_hash_cost: TEST_HASH_COST,
        assignment_stuck_threshold_secs: 3600,
    }
}

/// A database with the cache refresh hook registered, plus its cache.
pub struct TestEnv {
    pub persistence: Persistence,
    pub cache: Arc<dyn ResultCache>,
    pub config: RosterConfig,
}

pub fn create_test_env() -> TestEnv {
    let cache: Arc<dyn ResultCache> = Arc::new(InMemoryResultCache::new());
    let mut persistence: Persistence = Persistence::new_in_memory().expect("in-memory database");
    persistence.register_hook(ResultCacheHook::new(Arc::clone(&cache)));
    TestEnv {
        persistence,
        cache,
        config: create_test_config(),
    }
}

pub fn user(username: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        username: username.to_string(),
    }
}

pub fn password_of(username: &str) -> String {
    format!("{username}-password")
}

pub fn seed_users(persistence: &mut Persistence, usernames: &[&str]) -> Vec<i64> {
    let users: Vec<NewUser> = usernames
        .iter()
        .map(|username| NewUser {
            username: (*username).to_string(),
            password: password_of(username),
            group_id: None,
        })
        .collect();
    persistence
        .insert_users(&users, TEST_HASH_COST)
        .expect("insert users")
}

pub fn new_line_item(slug: &str, max_attempts: u32) -> NewLineItem {
    NewLineItem {
        uri: format!("https://delivery.example/{slug}"),
        label: format!("Line item {slug}"),
        slug: slug.to_string(),
        starts_at: Some(datetime!(2026-03-01 00:00 UTC)),
        ends_at: Some(datetime!(2026-03-31 23:59:59 UTC)),
        max_attempts,
    }
}

pub fn seed_line_item(persistence: &mut Persistence, slug: &str, max_attempts: u32) -> i64 {
    persistence
        .insert_line_items(&[new_line_item(slug, max_attempts)])
        .expect("insert line item")[0]
}

pub fn seed_lti_instances(persistence: &mut Persistence, count: u32) {
    let instances: Vec<NewLtiInstance> = (1..=count)
        .map(|index| NewLtiInstance {
            label: format!("infra_{index}"),
            lti_link: format!("https://infra_{index}.example/"),
            lti_key: format!("key_{index}"),
            lti_secret: format!("secret_{index}"),
        })
        .collect();
    persistence
        .insert_lti_instances(&instances)
        .expect("insert LTI instances");
}

pub fn seed_assignment(persistence: &mut Persistence, user_id: i64, line_item_id: i64) -> i64 {
    persistence
        .insert_assignments(
            &[NewAssignment {
                user_id,
                line_item_id,
            }],
            test_now(),
        )
        .expect("insert assignment")[0]
}

/// Seeds `user1..=user{count}` with one ready assignment each on `math`
/// (two attempts) and one LTI instance. Returns the assignment ids.
pub fn seed_roster(persistence: &mut Persistence, count: usize) -> Vec<i64> {
    let usernames: Vec<String> = (1..=count).map(|i| format!("user{i}")).collect();
    let names: Vec<&str> = usernames.iter().map(String::as_str).collect();
    let user_ids: Vec<i64> = seed_users(persistence, &names);
    let line_item_id: i64 = seed_line_item(persistence, "math", 2);
    seed_lti_instances(persistence, 1);
    user_ids
        .into_iter()
        .map(|user_id| seed_assignment(persistence, user_id, line_item_id))
        .collect()
}

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file: NamedTempFile = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush csv");
    file
}

pub fn open_csv(path: &Path, required: &[&str]) -> CsvSource {
    CsvSource::open(path, "local", b',', required).expect("open csv")
}

pub fn options(batch: i64, dry_run: bool) -> IngestOptions {
    IngestOptions {
        batch: BatchSize::new(batch).expect("batch size"),
        dry_run,
    }
}

pub fn replace_result_xml(assignment_id: i64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeRequest xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
    <imsx_POXHeader>
        <imsx_POXRequestHeaderInfo>
            <imsx_version>V1.0</imsx_version>
            <imsx_messageIdentifier>msg-{assignment_id}</imsx_messageIdentifier>
        </imsx_POXRequestHeaderInfo>
    </imsx_POXHeader>
    <imsx_POXBody>
        <replaceResultRequest>
            <resultRecord>
                <sourcedGUID>
                    <sourcedId>{assignment_id}</sourcedId>
                </sourcedGUID>
                <result>
                    <resultScore>
                        <language>en</language>
                        <textString>0.75</textString>
                    </resultScore>
                </result>
            </resultRecord>
        </replaceResultRequest>
    </imsx_POXBody>
</imsx_POXEnvelopeRequest>"#
    )
}

/// Signs an outcome body the way a delivery does and returns the query
/// string carrying the OAuth parameters.
pub fn signed_outcome_query(key: &str, secret: &str, body: &str) -> String {
    let mut parameters: BTreeMap<String, String> = BTreeMap::new();
    parameters.insert(OAUTH_BODY_HASH.to_string(), body_hash(body.as_bytes()));
    OAuthSigner::new(key, secret)
        .sign(
            "POST",
            OUTCOME_SERVICE_URL,
            parameters,
            "nonce-1",
            1_773_144_000,
        )
        .expect("sign outcome")
        .iter()
        .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
        .collect::<Vec<String>>()
        .join("&")
}
