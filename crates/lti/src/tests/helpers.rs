// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use simple_roster_domain::{Assignment, AssignmentState, LineItem, LtiInstance, User};
use time::OffsetDateTime;

use crate::{LaunchSettings, Lti1p3Settings};

pub fn create_test_user(username: &str, group_id: Option<&str>) -> User {
    User {
        id: 1,
        username: username.to_string(),
        password_hash: String::from("hash"),
        group_id: group_id.map(str::to_string),
    }
}

pub fn create_test_instances(count: usize) -> Vec<LtiInstance> {
    (1..=count)
        .map(|index| LtiInstance {
            id: i64::try_from(index).unwrap(),
            label: format!("infra_{index}"),
            lti_link: format!("http://infra_{index}.example/"),
            lti_key: format!("key_{index}"),
            lti_secret: format!("secret_{index}"),
        })
        .collect()
}

pub fn create_test_line_item() -> LineItem {
    LineItem {
        id: 5,
        uri: String::from("http://tao.example/delivery#123"),
        label: String::from("Mathematics"),
        slug: String::from("math"),
        starts_at: None,
        ends_at: None,
        max_attempts: 0,
        is_active: true,
    }
}

pub fn create_test_assignment() -> Assignment {
    Assignment {
        id: 17,
        user_id: 1,
        line_item_id: 5,
        state: AssignmentState::Ready,
        attempts_count: 0,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn create_launch_settings() -> LaunchSettings {
    LaunchSettings {
        launch_presentation_return_url: String::from("http://roster.example/index.html"),
        launch_presentation_locale: String::from("en-EN"),
        outcome_service_url: String::from("http://roster.example/api/v1/lti1p1/outcome"),
    }
}

pub fn create_lti1p3_settings() -> Lti1p3Settings {
    Lti1p3Settings {
        platform_issuer: String::from("http://roster.example"),
        client_id: String::from("client_1"),
        deployment_id: String::from("deployment_1"),
        oidc_initiation_url: String::from("http://tool.example/oidc/initiation"),
        platform_secret: String::from("platform-secret"),
        token_ttl_secs: 300,
    }
}
