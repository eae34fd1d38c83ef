// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Launch link generation for LTI 1.1 and LTI 1.3.

use std::collections::BTreeMap;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;
use simple_roster_domain::{Assignment, LineItem, LtiInstance, User};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::LtiError;
use crate::oauth::OAuthSigner;
use crate::token::{Lti1p3Settings, issue_message_hint};

/// The LTI protocol version used for launches and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LtiVersion {
    /// LTI 1.1 with OAuth 1.0a signed form launches.
    #[default]
    V1p1,
    /// LTI 1.3 with OIDC login initiation.
    V1p3,
}

impl LtiVersion {
    /// Returns the version string reported to clients.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1p1 => "1.1.1",
            Self::V1p3 => "1.3.0",
        }
    }
}

impl FromStr for LtiVersion {
    type Err = LtiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1" | "1.1.1" => Ok(Self::V1p1),
            "1.3" | "1.3.0" => Ok(Self::V1p3),
            other => Err(LtiError::InvalidVersion(other.to_string())),
        }
    }
}

impl std::fmt::Display for LtiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values shared by every launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Where the tool sends the learner after the test.
    pub launch_presentation_return_url: String,
    /// Locale passed to the tool.
    pub launch_presentation_locale: String,
    /// Endpoint receiving basic outcome callbacks.
    pub outcome_service_url: String,
}

/// Everything a launch needs.
#[derive(Debug, Clone, Copy)]
pub struct LaunchContext<'a> {
    /// The launching user.
    pub user: &'a User,
    /// The assignment being launched.
    pub assignment: &'a Assignment,
    /// The assignment's line item.
    pub line_item: &'a LineItem,
    /// The instance chosen by the load balancer.
    pub instance: &'a LtiInstance,
    /// The LTI `context_id`.
    pub context_id: &'a str,
}

/// A generated launch returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LtiLaunch {
    /// URL to launch.
    pub lti_link: String,
    /// LTI version string.
    pub lti_version: String,
    /// Form parameters to post to the link (empty for LTI 1.3).
    pub lti_params: BTreeMap<String, String>,
}

/// Builds the delivery launch URL on an instance.
///
/// The line item URI is wrapped as `{"delivery":"<uri>"}` and base64 encoded
/// into the path.
#[must_use]
pub fn delivery_launch_url(instance: &LtiInstance, line_item: &LineItem) -> String {
    let payload: String = serde_json::json!({ "delivery": line_item.uri }).to_string();
    format!(
        "{}/ltiDeliveryProvider/DeliveryTool/launch/{}",
        instance.lti_link.trim_end_matches('/'),
        STANDARD.encode(payload)
    )
}

/// Builds and signs an LTI 1.1 basic launch.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn build_lti1p1_launch(
    settings: &LaunchSettings,
    context: &LaunchContext<'_>,
) -> Result<LtiLaunch, LtiError> {
    let link: String = delivery_launch_url(context.instance, context.line_item);
    let assignment_id: String = context.assignment.id.to_string();

    let parameters: BTreeMap<String, String> = [
        ("lti_message_type", String::from("basic-lti-launch-request")),
        ("lti_version", String::from("LTI-1p0")),
        ("context_id", context.context_id.to_string()),
        ("context_label", context.line_item.slug.clone()),
        ("context_title", context.line_item.label.clone()),
        ("context_type", String::from("CourseSection")),
        ("resource_link_id", assignment_id.clone()),
        ("roles", String::from("Learner")),
        ("user_id", context.user.username.clone()),
        ("lis_person_name_full", context.user.username.clone()),
        ("lis_outcome_service_url", settings.outcome_service_url.clone()),
        ("lis_result_sourcedid", assignment_id),
        (
            "launch_presentation_return_url",
            settings.launch_presentation_return_url.clone(),
        ),
        (
            "launch_presentation_locale",
            settings.launch_presentation_locale.clone(),
        ),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    let signer: OAuthSigner =
        OAuthSigner::new(&context.instance.lti_key, &context.instance.lti_secret);
    let lti_params: BTreeMap<String, String> = signer.sign_now("POST", &link, parameters)?;

    debug!(
        assignment_id = context.assignment.id,
        instance = %context.instance.label,
        "Generated LTI 1.1 launch"
    );

    Ok(LtiLaunch {
        lti_link: link,
        lti_version: LtiVersion::V1p1.as_str().to_string(),
        lti_params,
    })
}

/// Builds the OIDC login initiation URL of an LTI 1.3 launch.
///
/// # Errors
///
/// Returns an error if the message hint cannot be signed.
pub fn build_lti1p3_launch(
    settings: &Lti1p3Settings,
    context: &LaunchContext<'_>,
    now: OffsetDateTime,
) -> Result<LtiLaunch, LtiError> {
    let target_link_uri: String = delivery_launch_url(context.instance, context.line_item);
    let message_hint: String = issue_message_hint(
        settings,
        context.assignment.id,
        &context.line_item.uri,
        context.context_id,
        now,
    )?;

    let query: String = [
        ("iss", settings.platform_issuer.as_str()),
        ("login_hint", context.user.username.as_str()),
        ("target_link_uri", target_link_uri.as_str()),
        ("lti_message_hint", message_hint.as_str()),
        ("lti_deployment_id", settings.deployment_id.as_str()),
        ("client_id", settings.client_id.as_str()),
    ]
    .iter()
    .map(|(key, value)| {
        format!(
            "{key}={}",
            utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC)
        )
    })
    .collect::<Vec<String>>()
    .join("&");

    let separator: char = if settings.oidc_initiation_url.contains('?') {
        '&'
    } else {
        '?'
    };

    debug!(
        assignment_id = context.assignment.id,
        "Generated LTI 1.3 launch"
    );

    Ok(LtiLaunch {
        lti_link: format!("{}{separator}{query}", settings.oidc_initiation_url),
        lti_version: LtiVersion::V1p3.as_str().to_string(),
        lti_params: BTreeMap::new(),
    })
}
