// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod error;
mod launch;
mod load_balancer;
mod oauth;
mod outcome;
mod token;

#[cfg(test)]
mod tests;

pub use error::LtiError;
pub use launch::{
    LaunchContext, LaunchSettings, LtiLaunch, LtiVersion, build_lti1p1_launch,
    build_lti1p3_launch, delivery_launch_url,
};
pub use load_balancer::{LoadBalancingStrategy, LtiInstanceLoadBalancer, select_by_key};
pub use oauth::{
    OAUTH_BODY_HASH, OAUTH_CONSUMER_KEY, OAUTH_SIGNATURE, OAuthSigner, body_hash, find_parameter,
    normalize_base_url, percent_encode, query_parameters, signature_base_string,
};
pub use outcome::{ReplaceResultRequest, parse_replace_result_request, replace_result_response};
pub use token::{
    BASIC_OUTCOME_SCOPE, Lti1p3Settings, MessageHintClaims, ServiceTokenClaims,
    decode_message_hint, issue_message_hint, issue_service_token, validate_outcome_token,
};
