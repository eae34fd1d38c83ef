// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use time::{Duration, OffsetDateTime};

use crate::tests::helpers::create_lti1p3_settings;
use crate::{BASIC_OUTCOME_SCOPE, Lti1p3Settings, issue_service_token, validate_outcome_token};

#[test]
fn test_outcome_token_with_scope_validates() {
    let settings: Lti1p3Settings = create_lti1p3_settings();
    let token: String =
        issue_service_token(&settings, &[BASIC_OUTCOME_SCOPE], OffsetDateTime::now_utc()).unwrap();

    let claims = validate_outcome_token(&settings, &token).unwrap();

    assert_eq!(claims.aud, "client_1");
    assert!(claims.has_scope(BASIC_OUTCOME_SCOPE));
}

#[test]
fn test_outcome_token_without_scope_is_rejected() {
    let settings: Lti1p3Settings = create_lti1p3_settings();
    let token: String =
        issue_service_token(&settings, &["other"], OffsetDateTime::now_utc()).unwrap();

    assert!(validate_outcome_token(&settings, &token).is_err());
}

#[test]
fn test_outcome_token_with_other_secret_is_rejected() {
    let settings: Lti1p3Settings = create_lti1p3_settings();
    let mut other: Lti1p3Settings = create_lti1p3_settings();
    other.platform_secret = String::from("different");
    let token: String =
        issue_service_token(&other, &[BASIC_OUTCOME_SCOPE], OffsetDateTime::now_utc()).unwrap();

    assert!(validate_outcome_token(&settings, &token).is_err());
}

#[test]
fn test_expired_outcome_token_is_rejected() {
    let settings: Lti1p3Settings = create_lti1p3_settings();
    let issued_at: OffsetDateTime = OffsetDateTime::now_utc() - Duration::hours(2);
    let token: String = issue_service_token(&settings, &[BASIC_OUTCOME_SCOPE], issued_at).unwrap();

    assert!(validate_outcome_token(&settings, &token).is_err());
}
