// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use simple_roster_domain::AssignmentState;
use simple_roster_lti::LtiVersion;
use time::Duration;

use crate::tests::helpers::{
    create_test_env, seed_assignment, seed_line_item, seed_roster, seed_users, test_now, user,
};
use crate::{
    ApiError, MAX_BULK_USERNAMES, bulk_cancel_assignments, bulk_create_assignments, get_lti_link,
    healthcheck, list_assignments,
};

#[test]
fn test_healthcheck_reports_both_backends_available() {
    let mut env = create_test_env();

    let response = healthcheck(&mut env.persistence, env.cache.as_ref());

    assert!(response.is_database_available);
    assert!(response.is_cache_available);
}

#[test]
fn test_list_assignments_returns_available_assignments_with_line_items() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    let response = list_assignments(&mut env.persistence, env.cache.as_ref(), &user("user1"))
        .unwrap();

    assert_eq!(response.assignments.len(), 1);
    let assignment = &response.assignments[0];
    assert_eq!(assignment.id, ids[0]);
    assert_eq!(assignment.username, "user1");
    assert_eq!(assignment.state, AssignmentState::Ready);
    assert_eq!(assignment.attempts_count, 0);
    assert_eq!(assignment.line_item.slug, "math");
}

#[test]
fn test_list_assignments_hides_cancelled_assignments() {
    let mut env = create_test_env();
    seed_roster(&mut env.persistence, 1);
    bulk_cancel_assignments(&mut env.persistence, &[String::from("user1")]).unwrap();

    let response = list_assignments(&mut env.persistence, env.cache.as_ref(), &user("user1"))
        .unwrap();

    assert!(response.assignments.is_empty());
}

#[test]
fn test_list_assignments_for_deleted_user_is_not_found() {
    let mut env = create_test_env();

    let result = list_assignments(&mut env.persistence, env.cache.as_ref(), &user("ghost"));

    assert!(matches!(result, Err(ApiError::ResourceNotFound { .. })));
}

#[test]
fn test_lti_link_starts_the_assignment_and_signs_the_launch() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    let launch = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        ids[0],
        test_now(),
    )
    .unwrap();

    assert_eq!(launch.lti_version, "1.1.1");
    assert!(launch.lti_link.starts_with("https://infra_1.example/ltiDeliveryProvider/"));
    assert_eq!(launch.lti_params["lis_result_sourcedid"], ids[0].to_string());
    assert_eq!(launch.lti_params["oauth_consumer_key"], "key_1");
    assert!(launch.lti_params.contains_key("oauth_signature"));

    let stored = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Started);
    assert_eq!(stored.attempts_count, 1);
}

#[test]
fn test_lti_link_relaunch_does_not_consume_another_attempt() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    for _ in 0..2 {
        get_lti_link(
            &mut env.persistence,
            env.cache.as_ref(),
            &env.config,
            &user("user1"),
            ids[0],
            test_now(),
        )
        .unwrap();
    }

    let stored = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.attempts_count, 1);
}

#[test]
fn test_lti_link_for_another_users_assignment_is_not_found() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 2);

    let result = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        ids[1],
        test_now(),
    );

    assert!(matches!(result, Err(ApiError::ResourceNotFound { .. })));
}

#[test]
fn test_lti_link_outside_the_line_item_window_conflicts() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    let result = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        ids[0],
        test_now() + Duration::days(60),
    );

    assert!(matches!(result, Err(ApiError::Conflict { .. })));
    let stored = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Ready);
}

#[test]
fn test_lti_link_for_cancelled_assignment_conflicts() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);
    bulk_cancel_assignments(&mut env.persistence, &[String::from("user1")]).unwrap();

    let result = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        ids[0],
        test_now(),
    );

    assert!(matches!(result, Err(ApiError::Conflict { .. })));
}

#[test]
fn test_lti_link_without_instances_is_an_internal_error() {
    let mut env = create_test_env();
    let user_ids = seed_users(&mut env.persistence, &["user1"]);
    let line_item_id = seed_line_item(&mut env.persistence, "math", 1);
    let assignment_id = seed_assignment(&mut env.persistence, user_ids[0], line_item_id);

    let result = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        assignment_id,
        test_now(),
    );

    assert!(matches!(result, Err(ApiError::Internal { .. })));
    let stored = env.persistence.get_assignment(assignment_id).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Ready);
}

#[test]
fn test_lti1p3_link_points_at_the_oidc_initiation_url() {
    let mut env = create_test_env();
    env.config.lti.version = LtiVersion::V1p3;
    let ids = seed_roster(&mut env.persistence, 1);

    let launch = get_lti_link(
        &mut env.persistence,
        env.cache.as_ref(),
        &env.config,
        &user("user1"),
        ids[0],
        test_now(),
    )
    .unwrap();

    assert_eq!(launch.lti_version, "1.3.0");
    assert!(
        launch
            .lti_link
            .starts_with("https://delivery.example/lti1p3/oidc?iss=")
    );
    assert!(launch.lti_link.contains("login_hint=user1"));
    assert!(launch.lti_params.is_empty());
}

#[test]
fn test_bulk_cancel_leaves_no_available_assignment() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 2);

    let response = bulk_cancel_assignments(&mut env.persistence, &[String::from("user1")]).unwrap();

    assert!(response.data.is_applied());
    assert_eq!(response.data.outcome("user1"), Some(true));
    let cancelled = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(cancelled.state, AssignmentState::Cancelled);
    let untouched = env.persistence.get_assignment(ids[1]).unwrap().unwrap();
    assert_eq!(untouched.state, AssignmentState::Ready);

    let listed = list_assignments(&mut env.persistence, env.cache.as_ref(), &user("user1"))
        .unwrap();
    assert!(listed.assignments.is_empty());
}

#[test]
fn test_bulk_cancel_with_unknown_user_rolls_back_everything() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    let response = bulk_cancel_assignments(
        &mut env.persistence,
        &[String::from("user1"), String::from("ghost")],
    )
    .unwrap();

    assert!(!response.data.is_applied());
    assert_eq!(response.data.outcome("user1"), Some(true));
    assert_eq!(response.data.outcome("ghost"), Some(false));
    let stored = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Ready);
}

#[test]
fn test_bulk_create_replaces_the_available_assignment() {
    let mut env = create_test_env();
    let ids = seed_roster(&mut env.persistence, 1);

    let response = bulk_create_assignments(&mut env.persistence, &[String::from("user1")]).unwrap();

    assert!(response.data.is_applied());
    let old = env.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(old.state, AssignmentState::Cancelled);

    let listed = list_assignments(&mut env.persistence, env.cache.as_ref(), &user("user1"))
        .unwrap();
    assert_eq!(listed.assignments.len(), 1);
    assert_ne!(listed.assignments[0].id, ids[0]);
    assert_eq!(listed.assignments[0].line_item.slug, "math");
    assert_eq!(listed.assignments[0].attempts_count, 0);
}

#[test]
fn test_bulk_create_for_user_without_assignments_fails() {
    let mut env = create_test_env();
    seed_users(&mut env.persistence, &["user1"]);

    let response = bulk_create_assignments(&mut env.persistence, &[String::from("user1")]).unwrap();

    assert!(!response.data.is_applied());
    assert_eq!(response.data.outcome("user1"), Some(false));
    assert_eq!(env.persistence.count_assignments().unwrap(), 0);
}

#[test]
fn test_bulk_deduplicates_usernames() {
    let mut env = create_test_env();
    seed_roster(&mut env.persistence, 1);

    let response = bulk_create_assignments(
        &mut env.persistence,
        &[String::from("user1"), String::from(" user1 ")],
    )
    .unwrap();

    assert_eq!(response.data.success_count(), 1);
    assert_eq!(env.persistence.count_assignments().unwrap(), 2);
}

#[test]
fn test_bulk_without_usernames_is_invalid() {
    let mut env = create_test_env();

    let result = bulk_cancel_assignments(&mut env.persistence, &[]);

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[test]
fn test_bulk_over_the_limit_is_too_large() {
    let mut env = create_test_env();
    let usernames: Vec<String> = (0..=MAX_BULK_USERNAMES)
        .map(|i| format!("user{i}"))
        .collect();

    let result = bulk_create_assignments(&mut env.persistence, &usernames);

    assert!(matches!(
        result,
        Err(ApiError::PayloadTooLarge {
            received,
            limit: MAX_BULK_USERNAMES,
        }) if received == MAX_BULK_USERNAMES + 1
    ));
}
