// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;

use simple_roster_api::{ApiError, BulkAction};
use simple_roster_domain::{AssignmentState, LineItem};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::commands::{
    IngestKind, UserWarmupFilters, bulk_assignments, cache_warmup_lti_instances,
    cache_warmup_users, change_dates, change_state, garbage_collect, ingest, line_item_selector,
    parse_date,
};
use crate::error::CommandError;
use crate::tests::helpers::{create_test_console, seed_roster, source, write_csv};

fn math() -> simple_roster_api::LineItemSelector {
    line_item_selector(Vec::new(), vec![String::from("math")])
}

#[test]
fn test_ingest_is_a_dry_run_without_force() {
    let mut console = create_test_console(true);
    let file = write_csv("username,password\nalice,secret-1\nbob,secret-2\n");

    let outcome = ingest(&mut console, IngestKind::Users, &source(file.path(), 10)).unwrap();

    assert_eq!(outcome.message, "[DRY RUN] 2 users would be processed");
    assert!(!outcome.failed);
    assert_eq!(console.persistence.count_users().unwrap(), 0);
}

#[test]
fn test_forced_ingest_stores_users() {
    let mut console = create_test_console(false);
    let file = write_csv("username,password\nalice,secret-1\nbob,secret-2\n");

    let outcome = ingest(&mut console, IngestKind::Users, &source(file.path(), 1)).unwrap();

    assert_eq!(outcome.message, "[OK] 2 users have been successfully processed");
    assert_eq!(console.persistence.count_users().unwrap(), 2);
}

#[test]
fn test_invalid_batch_is_rejected_before_reading_the_file() {
    let mut console = create_test_console(false);

    let err = ingest(
        &mut console,
        IngestKind::Users,
        &source(Path::new("/nonexistent/users.csv"), 0),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CommandError::Api(ApiError::InvalidInput { ref field, .. }) if field == "batch"
    ));
}

#[test]
fn test_bulk_cancel_with_unknown_user_reports_failure() {
    let mut console = create_test_console(false);
    let ids = seed_roster(&mut console.persistence, 1);
    let file = write_csv("username\nuser1\nghost\n");

    let outcome = bulk_assignments(
        &mut console,
        BulkAction::Cancel,
        &source(file.path(), 100),
    )
    .unwrap();

    assert!(outcome.failed);
    assert!(outcome.message.starts_with("[WARNING]"));
    let stored = console.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Ready);
}

#[test]
fn test_bulk_cancel_succeeds_for_known_users() {
    let mut console = create_test_console(false);
    let ids = seed_roster(&mut console.persistence, 2);
    let file = write_csv("username\nuser1\nuser2\n");

    let outcome = bulk_assignments(
        &mut console,
        BulkAction::Cancel,
        &source(file.path(), 1),
    )
    .unwrap();

    assert!(!outcome.failed);
    assert_eq!(outcome.message, "[OK] 2 assignment(s) have been cancelled");
    for id in ids {
        let stored = console.persistence.get_assignment(id).unwrap().unwrap();
        assert_eq!(stored.state, AssignmentState::Cancelled);
    }
}

#[test]
fn test_garbage_collect_with_nothing_stuck() {
    let mut console = create_test_console(false);
    seed_roster(&mut console.persistence, 1);

    let outcome = garbage_collect(&mut console, 10, OffsetDateTime::now_utc()).unwrap();

    assert_eq!(outcome.message, "Nothing to collect, no stuck assignments found");
}

#[test]
fn test_garbage_collect_completes_stuck_assignments() {
    let mut console = create_test_console(false);
    let ids = seed_roster(&mut console.persistence, 1);
    let now: OffsetDateTime = OffsetDateTime::now_utc();
    let mut assignment = console.persistence.get_assignment(ids[0]).unwrap().unwrap();
    let line_item: LineItem = console
        .persistence
        .get_line_item(assignment.line_item_id)
        .unwrap()
        .unwrap();
    assignment
        .begin_attempt(&line_item, now - Duration::days(2))
        .unwrap();
    console.persistence.save_assignment(&assignment).unwrap();

    let outcome = garbage_collect(&mut console, 10, now).unwrap();

    assert_eq!(outcome.message, "[OK] 1 stuck assignment(s) have been completed");
    let stored = console.persistence.get_assignment(ids[0]).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Completed);
}

#[test]
fn test_modulo_without_remainder_is_rejected() {
    let mut console = create_test_console(false);

    let err = cache_warmup_users(
        &mut console,
        UserWarmupFilters {
            modulo: Some(2),
            batch: 10,
            ..UserWarmupFilters::default()
        },
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CommandError::Api(ApiError::InvalidInput { ref field, .. }) if field == "remainder"
    ));
}

#[test]
fn test_user_warmup_fills_the_cache() {
    let mut console = create_test_console(false);
    seed_roster(&mut console.persistence, 3);

    let outcome = cache_warmup_users(
        &mut console,
        UserWarmupFilters {
            batch: 2,
            ..UserWarmupFilters::default()
        },
    )
    .unwrap();

    assert_eq!(
        outcome.message,
        "[OK] 3 user cache entries have been successfully warmed up"
    );
}

#[test]
fn test_lti_instance_warmup_with_no_instances() {
    let mut console = create_test_console(false);

    let outcome = cache_warmup_lti_instances(&mut console).unwrap();

    assert_eq!(outcome.message, "Nothing to warm up, no LTI instance found");
}

#[test]
fn test_change_dates_parses_plain_dates() {
    let mut console = create_test_console(false);
    seed_roster(&mut console.persistence, 1);

    let outcome = change_dates(&mut console, &math(), Some("2026-03-01"), Some("2026-03-31"))
        .unwrap();

    assert_eq!(outcome.message, "[OK] 1 line item(s) have been updated");
    let stored = console
        .persistence
        .get_line_item_by_slug("math")
        .unwrap()
        .unwrap();
    assert_eq!(stored.starts_at, Some(datetime!(2026-03-01 0:00 UTC)));
    assert_eq!(stored.ends_at, Some(datetime!(2026-03-31 0:00 UTC)));
}

#[test]
fn test_change_dates_rejects_an_unparsable_date() {
    let mut console = create_test_console(false);
    seed_roster(&mut console.persistence, 1);

    let err = change_dates(&mut console, &math(), Some("next tuesday"), None).unwrap_err();

    assert!(matches!(
        err,
        CommandError::InvalidDate { option: "start-date", .. }
    ));
}

#[test]
fn test_change_state_dry_run_keeps_the_line_item_active() {
    let mut console = create_test_console(true);
    seed_roster(&mut console.persistence, 1);

    let outcome = change_state(&mut console, "deactivate", &math()).unwrap();

    assert_eq!(outcome.message, "[DRY RUN] 1 line item(s) would be deactivated");
    let stored = console
        .persistence
        .get_line_item_by_slug("math")
        .unwrap()
        .unwrap();
    assert!(stored.is_active);
}

#[test]
fn test_parse_date_accepts_rfc3339() {
    assert_eq!(
        parse_date("start-date", "2026-03-01T08:30:00+02:00").unwrap(),
        datetime!(2026-03-01 8:30 +2)
    );
}

#[test]
fn test_bulk_create_with_repeated_username_leaves_one_ready_assignment() {
    let mut console = create_test_console(false);
    seed_roster(&mut console.persistence, 1);
    let file = write_csv("username\nuser1\nuser1\n");

    let outcome = bulk_assignments(
        &mut console,
        BulkAction::Create,
        &source(file.path(), 10),
    )
    .unwrap();

    assert!(!outcome.failed);
    assert_eq!(outcome.message, "[OK] 1 assignment(s) have been created");
    assert_eq!(
        console
            .persistence
            .count_assignments_in_state(AssignmentState::Ready)
            .unwrap(),
        1
    );
}
