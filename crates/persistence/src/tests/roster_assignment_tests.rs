// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use simple_roster_domain::{AssignmentState, NewAssignment};
use time::Duration;

use crate::tests::{create_test_persistence, seed_assignment, seed_line_item, seed_user, test_now};

#[test]
fn test_inserted_assignments_are_ready_without_attempts() {
    let mut persistence = create_test_persistence();
    let user_id = seed_user(&mut persistence, "user1");
    let line_item_id = seed_line_item(&mut persistence, "math");

    let id = seed_assignment(&mut persistence, user_id, line_item_id);
    let assignment = persistence.get_assignment(id).unwrap().unwrap();

    assert_eq!(assignment.state, AssignmentState::Ready);
    assert_eq!(assignment.attempts_count, 0);
    assert_eq!(assignment.updated_at, test_now());
}

#[test]
fn test_assignment_for_unknown_user_violates_foreign_key() {
    let mut persistence = create_test_persistence();
    let line_item_id = seed_line_item(&mut persistence, "math");

    let result = persistence.insert_assignments(
        &[NewAssignment {
            user_id: 999,
            line_item_id,
        }],
        test_now(),
    );

    assert!(result.is_err());
    assert_eq!(persistence.count_assignments().unwrap(), 0);
}

#[test]
fn test_save_assignment_writes_state_and_attempts() {
    let mut persistence = create_test_persistence();
    let user_id = seed_user(&mut persistence, "user1");
    let line_item_id = seed_line_item(&mut persistence, "math");
    let id = seed_assignment(&mut persistence, user_id, line_item_id);
    let line_item = persistence.get_line_item(line_item_id).unwrap().unwrap();

    let mut assignment = persistence.get_assignment(id).unwrap().unwrap();
    let later = test_now() + Duration::minutes(5);
    assignment.begin_attempt(&line_item, later).unwrap();
    persistence.save_assignment(&assignment).unwrap();

    let stored = persistence.get_assignment(id).unwrap().unwrap();
    assert_eq!(stored.state, AssignmentState::Started);
    assert_eq!(stored.attempts_count, 1);
    assert_eq!(stored.updated_at, later);
    assert_eq!(
        persistence
            .count_assignments_in_state(AssignmentState::Started)
            .unwrap(),
        1
    );
}

#[test]
fn test_stuck_assignments_are_started_and_old() {
    let mut persistence = create_test_persistence();
    let user_id = seed_user(&mut persistence, "user1");
    let line_item_id = seed_line_item(&mut persistence, "math");
    let line_item = persistence.get_line_item(line_item_id).unwrap().unwrap();

    let old_id = seed_assignment(&mut persistence, user_id, line_item_id);
    let fresh_id = seed_assignment(&mut persistence, user_id, line_item_id);
    seed_assignment(&mut persistence, user_id, line_item_id);

    let mut old = persistence.get_assignment(old_id).unwrap().unwrap();
    old.begin_attempt(&line_item, test_now() - Duration::days(3)).unwrap();
    persistence.save_assignment(&old).unwrap();

    let mut fresh = persistence.get_assignment(fresh_id).unwrap().unwrap();
    fresh.begin_attempt(&line_item, test_now()).unwrap();
    persistence.save_assignment(&fresh).unwrap();

    let stuck = persistence
        .list_stuck_assignments(test_now() - Duration::days(1), 100)
        .unwrap();

    let ids: Vec<i64> = stuck.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![old_id]);
}
