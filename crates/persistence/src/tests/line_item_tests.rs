// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use time::macros::datetime;

use crate::error::PersistenceError;
use crate::tests::{create_test_persistence, new_line_item, seed_line_item, test_now};

#[test]
fn test_inserted_line_item_round_trips() {
    let mut persistence = create_test_persistence();
    let id = seed_line_item(&mut persistence, "math");

    let item = persistence.get_line_item(id).unwrap().unwrap();

    assert_eq!(item.slug, "math");
    assert_eq!(item.uri, "https://delivery.example/math");
    assert_eq!(item.max_attempts, 2);
    assert!(item.is_active);
    assert_eq!(item.starts_at, Some(datetime!(2026-03-01 00:00 UTC)));
    assert!(item.is_available_at(test_now()));
}

#[test]
fn test_duplicate_slug_is_rejected() {
    let mut persistence = create_test_persistence();
    seed_line_item(&mut persistence, "math");

    let result = persistence.insert_line_items(&[new_line_item("math", 0)]);

    assert!(matches!(result, Err(PersistenceError::UniqueViolation(_))));
    assert_eq!(persistence.list_line_items().unwrap().len(), 1);
}

#[test]
fn test_lookup_by_slug_and_lists() {
    let mut persistence = create_test_persistence();
    let math = seed_line_item(&mut persistence, "math");
    let art = seed_line_item(&mut persistence, "art");

    assert_eq!(
        persistence.get_line_item_by_slug("art").unwrap().unwrap().id,
        art
    );
    assert!(persistence.get_line_item_by_slug("music").unwrap().is_none());

    let by_ids = persistence.list_line_items_by_ids(&[art]).unwrap();
    assert_eq!(by_ids.len(), 1);

    let by_slugs = persistence
        .list_line_items_by_slugs(&[String::from("math"), String::from("art")])
        .unwrap();
    let ids: Vec<i64> = by_slugs.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![math, art]);
}

#[test]
fn test_update_line_item_uri_by_slug() {
    let mut persistence = create_test_persistence();
    let id = seed_line_item(&mut persistence, "math");

    let updated = persistence
        .update_line_item_uri("math", "https://delivery.example/new")
        .unwrap();
    assert_eq!(updated, Some(id));
    assert_eq!(
        persistence.get_line_item(id).unwrap().unwrap().uri,
        "https://delivery.example/new"
    );

    assert_eq!(
        persistence.update_line_item_uri("missing", "x").unwrap(),
        None
    );
}

#[test]
fn test_update_line_item_dates_clears_missing_bounds() {
    let mut persistence = create_test_persistence();
    let id = seed_line_item(&mut persistence, "math");

    let updated = persistence
        .update_line_item_dates(&[id], Some(datetime!(2026-04-01 08:00 UTC)), None)
        .unwrap();

    assert_eq!(updated, 1);
    let item = persistence.get_line_item(id).unwrap().unwrap();
    assert_eq!(item.starts_at, Some(datetime!(2026-04-01 08:00 UTC)));
    assert_eq!(item.ends_at, None);
}

#[test]
fn test_set_line_items_active() {
    let mut persistence = create_test_persistence();
    let math = seed_line_item(&mut persistence, "math");
    let art = seed_line_item(&mut persistence, "art");

    assert_eq!(persistence.set_line_items_active(&[math, art], false).unwrap(), 2);
    assert!(!persistence.get_line_item(math).unwrap().unwrap().is_active);

    persistence.set_line_items_active(&[art], true).unwrap();
    assert!(persistence.get_line_item(art).unwrap().unwrap().is_active);
}
