// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test fixtures for the console commands.

use std::io::Write;
use std::path::Path;

use clap::Parser;
use simple_roster_domain::{NewAssignment, NewLineItem, NewUser};
use simple_roster_persistence::Persistence;
use tempfile::NamedTempFile;
use time::OffsetDateTime;

use crate::Args;
use crate::commands::{Console, SourceOptions};

pub fn parse(argv: &[&str]) -> Args {
    let mut full: Vec<&str> = vec!["simple-roster-console"];
    full.extend_from_slice(argv);
    Args::try_parse_from(full).expect("valid arguments")
}

/// A console over a fresh in-memory database with default options and a
/// cheap bcrypt cost.
pub fn create_test_console(dry_run: bool) -> Console {
    let args: Args = parse(&["--password-hash-cost", "4", "cache-warmup", "lti-instances"]);
    Console::new(
        Persistence::new_in_memory().expect("in-memory database"),
        args.roster.into_config().expect("default config"),
        dry_run,
    )
    .expect("console")
}

/// Seeds `user1..=user{count}`, each with a ready assignment on the
/// always-open `math` line item. Returns the assignment ids.
pub fn seed_roster(persistence: &mut Persistence, count: usize) -> Vec<i64> {
    let users: Vec<NewUser> = (1..=count)
        .map(|i| NewUser {
            username: format!("user{i}"),
            password: format!("user{i}-password"),
            group_id: None,
        })
        .collect();
    let user_ids: Vec<i64> = persistence.insert_users(&users, 4).unwrap();
    let line_item_id: i64 = persistence
        .insert_line_items(&[NewLineItem {
            uri: String::from("https://delivery.example/math"),
            label: String::from("Math"),
            slug: String::from("math"),
            starts_at: None,
            ends_at: None,
            max_attempts: 2,
        }])
        .unwrap()[0];
    let assignments: Vec<NewAssignment> = user_ids
        .iter()
        .map(|user_id| NewAssignment {
            user_id: *user_id,
            line_item_id,
        })
        .collect();
    persistence
        .insert_assignments(&assignments, OffsetDateTime::now_utc())
        .unwrap()
}

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file: NamedTempFile = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush csv");
    file
}

pub fn source(path: &Path, batch: i64) -> SourceOptions {
    SourceOptions {
        path: path.to_path_buf(),
        delimiter: String::from(","),
        storage: String::from("local"),
        batch,
    }
}
