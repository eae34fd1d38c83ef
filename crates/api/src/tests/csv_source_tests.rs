// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::tests::helpers::write_csv;
use crate::{CsvSource, IngestError, parse_delimiter};

#[test]
fn test_headers_match_case_insensitively_after_trimming() {
    let file = write_csv(" UserName , PASSWORD\nuser1,secret\n");

    let source = CsvSource::open(file.path(), "local", b',', &["username", "password"]).unwrap();
    let rows: Vec<_> = source.rows().collect::<Result<_, _>>().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].required("username").unwrap(), "user1");
    assert_eq!(rows[0].line(), 2);
}

#[test]
fn test_missing_column_is_named() {
    let file = write_csv("username\nuser1\n");

    let err = CsvSource::open(file.path(), "local", b',', &["username", "password"]).unwrap_err();

    assert!(matches!(err, IngestError::MissingColumn { ref column } if column == "password"));
    assert_eq!(err.to_string(), "Column 'password' is not set in source file");
}

#[test]
fn test_empty_required_value_reports_the_line() {
    let file = write_csv("username,password\nuser1,secret\nuser2,\n");
    let source = CsvSource::open(file.path(), "local", b',', &["username", "password"]).unwrap();

    let rows: Vec<_> = source.rows().collect::<Result<_, _>>().unwrap();
    let err = rows[1].required("password").unwrap_err();

    assert!(matches!(err, IngestError::EmptyValue { line: 3, .. }));
}

#[test]
fn test_custom_delimiter() {
    let file = write_csv("username;password\nuser1;secret\n");
    let source = CsvSource::open(file.path(), "local", b';', &["username"]).unwrap();

    let rows: Vec<_> = source.rows().collect::<Result<_, _>>().unwrap();

    assert_eq!(rows[0].optional("password"), Some("secret"));
    assert_eq!(rows[0].optional("groupId"), None);
}

#[test]
fn test_only_local_storage_is_supported() {
    let file = write_csv("username\nuser1\n");

    let err = CsvSource::open(file.path(), "s3", b',', &["username"]).unwrap_err();

    assert!(matches!(err, IngestError::UnsupportedStorage(_)));
}

#[test]
fn test_missing_file_cannot_be_opened() {
    let dir = tempfile::tempdir().unwrap();

    let err =
        CsvSource::open(&dir.path().join("absent.csv"), "local", b',', &["username"]).unwrap_err();

    assert!(matches!(err, IngestError::Open { .. }));
}

#[test]
fn test_delimiter_must_be_one_character() {
    assert_eq!(parse_delimiter(";").unwrap(), b';');
    assert!(parse_delimiter("").is_err());
    assert!(parse_delimiter(";;").is_err());
}
