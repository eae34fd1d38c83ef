// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.


use time::OffsetDateTime;
use time::macros::datetime;

use crate::{Assignment, AssignmentState, LineItem};

pub fn test_now() -> OffsetDateTime {
    datetime!(2026-03-10 12:00 UTC)
}

pub fn create_test_line_item(max_attempts: u32) -> LineItem {
    LineItem {
        id: 7,
        uri: String::from("http://tao.example/delivery#1"),
        label: String::from("Mathematics"),
        slug: String::from("math"),
        starts_at: Some(datetime!(2026-03-01 00:00 UTC)),
        ends_at: Some(datetime!(2026-03-31 23:59 UTC)),
        max_attempts,
        is_active: true,
    }
}

pub fn create_test_assignment(state: AssignmentState, attempts_count: u32) -> Assignment {
    Assignment {
        id: 42,
        user_id: 1,
        line_item_id: 7,
        state,
        attempts_count,
        updated_at: datetime!(2026-03-01 08:00 UTC),
    }
}
