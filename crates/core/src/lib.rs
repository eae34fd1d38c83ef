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

mod batch;
mod bulk;
mod cache;
mod error;
mod store;

#[cfg(test)]
mod tests;

pub use batch::{BatchReport, BatchSize, process_in_batches};
pub use bulk::{
    BulkOperation, BulkOperationCollection, BulkOperationCollectionProcessor, BulkOperationType,
    BulkResult, CancelAssignmentsProcessor, CreateAssignmentsProcessor, STATE_ATTRIBUTE,
};
pub use cache::{
    InMemoryResultCache, JWT_REFRESH_CACHE_KEY_PREFIX, LINE_ITEM_CACHE_KEY_PREFIX,
    LTI_INSTANCES_CACHE_KEY, ResultCache, USER_CACHE_KEY_PREFIX, generate_cache_key,
    invalidate_and_warm, jwt_refresh_cache_key, line_item_cache_key, user_cache_key,
};
pub use error::CoreError;
pub use store::{AssignmentStore, StagedChange, StoreError};
