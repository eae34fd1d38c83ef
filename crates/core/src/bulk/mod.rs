// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod operation;
mod processor;
mod result;

pub use operation::{BulkOperation, BulkOperationCollection, BulkOperationType, STATE_ATTRIBUTE};
pub use processor::{
    BulkOperationCollectionProcessor, CancelAssignmentsProcessor, CreateAssignmentsProcessor,
};
pub use result::BulkResult;
