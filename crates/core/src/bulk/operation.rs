// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeMap;

/// Attribute carrying the target assignment state of an update.
pub const STATE_ATTRIBUTE: &str = "state";

/// The kind of mutation a bulk operation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkOperationType {
    /// Create a new assignment.
    Create,
    /// Update existing assignments.
    Update,
}

impl BulkOperationType {
    /// Returns the string representation of the operation type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for BulkOperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work in a bulk request, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOperation {
    identifier: String,
    operation_type: BulkOperationType,
    attributes: BTreeMap<String, String>,
    is_dry_run: bool,
}

impl BulkOperation {
    /// Creates an operation without attributes.
    #[must_use]
    pub fn new(identifier: impl Into<String>, operation_type: BulkOperationType) -> Self {
        Self {
            identifier: identifier.into(),
            operation_type,
            attributes: BTreeMap::new(),
            is_dry_run: false,
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the identifier (username) targeted by this operation.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the operation type.
    #[must_use]
    pub const fn operation_type(&self) -> BulkOperationType {
        self.operation_type
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns all attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Returns whether this operation must not be persisted.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.is_dry_run
    }

    /// Sets the dry run flag.
    pub const fn set_dry_run(&mut self, is_dry_run: bool) {
        self.is_dry_run = is_dry_run;
    }
}

/// An ordered batch of operations sharing one dry run flag.
///
/// Every operation added to the collection takes the collection's flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOperationCollection {
    operations: Vec<BulkOperation>,
    is_dry_run: bool,
}

impl BulkOperationCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new(is_dry_run: bool) -> Self {
        Self {
            operations: Vec::new(),
            is_dry_run,
        }
    }

    /// Appends an operation, overriding its dry run flag with the collection's.
    pub fn add(&mut self, mut operation: BulkOperation) {
        operation.set_dry_run(self.is_dry_run);
        self.operations.push(operation);
    }

    /// Builder form of [`Self::add`].
    #[must_use]
    pub fn with(mut self, operation: BulkOperation) -> Self {
        self.add(operation);
        self
    }

    /// Returns whether the collection is processed without persisting anything.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.is_dry_run
    }

    /// Changes the dry run flag of the collection and all held operations.
    pub fn set_dry_run(&mut self, is_dry_run: bool) {
        self.is_dry_run = is_dry_run;
        for operation in &mut self.operations {
            operation.set_dry_run(is_dry_run);
        }
    }

    /// Returns the number of held operations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns whether the collection holds no operations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates over the operations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, BulkOperation> {
        self.operations.iter()
    }

    /// Removes all operations, keeping the dry run flag.
    pub fn clear(&mut self) {
        self.operations.clear();
    }
}

impl<'a> IntoIterator for &'a BulkOperationCollection {
    type Item = &'a BulkOperation;
    type IntoIter = std::slice::Iter<'a, BulkOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
