//! Error types for the tree mutation engine
//!
//! Every structural rule the engine enforces maps to one variant here. Callers
//! that only care about the broad category (to pick an HTTP status, to decide
//! whether to retry) use [`NodeOperationError::kind`].

use crate::db::DatabaseError;
use crate::models::{CyclePath, NodeId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Broad error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Node or parent does not exist or belongs to another owner
    NotFound,
    /// Self-parent, would-create-cycle, existing cycle, lock target without children
    InvalidStructure,
    /// Duplicate orders in a batch, stale parent assumption, storage-level conflict
    Conflict,
    /// Delete or restore of a node that is not archived
    PreconditionFailed,
    /// Payload rejected before touching the tree
    InvalidInput,
    /// The transaction could not complete
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidStructure => "invalid_structure",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during node operations
///
/// Structural variants are always raised before the first write of an
/// operation, and the surrounding transaction is rolled back either way.
///
/// # Examples
///
/// ```rust
/// use outliner_core::operations::{ErrorKind, NodeOperationError};
///
/// let err = NodeOperationError::SelfParent { node_id: 4 };
/// assert_eq!(err.kind(), ErrorKind::InvalidStructure);
/// assert!(!err.is_retryable());
/// ```
#[derive(Error, Debug)]
pub enum NodeOperationError {
    /// Referenced node does not exist for this owner
    #[error("Node {node_id} does not exist")]
    NodeNotFound { node_id: NodeId },

    /// Requested parent does not exist for this owner
    #[error("Parent node {parent_id} does not exist")]
    ParentNotFound { parent_id: NodeId },

    #[error("Node {node_id} cannot be its own parent")]
    SelfParent { node_id: NodeId },

    /// The candidate parent is a descendant of the node
    #[error("Circular reference: node {parent_id} is a descendant of node {node_id}")]
    CircularReference { node_id: NodeId, parent_id: NodeId },

    /// A cycle already present in the stored forest was hit while checking a move
    #[error("Existing cycle detected: {path}")]
    ExistingCycle { path: CyclePath },

    #[error("Node {node_id} has no children and cannot be locked")]
    LockTargetHasNoChildren { node_id: NodeId },

    #[error("Node {node_id} still has children")]
    HasChildren { node_id: NodeId },

    /// Two assignments in one reorder batch use the same order
    #[error("Duplicate order value {order} in reorder batch")]
    DuplicateOrder { order: i64 },

    /// The same node appears twice in one reorder batch
    #[error("Node {node_id} appears more than once in reorder batch")]
    DuplicateAssignment { node_id: NodeId },

    /// The caller's view of a node's parent is out of date
    #[error("Node {node_id} is not a child of {expected:?} (current parent: {actual:?})")]
    StaleParent {
        node_id: NodeId,
        expected: Option<NodeId>,
        actual: Option<NodeId>,
    },

    #[error("Cannot {operation} node {node_id}: node is not archived")]
    NotArchived {
        node_id: NodeId,
        operation: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl NodeOperationError {
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    pub fn parent_not_found(parent_id: NodeId) -> Self {
        Self::ParentNotFound { parent_id }
    }

    pub fn circular_reference(node_id: NodeId, parent_id: NodeId) -> Self {
        Self::CircularReference { node_id, parent_id }
    }

    pub fn not_archived(node_id: NodeId, operation: &'static str) -> Self {
        Self::NotArchived { node_id, operation }
    }

    /// Broad category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound { .. } | Self::ParentNotFound { .. } => ErrorKind::NotFound,
            Self::SelfParent { .. }
            | Self::CircularReference { .. }
            | Self::ExistingCycle { .. }
            | Self::LockTargetHasNoChildren { .. }
            | Self::HasChildren { .. } => ErrorKind::InvalidStructure,
            Self::DuplicateOrder { .. }
            | Self::DuplicateAssignment { .. }
            | Self::StaleParent { .. } => ErrorKind::Conflict,
            Self::NotArchived { .. } => ErrorKind::PreconditionFailed,
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Storage(err) if err.is_conflict() => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Whether re-running the whole transaction may succeed
    ///
    /// Only storage-level conflicts (unique index violations, lock timeouts)
    /// qualify. Conflicts found by precondition checks are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_conflict())
    }
}
