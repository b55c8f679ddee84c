//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the query shapes the tree engine needs from storage.
//! The engine never talks SQL; it receives a `&dyn NodeStore` that is already
//! bound to one open transaction.
//!
//! # Design Decisions
//!
//! 1. **Owner-scoped**: Every read and write takes the owner ID. The only
//!    unscoped read is `list_nodes` with `NodeFilter { owner_id: None, .. }`,
//!    used by the diagnostic cycle audit.
//! 2. **Transaction-bound**: `TransactionalStore::begin()` hands out a
//!    `StoreTransaction`; all reads establishing preconditions and all writes
//!    happen on that handle, then it is committed or rolled back as a unit.
//! 3. **Error Handling**: Uses `DatabaseError` so constraint violations can be
//!    told apart from hard failures.
//!
//! # Examples
//!
//! ```rust,no_run
//! use outliner_core::db::{NodeStore, SqliteStore, StoreTransaction, TransactionalStore};
//! use outliner_core::models::NewNode;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::open_path(PathBuf::from("./data/outliner.db")).await?;
//!
//!     let tx = store.begin().await?;
//!     let node = tx.insert_node(1, NewNode::new("Inbox"), 1).await?;
//!     tx.commit().await?;
//!
//!     println!("Created node {}", node.id);
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{NewNode, Node, NodeFilter, NodeId, NodeUpdate, OwnerId, OwnerSettings, ShowMode};
use async_trait::async_trait;

/// Owner-scoped node persistence operations
///
/// Implementations must be `Send + Sync` so engine futures can move between
/// Tokio worker threads.
#[async_trait]
pub trait NodeStore: Send + Sync {
    //
    // READS
    //

    /// Fetch a node by ID, scoped to `owner_id`
    ///
    /// Returns `Ok(None)` both when the node does not exist and when it belongs
    /// to another owner.
    async fn get_node(&self, owner_id: OwnerId, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// Fetch all children of `parent_id` (roots when `None`), ordered by
    /// (order, created_at, id) with unassigned orders last
    async fn get_children(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
    ) -> Result<Vec<Node>, DatabaseError>;

    /// Fetch nodes matching `filter`, ordered by ID
    async fn list_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DatabaseError>;

    /// Existence check scoped to owner
    async fn node_exists(&self, owner_id: OwnerId, id: NodeId) -> Result<bool, DatabaseError>;

    /// Whether `id` has at least one child (archived children count)
    async fn has_children(&self, owner_id: OwnerId, id: NodeId) -> Result<bool, DatabaseError>;

    /// Highest assigned order in the group, `None` for an empty or fully unassigned group
    async fn max_sibling_order(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
    ) -> Result<Option<i64>, DatabaseError>;

    //
    // WRITES
    //

    /// Insert a new node with the given order and return it
    async fn insert_node(
        &self,
        owner_id: OwnerId,
        node: NewNode,
        order: i64,
    ) -> Result<Node, DatabaseError>;

    /// Apply the non-structural fields of `update` (title, description,
    /// completed, collapsed). `parent_id` is ignored here; parent changes go
    /// through `set_parent`.
    async fn update_fields(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<(), DatabaseError>;

    /// Change a node's parent pointer and clear its order
    ///
    /// The node is "in flight" until the caller assigns its order in the
    /// destination group; a NULL order can never collide with a sibling.
    async fn set_parent(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        parent_id: Option<NodeId>,
    ) -> Result<(), DatabaseError>;

    /// Write a batch of (node, order) assignments
    ///
    /// Implementations must tolerate assignments that are only unique once the
    /// whole batch is applied (e.g. swapping two orders).
    async fn write_orders(
        &self,
        owner_id: OwnerId,
        assignments: &[(NodeId, i64)],
    ) -> Result<(), DatabaseError>;

    /// Set the archived flag of one node
    async fn set_archived(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        archived: bool,
    ) -> Result<(), DatabaseError>;

    /// Hard-delete one node, returning the number of rows removed
    async fn delete_node(&self, owner_id: OwnerId, id: NodeId) -> Result<u64, DatabaseError>;

    //
    // OWNER SETTINGS
    //

    /// Read the owner's settings (defaults when the owner has no row yet)
    async fn get_owner_settings(&self, owner_id: OwnerId) -> Result<OwnerSettings, DatabaseError>;

    async fn set_locked_node(
        &self,
        owner_id: OwnerId,
        node_id: Option<NodeId>,
    ) -> Result<(), DatabaseError>;

    async fn set_show_mode(&self, owner_id: OwnerId, mode: ShowMode) -> Result<(), DatabaseError>;
}

/// A `NodeStore` bound to one open transaction
#[async_trait]
pub trait StoreTransaction: NodeStore {
    /// Make every write of this transaction durable
    async fn commit(&self) -> Result<(), DatabaseError>;

    /// Discard every write of this transaction
    async fn rollback(&self) -> Result<(), DatabaseError>;
}

/// Entry point for opening transactions
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Open a transaction with serializable isolation
    async fn begin(&self) -> Result<Self::Tx, DatabaseError>;
}
