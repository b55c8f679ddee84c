//! NodeService - Transactional Façade over the Tree Engine
//!
//! Every public method is one logical operation:
//!
//! 1. open a transaction (`BEGIN IMMEDIATE` on the libsql backend)
//! 2. run the engine functions from [`crate::operations`] against it
//! 3. commit, or roll back on any error
//!
//! The whole sequence runs inside the configured [`RetryPolicy`], so a
//! transaction that loses a race on a sibling group is re-run with fresh reads.
//! Structural errors are never retried.
//!
//! The owner ID is an explicit parameter of every call; the service holds no
//! per-user state.

use crate::config::OutlinerConfig;
use crate::db::{NodeStore, SqliteStore, StoreTransaction, TransactionalStore};
use crate::models::{
    CyclePath, DeleteResult, FixedNode, NewNode, Node, NodeFilter, NodeId, NodeUpdate, OwnerId,
    OwnerSettings, ShowMode,
};
use crate::operations::{
    archive_cascade, find_cycles, move_engine, order_maintainer, ForestIndex,
    NodeOperationError, RetryPolicy,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// Core service for tree mutations and reads
///
/// # Examples
///
/// ```no_run
/// use outliner_core::config::OutlinerConfig;
/// use outliner_core::models::NewNode;
/// use outliner_core::services::NodeService;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = OutlinerConfig::with_database_path("./data/outliner.db");
///     let service = NodeService::open(&config).await?;
///
///     let groceries = service.create_node(1, NewNode::new("Groceries")).await?;
///     let milk = service
///         .create_node(1, NewNode::new("Milk").with_parent(groceries.id))
///         .await?;
///
///     // Put milk first among the root nodes
///     let changed = service.move_node(1, milk.id, None, Some(1)).await?;
///     println!("{} node(s) changed", changed.len());
///     Ok(())
/// }
/// ```
pub struct NodeService<S = SqliteStore>
where
    S: TransactionalStore,
{
    /// Transaction source for all persistence operations
    pub(crate) store: Arc<S>,

    /// Conflict retry policy applied to every operation
    retry: RetryPolicy,
}

// Manual Clone implementation because S doesn't need to be Clone
impl<S> Clone for NodeService<S>
where
    S: TransactionalStore,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            retry: self.retry,
        }
    }
}

impl NodeService<SqliteStore> {
    /// Open the libsql database described by `config` and wrap it
    pub async fn open(config: &OutlinerConfig) -> Result<Self, NodeOperationError> {
        let store = SqliteStore::open(config).await?;
        Ok(Self::new(Arc::new(store), RetryPolicy::from_config(config)))
    }
}

impl<S> NodeService<S>
where
    S: TransactionalStore,
{
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `body` in a fresh transaction, committing on success, retrying on conflict
    async fn transact<T, F, Fut>(&self, operation: &'static str, body: F) -> Result<T, NodeOperationError>
    where
        F: Fn(Arc<S::Tx>) -> Fut,
        Fut: Future<Output = Result<T, NodeOperationError>>,
    {
        let body = &body;
        let store = &self.store;

        self.retry
            .run(operation, move || async move {
                let tx = Arc::new(store.begin().await?);
                let result = body(Arc::clone(&tx)).await;

                match result {
                    Ok(value) => {
                        tx.commit().await?;
                        Ok(value)
                    }
                    Err(err) => {
                        if let Err(rollback_err) = tx.rollback().await {
                            tracing::warn!(
                                "Rollback of {} failed after error '{}': {}",
                                operation,
                                err,
                                rollback_err
                            );
                        } else {
                            tracing::debug!("Rolled back {}: {}", operation, err);
                        }
                        Err(err)
                    }
                }
            })
            .await
    }

    //
    // READS
    //

    /// Get a node by ID (`None` when missing or owned by someone else)
    pub async fn get_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<Option<Node>, NodeOperationError> {
        self.transact("get_node", |tx| async move {
            Ok(tx.get_node(owner_id, node_id).await?)
        })
        .await
    }

    /// Children of `parent_id` (roots when `None`) in sibling order
    pub async fn get_children(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
    ) -> Result<Vec<Node>, NodeOperationError> {
        self.transact("get_children", |tx| async move {
            if let Some(parent_id) = parent_id {
                if !tx.node_exists(owner_id, parent_id).await? {
                    return Err(NodeOperationError::node_not_found(parent_id));
                }
            }
            Ok(tx.get_children(owner_id, parent_id).await?)
        })
        .await
    }

    /// All nodes of an owner ordered by ID, optionally filtered by archived flag
    pub async fn list_nodes(
        &self,
        owner_id: OwnerId,
        archived: Option<bool>,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let filter = NodeFilter {
            owner_id: Some(owner_id),
            archived,
        };
        let filter = &filter;

        self.transact("list_nodes", |tx| async move { Ok(tx.list_nodes(filter).await?) })
            .await
    }

    /// The owner's list as their UI shows it
    ///
    /// Nodes are filtered by the owner's show mode and, when a lock is set,
    /// restricted to the locked node and its descendants. Ordered by ID.
    pub async fn visible_forest(&self, owner_id: OwnerId) -> Result<Vec<Node>, NodeOperationError> {
        self.transact("visible_forest", |tx| async move {
            let settings = tx.get_owner_settings(owner_id).await?;
            let nodes = tx.list_nodes(&NodeFilter::for_owner(owner_id)).await?;

            let scope: Option<HashSet<NodeId>> = settings.locked_node_id.map(|locked| {
                let index = ForestIndex::new(&nodes);
                let mut scope = index.descendants(owner_id, locked);
                scope.insert(locked);
                scope
            });
            let archived = settings.show_mode.archived_filter();

            Ok(nodes
                .into_iter()
                .filter(|node| archived.map_or(true, |wanted| node.archived == wanted))
                .filter(|node| scope.as_ref().map_or(true, |ids| ids.contains(&node.id)))
                .collect())
        })
        .await
    }

    //
    // STRUCTURAL MUTATIONS
    //

    /// Create a node as the last child of its parent (or last root)
    pub async fn create_node(&self, owner_id: OwnerId, node: NewNode) -> Result<Node, NodeOperationError> {
        let node = &node;

        let created = self
            .transact("create_node", |tx| async move {
                order_maintainer::append_node(&*tx, owner_id, node.clone()).await
            })
            .await?;

        tracing::info!(
            "Created node {} under {:?} at order {:?} (owner {})",
            created.id,
            created.parent_id,
            created.order,
            owner_id
        );
        Ok(created)
    }

    /// Apply a field-by-field change set
    ///
    /// A `parent_id` change goes through the move engine: the node is appended
    /// to the new group and its old group is renumbered. Self-parenting, cycles
    /// and parents of other owners are rejected before anything is written.
    pub async fn update_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
        update: NodeUpdate,
    ) -> Result<Node, NodeOperationError> {
        update.validate()?;
        let update = &update;

        let updated = self
            .transact("update_node", |tx| async move {
                let current = tx
                    .get_node(owner_id, node_id)
                    .await?
                    .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;

                if let Some(new_parent_id) = update.parent_id {
                    if new_parent_id != current.parent_id || new_parent_id == Some(node_id) {
                        let outcome = move_engine::move_node(
                            &*tx,
                            owner_id,
                            node_id,
                            new_parent_id,
                            None,
                        )
                        .await?;
                        release_lock_if_childless(&*tx, owner_id, outcome.old_parent_id)
                            .await?;
                    }
                }

                if update.has_field_changes() {
                    tx.update_fields(owner_id, node_id, update).await?;
                }

                tx.get_node(owner_id, node_id)
                    .await?
                    .ok_or_else(|| NodeOperationError::node_not_found(node_id))
            })
            .await?;

        tracing::info!("Updated node {} (owner {})", node_id, owner_id);
        Ok(updated)
    }

    /// Move a node under `new_parent_id` at 1-based `target_order`
    ///
    /// Returns the moved node first, then every sibling whose order changed in
    /// the destination and source groups.
    pub async fn move_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        target_order: Option<i64>,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let changed = self
            .transact("move_node", |tx| async move {
                let outcome = move_engine::move_node(
                    &*tx,
                    owner_id,
                    node_id,
                    new_parent_id,
                    target_order,
                )
                .await?;
                release_lock_if_childless(&*tx, owner_id, outcome.old_parent_id).await?;
                Ok(outcome.changed)
            })
            .await?;

        tracing::info!(
            "Moved node {} to {:?} ({} node(s) changed, owner {})",
            node_id,
            new_parent_id,
            changed.len(),
            owner_id
        );
        Ok(changed)
    }

    /// Batch-assign sibling orders under `parent_id`, all or nothing
    pub async fn reorder(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
        assignments: &[(NodeId, i64)],
    ) -> Result<Vec<Node>, NodeOperationError> {
        let updated = self
            .transact("reorder", |tx| async move {
                order_maintainer::reorder(&*tx, owner_id, parent_id, assignments).await
            })
            .await?;

        tracing::info!(
            "Reordered {} node(s) under {:?} (owner {})",
            updated.len(),
            parent_id,
            owner_id
        );
        Ok(updated)
    }

    /// Archive a node and its live descendants
    pub async fn archive_subtree(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let archived = self
            .transact("archive_subtree", |tx| async move {
                archive_cascade::archive_subtree(&*tx, owner_id, node_id).await
            })
            .await?;

        tracing::info!(
            "Archived {} node(s) under {} (owner {})",
            archived.len(),
            node_id,
            owner_id
        );
        Ok(archived)
    }

    /// Restore an archived node and its archived descendants
    pub async fn restore_subtree(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let restored = self
            .transact("restore_subtree", |tx| async move {
                archive_cascade::restore_subtree(&*tx, owner_id, node_id).await
            })
            .await?;

        tracing::info!(
            "Restored {} node(s) under {} (owner {})",
            restored.len(),
            node_id,
            owner_id
        );
        Ok(restored)
    }

    /// Restore a node so that it is visible again
    ///
    /// Un-archives the node's archived ancestors (nearest first), then the
    /// node's own subtree. Returns ancestors first, then the subtree in
    /// pre-order.
    pub async fn restore_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let restored = self
            .transact("restore_node", |tx| async move {
                let node = tx
                    .get_node(owner_id, node_id)
                    .await?
                    .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;
                if !node.archived {
                    return Err(NodeOperationError::not_archived(node_id, "restore"));
                }

                let mut restored =
                    archive_cascade::restore_ancestor_chain(&*tx, owner_id, node_id).await?;
                restored
                    .extend(archive_cascade::restore_subtree(&*tx, owner_id, node_id).await?);
                Ok(restored)
            })
            .await?;

        tracing::info!(
            "Restored node {} ({} node(s) changed, owner {})",
            node_id,
            restored.len(),
            owner_id
        );
        Ok(restored)
    }

    /// Hard-delete an archived leaf and close the gap it leaves
    ///
    /// # Errors
    ///
    /// - `NotArchived` when the node is live
    /// - `HasChildren` when the node still has children (archived or not)
    pub async fn delete_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<DeleteResult, NodeOperationError> {
        let result = self
            .transact("delete_node", |tx| async move {
                let node = tx
                    .get_node(owner_id, node_id)
                    .await?
                    .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;

                if !node.archived {
                    return Err(NodeOperationError::not_archived(node_id, "delete"));
                }
                if tx.has_children(owner_id, node_id).await? {
                    return Err(NodeOperationError::HasChildren { node_id });
                }

                if tx.get_owner_settings(owner_id).await?.locked_node_id == Some(node_id) {
                    tx.set_locked_node(owner_id, None).await?;
                }

                tx.delete_node(owner_id, node_id).await?;
                let renumbered =
                    order_maintainer::renumber_group(&*tx, owner_id, node.parent_id).await?;
                release_lock_if_childless(&*tx, owner_id, node.parent_id).await?;

                Ok(DeleteResult {
                    deleted_id: node_id,
                    renumbered,
                })
            })
            .await?;

        tracing::info!("Deleted node {} (owner {})", node_id, owner_id);
        Ok(result)
    }

    //
    // CYCLE AUDIT
    //

    /// Report every parent-pointer cycle, for one owner or for all of them
    pub async fn detect_cycles(
        &self,
        owner_id: Option<OwnerId>,
    ) -> Result<Vec<CyclePath>, NodeOperationError> {
        let cycles = self
            .transact("detect_cycles", |tx| async move {
                let filter = NodeFilter {
                    owner_id,
                    archived: None,
                };
                let nodes = tx.list_nodes(&filter).await?;
                Ok(find_cycles(&nodes))
            })
            .await?;

        if !cycles.is_empty() {
            tracing::warn!("Found {} cycle(s) in stored forest", cycles.len());
        }
        Ok(cycles)
    }

    /// Break every cycle by making its offending node a root
    ///
    /// Each detached node is appended to its owner's root group through the
    /// move engine, so both affected groups stay dense.
    pub async fn repair_cycles(
        &self,
        owner_id: Option<OwnerId>,
    ) -> Result<Vec<FixedNode>, NodeOperationError> {
        self.transact("repair_cycles", |tx| async move {
            let filter = NodeFilter {
                owner_id,
                archived: None,
            };
            let nodes = tx.list_nodes(&filter).await?;
            let mut fixed = Vec::new();

            for cycle in find_cycles(&nodes) {
                let outcome = move_engine::move_node(
                    &*tx,
                    cycle.owner_id,
                    cycle.node_id,
                    None,
                    None,
                )
                .await?;
                release_lock_if_childless(&*tx, cycle.owner_id, outcome.old_parent_id)
                    .await?;

                tracing::warn!(
                    "Detached node {} from parent {} to break cycle {} (owner {})",
                    cycle.node_id,
                    cycle.parent_id,
                    cycle,
                    cycle.owner_id
                );

                fixed.push(FixedNode {
                    owner_id: cycle.owner_id,
                    node_id: cycle.node_id,
                    previous_parent_id: cycle.parent_id,
                });
            }

            Ok(fixed)
        })
        .await
    }

    //
    // OWNER SETTINGS
    //

    pub async fn owner_settings(&self, owner_id: OwnerId) -> Result<OwnerSettings, NodeOperationError> {
        self.transact("owner_settings", |tx| async move {
            Ok(tx.get_owner_settings(owner_id).await?)
        })
        .await
    }

    /// Restrict the owner's visible forest to the subtree under `node_id`
    ///
    /// Only nodes with at least one child can be locked.
    pub async fn lock_node(
        &self,
        owner_id: OwnerId,
        node_id: NodeId,
    ) -> Result<OwnerSettings, NodeOperationError> {
        let settings = self
            .transact("lock_node", |tx| async move {
                if !tx.node_exists(owner_id, node_id).await? {
                    return Err(NodeOperationError::node_not_found(node_id));
                }
                if !tx.has_children(owner_id, node_id).await? {
                    return Err(NodeOperationError::LockTargetHasNoChildren { node_id });
                }

                tx.set_locked_node(owner_id, Some(node_id)).await?;
                Ok(tx.get_owner_settings(owner_id).await?)
            })
            .await?;

        tracing::info!("Locked owner {} to node {}", owner_id, node_id);
        Ok(settings)
    }

    pub async fn unlock(&self, owner_id: OwnerId) -> Result<OwnerSettings, NodeOperationError> {
        self.transact("unlock", |tx| async move {
            tx.set_locked_node(owner_id, None).await?;
            Ok(tx.get_owner_settings(owner_id).await?)
        })
        .await
    }

    pub async fn set_show_mode(
        &self,
        owner_id: OwnerId,
        mode: ShowMode,
    ) -> Result<OwnerSettings, NodeOperationError> {
        self.transact("set_show_mode", |tx| async move {
            tx.set_show_mode(owner_id, mode).await?;
            Ok(tx.get_owner_settings(owner_id).await?)
        })
        .await
    }
}

/// Clear the owner's lock when it points at `node_id` and that node lost its
/// last child
async fn release_lock_if_childless(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    node_id: Option<NodeId>,
) -> Result<(), NodeOperationError> {
    let Some(node_id) = node_id else {
        return Ok(());
    };

    let settings = store.get_owner_settings(owner_id).await?;
    if settings.locked_node_id == Some(node_id) && !store.has_children(owner_id, node_id).await? {
        store.set_locked_node(owner_id, None).await?;
        tracing::info!(
            "Released lock on node {} (owner {}): no children left",
            node_id,
            owner_id
        );
    }

    Ok(())
}
