//! Archive Cascade
//!
//! Propagates the archived flag through a subtree without touching parent
//! pointers. Traversals use explicit worklists instead of recursion:
//!
//! - archive is post-order: descendants first, the root last
//! - restore is pre-order: the root first, then its archived children
//!
//! All three operations return the nodes whose flag changed, in write order.

use crate::db::NodeStore;
use crate::models::{Node, NodeId, OwnerId};
use crate::operations::move_engine::ChangedNodes;
use crate::operations::NodeOperationError;
use std::collections::HashSet;

enum Visit {
    Enter(Node),
    Exit(Node),
}

/// Archive `root_id` and every live descendant
///
/// An already-archived child is not descended into: its own descendants were
/// archived together with it. Archiving an archived root still walks its live
/// children.
pub async fn archive_subtree(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    root_id: NodeId,
) -> Result<Vec<Node>, NodeOperationError> {
    let root = store
        .get_node(owner_id, root_id)
        .await?
        .ok_or_else(|| NodeOperationError::node_not_found(root_id))?;

    let mut changed = ChangedNodes::new();
    let mut visited = HashSet::from([root.id]);
    let mut worklist = vec![Visit::Enter(root)];

    while let Some(visit) = worklist.pop() {
        match visit {
            Visit::Enter(node) => {
                let children = store.get_children(owner_id, Some(node.id)).await?;
                worklist.push(Visit::Exit(node));
                for child in children.into_iter().rev() {
                    if !child.archived && visited.insert(child.id) {
                        worklist.push(Visit::Enter(child));
                    }
                }
            }
            Visit::Exit(node) => {
                if !node.archived {
                    store.set_archived(owner_id, node.id, true).await?;
                    changed.record(node.id);
                }
            }
        }
    }

    tracing::debug!(
        "Archived {} node(s) under {} (owner {})",
        changed.len(),
        root_id,
        owner_id
    );

    changed.load(store, owner_id).await
}

/// Restore `root_id` and every archived descendant reachable through archived nodes
///
/// Fails with `NotArchived` when the root itself is live.
pub async fn restore_subtree(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    root_id: NodeId,
) -> Result<Vec<Node>, NodeOperationError> {
    let root = store
        .get_node(owner_id, root_id)
        .await?
        .ok_or_else(|| NodeOperationError::node_not_found(root_id))?;

    if !root.archived {
        return Err(NodeOperationError::not_archived(root_id, "restore"));
    }

    let mut changed = ChangedNodes::new();
    let mut visited = HashSet::from([root.id]);
    let mut worklist = vec![root.id];

    while let Some(node_id) = worklist.pop() {
        store.set_archived(owner_id, node_id, false).await?;
        changed.record(node_id);

        let children = store.get_children(owner_id, Some(node_id)).await?;
        for child in children.into_iter().rev() {
            if child.archived && visited.insert(child.id) {
                worklist.push(child.id);
            }
        }
    }

    tracing::debug!(
        "Restored {} node(s) under {} (owner {})",
        changed.len(),
        root_id,
        owner_id
    );

    changed.load(store, owner_id).await
}

/// Un-archive the archived ancestors of `node_id`, nearest first
///
/// Stops at the first live ancestor or at the root. Siblings of restored
/// ancestors are left alone.
pub async fn restore_ancestor_chain(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    node_id: NodeId,
) -> Result<Vec<Node>, NodeOperationError> {
    let node = store
        .get_node(owner_id, node_id)
        .await?
        .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;

    let mut changed = ChangedNodes::new();
    let mut visited = HashSet::from([node.id]);
    let mut next = node.parent_id;

    while let Some(ancestor_id) = next {
        if !visited.insert(ancestor_id) {
            break;
        }

        let ancestor = store
            .get_node(owner_id, ancestor_id)
            .await?
            .ok_or_else(|| NodeOperationError::node_not_found(ancestor_id))?;

        if !ancestor.archived {
            break;
        }

        store.set_archived(owner_id, ancestor.id, false).await?;
        changed.record(ancestor.id);
        next = ancestor.parent_id;
    }

    changed.load(store, owner_id).await
}
