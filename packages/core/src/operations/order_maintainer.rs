//! Order Maintainer
//!
//! Keeps sibling orders unique and dense inside each (owner, parent) group.
//!
//! - [`append_node`]: single insertion at `max + 1`
//! - [`reorder`]: all-or-nothing batch reassignment supplied by the caller
//! - [`renumber_group`]: closes gaps after a sibling left the group
//!
//! `reorder` does not renumber. Callers submit a complete permutation; a batch
//! that would leave a duplicate behind is rejected by the storage-level unique
//! index when it is written.

use crate::db::NodeStore;
use crate::models::{NewNode, Node, NodeId, OwnerId, ValidationError};
use crate::operations::NodeOperationError;
use std::collections::HashSet;

/// Order a node appended to the group would receive
pub async fn next_order(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    parent_id: Option<NodeId>,
) -> Result<i64, NodeOperationError> {
    let max = store.max_sibling_order(owner_id, parent_id).await?;
    Ok(max.unwrap_or(0) + 1)
}

/// Create `node` as the last child of its parent (or last root)
pub async fn append_node(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    node: NewNode,
) -> Result<Node, NodeOperationError> {
    node.validate()?;

    if let Some(parent_id) = node.parent_id {
        if !store.node_exists(owner_id, parent_id).await? {
            return Err(NodeOperationError::parent_not_found(parent_id));
        }
    }

    let order = next_order(store, owner_id, node.parent_id).await?;
    let created = store.insert_node(owner_id, node, order).await?;

    tracing::debug!(
        "Inserted node {} under {:?} at order {} (owner {})",
        created.id,
        created.parent_id,
        order,
        owner_id
    );

    Ok(created)
}

/// Apply a batch of (node, order) assignments inside one sibling group
///
/// Preconditions, checked before any write:
/// - every order is positive
/// - no order and no node appears twice
/// - every node exists for `owner_id` and is currently a child of `parent_id`
///
/// Returns the updated nodes in batch order.
pub async fn reorder(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    parent_id: Option<NodeId>,
    assignments: &[(NodeId, i64)],
) -> Result<Vec<Node>, NodeOperationError> {
    let mut seen_orders = HashSet::with_capacity(assignments.len());
    let mut seen_nodes = HashSet::with_capacity(assignments.len());

    for &(node_id, order) in assignments {
        if order < 1 {
            return Err(ValidationError::InvalidOrder(order).into());
        }
        if !seen_orders.insert(order) {
            return Err(NodeOperationError::DuplicateOrder { order });
        }
        if !seen_nodes.insert(node_id) {
            return Err(NodeOperationError::DuplicateAssignment { node_id });
        }
    }

    for &(node_id, _) in assignments {
        let node = store
            .get_node(owner_id, node_id)
            .await?
            .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;

        if node.parent_id != parent_id {
            return Err(NodeOperationError::StaleParent {
                node_id,
                expected: parent_id,
                actual: node.parent_id,
            });
        }
    }

    if assignments.is_empty() {
        return Ok(Vec::new());
    }

    store.write_orders(owner_id, assignments).await?;

    let mut updated = Vec::with_capacity(assignments.len());
    for &(node_id, _) in assignments {
        let node = store
            .get_node(owner_id, node_id)
            .await?
            .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;
        updated.push(node);
    }

    tracing::debug!(
        "Reordered {} node(s) under {:?} (owner {})",
        updated.len(),
        parent_id,
        owner_id
    );

    Ok(updated)
}

/// Assignments that make `group` dense (1..N in its current order)
pub(crate) fn dense_assignments(group: &[Node]) -> Vec<(NodeId, i64)> {
    group
        .iter()
        .zip(1i64..)
        .filter(|(node, order)| node.order != Some(*order))
        .map(|(node, order)| (node.id, order))
        .collect()
}

/// Renumber a group densely 1..N, writing only nodes whose order changes
///
/// Returns the nodes that were rewritten.
pub async fn renumber_group(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    parent_id: Option<NodeId>,
) -> Result<Vec<Node>, NodeOperationError> {
    let group = store.get_children(owner_id, parent_id).await?;
    let assignments = dense_assignments(&group);

    if assignments.is_empty() {
        return Ok(Vec::new());
    }

    store.write_orders(owner_id, &assignments).await?;

    let changed: HashSet<NodeId> = assignments.iter().map(|(id, _)| *id).collect();
    let renumbered = store
        .get_children(owner_id, parent_id)
        .await?
        .into_iter()
        .filter(|node| changed.contains(&node.id))
        .collect::<Vec<_>>();

    tracing::debug!(
        "Renumbered {} sibling(s) under {:?} (owner {})",
        renumbered.len(),
        parent_id,
        owner_id
    );

    Ok(renumbered)
}
