//! Move Engine
//!
//! Re-parents a node and places it at a 1-based position among its new
//! siblings, keeping both the destination and the source group dense.
//! Every write happens on the caller's transaction; precondition failures
//! are raised before the first write.

use crate::db::NodeStore;
use crate::models::{Node, NodeId, OwnerId};
use crate::operations::cycle_guard::would_create_cycle;
use crate::operations::order_maintainer::renumber_group;
use crate::operations::NodeOperationError;
use std::collections::HashSet;

/// Insertion-ordered, deduplicated set of node IDs touched by an operation
#[derive(Debug, Default)]
pub struct ChangedNodes {
    ids: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl ChangedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: NodeId) {
        if self.seen.insert(id) {
            self.ids.push(id);
        }
    }

    pub fn extend<I: IntoIterator<Item = NodeId>>(&mut self, ids: I) {
        for id in ids {
            self.record(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Re-read every recorded node in recording order
    pub async fn load(
        &self,
        store: &dyn NodeStore,
        owner_id: OwnerId,
    ) -> Result<Vec<Node>, NodeOperationError> {
        let mut nodes = Vec::with_capacity(self.ids.len());
        for &id in &self.ids {
            let node = store
                .get_node(owner_id, id)
                .await?
                .ok_or_else(|| NodeOperationError::node_not_found(id))?;
            nodes.push(node);
        }
        Ok(nodes)
    }
}

/// Outcome of a move, for callers that maintain state tied to the source group
#[derive(Debug)]
pub struct MoveOutcome {
    /// Parent before the move
    pub old_parent_id: Option<NodeId>,
    /// Moved node first, then renumbered siblings of both groups
    pub changed: Vec<Node>,
}

/// Move `node_id` under `new_parent_id` (root when `None`) at `target_order`
///
/// `target_order` is 1-based; `None` appends, out-of-range values are clamped
/// to `[1, N + 1]` where N is the destination group size without the node.
///
/// # Errors
///
/// - `NodeNotFound` / `ParentNotFound` when either does not exist for the owner
/// - `SelfParent` when `new_parent_id == node_id`
/// - `CircularReference` when the new parent is a descendant of the node
/// - `ExistingCycle` when the node already sits on a stored cycle
pub async fn move_node(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    node_id: NodeId,
    new_parent_id: Option<NodeId>,
    target_order: Option<i64>,
) -> Result<MoveOutcome, NodeOperationError> {
    let node = store
        .get_node(owner_id, node_id)
        .await?
        .ok_or_else(|| NodeOperationError::node_not_found(node_id))?;

    if let Some(parent_id) = new_parent_id {
        if parent_id == node_id {
            return Err(NodeOperationError::SelfParent { node_id });
        }
        if !store.node_exists(owner_id, parent_id).await? {
            return Err(NodeOperationError::parent_not_found(parent_id));
        }
        if would_create_cycle(store, owner_id, node_id, parent_id).await? {
            return Err(NodeOperationError::circular_reference(node_id, parent_id));
        }
    }

    let old_parent_id = node.parent_id;
    let parent_changed = old_parent_id != new_parent_id;

    if parent_changed {
        store.set_parent(owner_id, node_id, new_parent_id).await?;
    }

    let siblings: Vec<Node> = store
        .get_children(owner_id, new_parent_id)
        .await?
        .into_iter()
        .filter(|sibling| sibling.id != node_id)
        .collect();

    let group_size = siblings.len() as i64;
    let target = target_order
        .unwrap_or(group_size + 1)
        .clamp(1, group_size + 1);

    let assignments = place_in_group(&siblings, node_id, target);
    store.write_orders(owner_id, &assignments).await?;

    let mut changed = ChangedNodes::new();
    changed.record(node_id);
    changed.extend(assignments.iter().map(|(id, _)| *id));

    if parent_changed {
        let renumbered = renumber_group(store, owner_id, old_parent_id).await?;
        changed.extend(renumbered.iter().map(|sibling| sibling.id));
    }

    tracing::debug!(
        "Moved node {} from {:?} to {:?} at order {} ({} node(s) written, owner {})",
        node_id,
        old_parent_id,
        new_parent_id,
        target,
        changed.len(),
        owner_id
    );

    Ok(MoveOutcome {
        old_parent_id,
        changed: changed.load(store, owner_id).await?,
    })
}

/// Dense 1..N+1 numbering of `siblings` with `moved` slotted in at `target`
///
/// The moved node is always part of the result; siblings only when their
/// order actually changes.
fn place_in_group(siblings: &[Node], moved: NodeId, target: i64) -> Vec<(NodeId, i64)> {
    let mut assignments = Vec::new();
    let mut counter = 1i64;
    let mut placed = false;

    for sibling in siblings {
        if counter == target {
            assignments.push((moved, counter));
            counter += 1;
            placed = true;
        }
        if sibling.order != Some(counter) {
            assignments.push((sibling.id, counter));
        }
        counter += 1;
    }

    if !placed {
        assignments.push((moved, counter));
    }

    assignments
}
