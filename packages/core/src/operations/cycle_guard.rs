//! Cycle Guard
//!
//! Two entry points:
//!
//! - [`would_create_cycle`] answers "may `node` be re-parented under
//!   `candidate`?" against the live store, inside the caller's transaction.
//! - [`find_cycles`] audits a snapshot of the forest and reports every
//!   existing cycle as a closed path.
//!
//! Both track visited IDs, so a forest that is already corrupted cannot make
//! either of them loop.

use crate::db::NodeStore;
use crate::models::{CyclePath, Node, NodeId, OwnerId};
use crate::operations::forest::ForestIndex;
use crate::operations::NodeOperationError;
use std::collections::{HashMap, HashSet, VecDeque};

/// Whether making `candidate_parent` the parent of `node_id` would close a loop
///
/// True iff the candidate is the node itself or one of its descendants.
/// Descendants are collected breadth-first over the owner-scoped children
/// relation. If the walk comes back to `node_id` the stored forest already
/// holds a cycle through it, which is reported as
/// [`NodeOperationError::ExistingCycle`] with the closed path.
pub async fn would_create_cycle(
    store: &dyn NodeStore,
    owner_id: OwnerId,
    node_id: NodeId,
    candidate_parent: NodeId,
) -> Result<bool, NodeOperationError> {
    if candidate_parent == node_id {
        return Ok(true);
    }

    // child -> the node it was reached from
    let mut reached_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::from([node_id]);
    let mut found = false;

    while let Some(current) = queue.pop_front() {
        for child in store.get_children(owner_id, Some(current)).await? {
            if child.id == node_id {
                let path = closed_path(&reached_from, node_id, current);
                tracing::warn!(
                    "Existing cycle through node {} (owner {}): {:?}",
                    node_id,
                    owner_id,
                    path
                );
                return Err(NodeOperationError::ExistingCycle {
                    path: CyclePath {
                        owner_id,
                        node_id,
                        parent_id: current,
                        path,
                    },
                });
            }

            if reached_from.contains_key(&child.id) {
                continue;
            }
            reached_from.insert(child.id, current);

            if child.id == candidate_parent {
                found = true;
            }
            queue.push_back(child.id);
        }
    }

    Ok(found)
}

/// `[start, .., last, start]` rebuilt from the BFS predecessor map
fn closed_path(reached_from: &HashMap<NodeId, NodeId>, start: NodeId, last: NodeId) -> Vec<NodeId> {
    let mut reversed = vec![start, last];
    let mut current = last;
    while current != start {
        match reached_from.get(&current) {
            Some(&previous) => {
                reversed.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    if current == start && reversed.last() != Some(&start) {
        reversed.push(start);
    }
    reversed.reverse();
    reversed
}

/// Find every parent-pointer cycle in `nodes`
///
/// For each node with a parent that is not already part of a reported cycle,
/// the node's descendants are collected; if its own parent is among them the
/// node sits on a cycle. The reported path starts at the node, follows a
/// depth-first route down to its parent and repeats the node's ID to close the
/// loop. A node that is its own parent is reported as `[n, n]`.
///
/// `nodes` may span several owners; parent links are only followed within
/// one owner.
///
/// # Examples
///
/// ```rust
/// # use outliner_core::models::Node;
/// # use outliner_core::operations::find_cycles;
/// # fn nodes_from_somewhere() -> Vec<Node> { Vec::new() }
/// let nodes = nodes_from_somewhere();
/// for cycle in find_cycles(&nodes) {
///     println!("node {} is its own ancestor: {}", cycle.node_id, cycle);
/// }
/// ```
pub fn find_cycles(nodes: &[Node]) -> Vec<CyclePath> {
    let index = ForestIndex::new(nodes);
    let mut checked: HashSet<NodeId> = HashSet::new();
    let mut cycles = Vec::new();

    for node in nodes {
        let Some(parent_id) = node.parent_id else {
            continue;
        };
        if checked.contains(&node.id) {
            continue;
        }

        if parent_id == node.id {
            checked.insert(node.id);
            cycles.push(CyclePath {
                owner_id: node.owner_id,
                node_id: node.id,
                parent_id,
                path: vec![node.id, node.id],
            });
            continue;
        }

        if !index.descendants(node.owner_id, node.id).contains(&parent_id) {
            continue;
        }

        let Some(mut path) = index.path_between(node.owner_id, node.id, parent_id) else {
            continue;
        };
        path.push(node.id);
        checked.extend(path.iter().copied());

        cycles.push(CyclePath {
            owner_id: node.owner_id,
            node_id: node.id,
            parent_id,
            path,
        });
    }

    cycles
}
