//! In-memory view over a snapshot of nodes
//!
//! Used where a whole owner's forest is already loaded: the cycle audit, the
//! visible-forest filter and the admin tree dump. Every traversal tracks
//! visited IDs so corrupted parent pointers cannot make it loop.

use crate::models::{Node, NodeId, OwnerId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Children lookup keyed by (owner, parent)
pub struct ForestIndex<'a> {
    by_id: HashMap<NodeId, &'a Node>,
    children: HashMap<(OwnerId, Option<NodeId>), Vec<&'a Node>>,
}

impl<'a> ForestIndex<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<(OwnerId, Option<NodeId>), Vec<&'a Node>> = HashMap::new();

        for node in nodes {
            by_id.insert(node.id, node);
            children
                .entry((node.owner_id, node.parent_id))
                .or_default()
                .push(node);
        }

        for group in children.values_mut() {
            group.sort_by_key(|node| node.sibling_sort_key());
        }

        Self { by_id, children }
    }

    pub fn get(&self, id: NodeId) -> Option<&'a Node> {
        self.by_id.get(&id).copied()
    }

    /// Children of `parent` (roots when `None`) in sibling order
    pub fn children(&self, owner_id: OwnerId, parent: Option<NodeId>) -> &[&'a Node] {
        self.children
            .get(&(owner_id, parent))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// IDs reachable from `root` over the children relation, `root` excluded
    ///
    /// `root` is reported as its own descendant when it sits on a cycle.
    pub fn descendants(&self, owner_id: OwnerId, root: NodeId) -> HashSet<NodeId> {
        let mut found = HashSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for child in self.children(owner_id, Some(current)) {
                if found.insert(child.id) {
                    queue.push_back(child.id);
                }
            }
        }

        found
    }

    /// Depth-first path from `start` down to `target`, both included
    pub fn path_between(
        &self,
        owner_id: OwnerId,
        start: NodeId,
        target: NodeId,
    ) -> Option<Vec<NodeId>> {
        let mut path = vec![start];
        let mut cursors = vec![0usize];
        let mut visited = HashSet::from([start]);

        while let Some(&current) = path.last() {
            if current == target && path.len() > 1 {
                return Some(path);
            }

            let depth = path.len() - 1;
            let next = self
                .children(owner_id, Some(current))
                .get(cursors[depth])
                .map(|child| child.id);

            match next {
                Some(child) => {
                    cursors[depth] += 1;
                    if child == target || visited.insert(child) {
                        path.push(child);
                        cursors.push(0);
                    }
                }
                None => {
                    path.pop();
                    cursors.pop();
                }
            }
        }

        None
    }

    /// Pre-order walk of the subtree under `root` (root first) with depths
    pub fn walk(&self, owner_id: OwnerId, root: Option<NodeId>) -> Vec<(usize, &'a Node)> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(usize, &'a Node)> = match root {
            Some(id) => self.get(id).into_iter().map(|node| (0, node)).collect(),
            None => self
                .children(owner_id, None)
                .iter()
                .rev()
                .map(|node| (0, *node))
                .collect(),
        };

        while let Some((depth, node)) = stack.pop() {
            if !visited.insert(node.id) {
                continue;
            }
            out.push((depth, node));
            for child in self.children(owner_id, Some(node.id)).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: NodeId, parent_id: Option<NodeId>, order: Option<i64>) -> Node {
        let now = Utc::now();
        Node {
            id,
            owner_id: 1,
            parent_id,
            order,
            title: format!("node {}", id),
            description: None,
            completed: false,
            archived: false,
            collapsed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_children_sorted_with_unassigned_last() {
        let nodes = vec![
            node(1, None, Some(1)),
            node(2, Some(1), None),
            node(3, Some(1), Some(2)),
            node(4, Some(1), Some(1)),
        ];
        let index = ForestIndex::new(&nodes);

        let ids: Vec<NodeId> = index.children(1, Some(1)).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert!(index.children(2, Some(1)).is_empty());
    }

    #[test]
    fn test_descendants_and_walk() {
        let nodes = vec![
            node(1, None, Some(1)),
            node(2, Some(1), Some(1)),
            node(3, Some(2), Some(1)),
            node(4, None, Some(2)),
        ];
        let index = ForestIndex::new(&nodes);

        assert_eq!(index.descendants(1, 1), HashSet::from([2, 3]));
        assert!(index.descendants(1, 4).is_empty());

        let walked: Vec<(usize, NodeId)> =
            index.walk(1, None).into_iter().map(|(d, n)| (d, n.id)).collect();
        assert_eq!(walked, vec![(0, 1), (1, 2), (2, 3), (0, 4)]);
    }

    #[test]
    fn test_traversals_terminate_on_cycles() {
        let nodes = vec![node(5, Some(7), Some(1)), node(7, Some(5), Some(1))];
        let index = ForestIndex::new(&nodes);

        assert_eq!(index.descendants(1, 5), HashSet::from([5, 7]));
        assert_eq!(index.path_between(1, 5, 7), Some(vec![5, 7]));
        assert_eq!(index.walk(1, Some(5)).len(), 2);
    }
}
