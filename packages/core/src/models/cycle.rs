//! Cycle audit results.

use super::node::{NodeId, OwnerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parent-pointer cycle found by the forest audit.
///
/// `path` starts at the offending node, walks down through its descendants to
/// the node's own parent and repeats the starting ID to show the closed loop,
/// e.g. `[5, 7, 5]` when 5's parent is 7 and 7's parent is 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePath {
    pub owner_id: OwnerId,

    /// Node whose parent is one of its own descendants
    pub node_id: NodeId,

    /// That node's current parent
    pub parent_id: NodeId,

    pub path: Vec<NodeId>,
}

impl CyclePath {
    /// IDs taking part in the loop (closing ID excluded)
    pub fn members(&self) -> &[NodeId] {
        match self.path.split_last() {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.path,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.path.contains(&id)
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.path.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", rendered.join(" > "))
    }
}

/// A node detached by cycle repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedNode {
    pub owner_id: OwnerId,
    pub node_id: NodeId,
    pub previous_parent_id: NodeId,
}
