//! Data Models
//!
//! This module contains the data structures shared by the storage layer and
//! the tree engine:
//!
//! - `Node` - One element of an owner's forest
//! - `NewNode` / `NodeUpdate` - Explicit, typed change sets
//! - `OwnerSettings` - Subtree lock and show mode
//! - `CyclePath` / `FixedNode` - Cycle audit results

mod cycle;
mod node;
mod owner;

pub use cycle::{CyclePath, FixedNode};
pub use node::{
    DeleteResult, NewNode, Node, NodeFilter, NodeId, NodeUpdate, OwnerId, ValidationError,
    MAX_TITLE_LENGTH,
};
pub use owner::{OwnerSettings, ShowMode};
