//! Tree Mutation Engine
//!
//! The structural rules of the outliner live here, written against a
//! `&dyn NodeStore` that is already bound to one open transaction:
//!
//! - [`cycle_guard`]: acyclicity checks and the forest audit
//! - [`order_maintainer`]: dense, unique sibling orders
//! - [`move_engine`]: re-parenting plus positioning
//! - [`archive_cascade`]: archive / restore propagation
//!
//! Nothing in this module opens, commits or retries transactions; that is the
//! job of [`crate::services::NodeService`] together with [`RetryPolicy`].

pub mod archive_cascade;
pub mod cycle_guard;
mod error;
pub mod forest;
pub mod move_engine;
pub mod order_maintainer;
pub mod retry;

pub use archive_cascade::{archive_subtree, restore_ancestor_chain, restore_subtree};
pub use cycle_guard::{find_cycles, would_create_cycle};
pub use error::{ErrorKind, NodeOperationError};
pub use forest::ForestIndex;
pub use move_engine::{move_node, ChangedNodes, MoveOutcome};
pub use order_maintainer::{append_node, next_order, renumber_group, reorder};
pub use retry::RetryPolicy;
