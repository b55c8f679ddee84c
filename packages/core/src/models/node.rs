//! Node Data Structures
//!
//! This module defines the core `Node` struct and the explicit change sets the
//! engine accepts for creating and editing nodes.
//!
//! # Architecture
//!
//! - **Owner-partitioned**: Every node belongs to exactly one owner; parent links
//!   never cross owners
//! - **Dense sibling order**: `order` is 1..N inside each (owner, parent) group
//! - **Identity-only parent link**: `parent_id` is a backlink, archiving never touches it
//!
//! # Examples
//!
//! ```rust
//! use outliner_core::models::{NewNode, NodeUpdate};
//!
//! // Create payload for a child of node 42
//! let new_node = NewNode::new("Buy milk").with_parent(42);
//! assert!(new_node.validate().is_ok());
//!
//! // Change set that completes a node and clears its description
//! let update = NodeUpdate::new()
//!     .with_completed(true)
//!     .with_description(None);
//! assert!(!update.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Node identifier (unique across the whole store)
pub type NodeId = i64;

/// Owner (user) identifier
pub type OwnerId = i64;

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// Validation errors for node payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Title exceeds {max} characters (got {actual})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("Invalid order value {0}: orders start at 1")]
    InvalidOrder(i64),
}

/// A single element of an owner's forest.
///
/// # Fields
///
/// - `id`: Store-wide unique identifier
/// - `owner_id`: Owning user; all structural relationships stay inside one owner
/// - `parent_id`: Optional parent (None = root)
/// - `order`: Position among siblings (None = not yet assigned, sorted after assigned siblings)
/// - `title` / `description`: User content
/// - `completed`, `archived`, `collapsed`: Status flags (`collapsed` is UI-only)
/// - `created_at`: Tie-break for sibling ordering
/// - `updated_at`: Last write timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    pub owner_id: OwnerId,

    /// Parent node ID (identity backlink, never an ownership edge)
    pub parent_id: Option<NodeId>,

    /// Sibling order (1-based, dense within the group after every operation)
    pub order: Option<i64>,

    pub title: String,

    pub description: Option<String>,

    pub completed: bool,

    pub archived: bool,

    /// UI-only flag, orthogonal to structure
    pub collapsed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Check if this node is a root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Sort key used for sibling groups: assigned orders first, then creation
    /// time, then ID for a total order.
    pub fn sibling_sort_key(&self) -> (bool, i64, DateTime<Utc>, NodeId) {
        (
            self.order.is_none(),
            self.order.unwrap_or(0),
            self.created_at,
            self.id,
        )
    }
}

/// Create payload for a new node.
///
/// The owner is passed separately to every engine call; `order` is never
/// supplied by the caller, it is always `max(sibling order) + 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default)]
    pub parent_id: Option<NodeId>,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: bool,
}

impl NewNode {
    /// Create a root-level payload with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Place the new node under `parent_id`
    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the completed flag
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Validate the payload
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use outliner_core::models::{NewNode, ValidationError};
    /// assert!(NewNode::new("Groceries").validate().is_ok());
    /// assert_eq!(
    ///     NewNode::new("   ").validate(),
    ///     Err(ValidationError::MissingField("title".to_string()))
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField("title".to_string()));
    }

    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_LENGTH,
            actual: length,
        });
    }

    Ok(())
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - value → Some(Some(value)) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Explicit field-by-field change set for `UpdateNode`
///
/// All fields are optional; only provided fields are written.
///
/// # Double-Option Pattern for Nullable Fields
///
/// `description` and `parent_id` distinguish between:
///
/// - `None`: Don't change this field
/// - `Some(None)`: Set the field to NULL
/// - `Some(Some(value))`: Set the field to the specified value
///
/// A `parent_id` change is applied through the move engine, so the node is
/// appended to the destination group and the source group is renumbered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<NodeId>>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.collapsed.is_none()
            && self.parent_id.is_none()
    }

    /// True when the change set touches columns other than `parent_id`
    pub fn has_field_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.completed.is_some()
            || self.collapsed.is_some()
    }

    /// Validate the provided fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// Result of a delete operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// ID of the removed node
    pub deleted_id: NodeId,

    /// Former siblings whose order changed when the gap was closed
    pub renumbered: Vec<Node>,
}

/// Filter for bulk node reads
///
/// `owner_id = None` is only used by the diagnostic cycle audit, which scans
/// every owner; request paths always scope by owner.
///
/// # Examples
///
/// ```rust
/// # use outliner_core::models::NodeFilter;
/// let live = NodeFilter::for_owner(7).with_archived(false);
/// assert_eq!(live.owner_id, Some(7));
/// assert_eq!(live.archived, Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl NodeFilter {
    /// Create a new empty filter (every owner, every node)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by owner
    pub fn for_owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id: Some(owner_id),
            archived: None,
        }
    }

    /// Filter by archived flag
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn node(id: NodeId, order: Option<i64>, created_offset: i64) -> Node {
        let created_at = Utc::now() + Duration::seconds(created_offset);
        Node {
            id,
            owner_id: 1,
            parent_id: None,
            order,
            title: format!("Node {}", id),
            description: None,
            completed: false,
            archived: false,
            collapsed: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_title_validation() {
        assert!(NewNode::new("ok").validate().is_ok());
        assert_eq!(
            NewNode::new("").validate(),
            Err(ValidationError::MissingField("title".to_string()))
        );

        let long_title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert_eq!(
            NewNode::new(long_title).validate(),
            Err(ValidationError::TitleTooLong {
                max: MAX_TITLE_LENGTH,
                actual: MAX_TITLE_LENGTH + 1
            })
        );

        // Multi-byte characters count as one
        let accented = "é".repeat(MAX_TITLE_LENGTH);
        assert!(NewNode::new(accented).validate().is_ok());
    }

    #[test]
    fn test_sibling_sort_key_places_unassigned_last() {
        let mut nodes = vec![node(3, None, 0), node(2, Some(2), 5), node(1, Some(1), 10)];
        nodes.sort_by_key(|n| n.sibling_sort_key());
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_sibling_sort_key_breaks_ties_by_created_at() {
        let mut nodes = vec![node(1, None, 10), node(2, None, 0)];
        nodes.sort_by_key(|n| n.sibling_sort_key());
        assert_eq!(nodes[0].id, 2);
    }

    #[test]
    fn test_node_update_double_option_deserialization() {
        let missing: NodeUpdate = serde_json::from_value(json!({"title": "New"})).unwrap();
        assert_eq!(missing.parent_id, None);
        assert_eq!(missing.description, None);

        let cleared: NodeUpdate =
            serde_json::from_value(json!({"parentId": null, "description": null})).unwrap();
        assert_eq!(cleared.parent_id, Some(None));
        assert_eq!(cleared.description, Some(None));

        let set: NodeUpdate = serde_json::from_value(json!({"parentId": 9})).unwrap();
        assert_eq!(set.parent_id, Some(Some(9)));
        assert!(!set.has_field_changes());
    }

    #[test]
    fn test_node_update_is_empty() {
        assert!(NodeUpdate::new().is_empty());
        assert!(!NodeUpdate::new().with_collapsed(true).is_empty());
        assert!(NodeUpdate::new().with_title("").validate().is_err());
    }
}
