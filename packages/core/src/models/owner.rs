//! Per-owner view settings: the subtree lock and the archived-visibility mode.

use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which nodes the owner's list shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowMode {
    /// Only unarchived nodes
    #[default]
    Active,
    /// Only archived nodes
    Archived,
    /// Everything
    All,
}

impl ShowMode {
    /// Archived-flag filter matching this mode (`None` = no filter)
    pub fn archived_filter(self) -> Option<bool> {
        match self {
            ShowMode::Active => Some(false),
            ShowMode::Archived => Some(true),
            ShowMode::All => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShowMode::Active => "active",
            ShowMode::Archived => "archived",
            ShowMode::All => "all",
        }
    }
}

impl fmt::Display for ShowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ShowMode::Active),
            "archived" => Ok(ShowMode::Archived),
            "all" => Ok(ShowMode::All),
            other => Err(format!("Unknown show mode '{}'", other)),
        }
    }
}

/// Owner-level settings row
///
/// `locked_node_id` restricts the visible forest to one subtree and may only
/// point at a node that currently has at least one child.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSettings {
    pub locked_node_id: Option<NodeId>,

    #[serde(default)]
    pub show_mode: ShowMode,
}
