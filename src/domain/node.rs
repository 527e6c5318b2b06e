//! Node model: one addressable unit of the mind map and its direct links.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Stable identity of a node, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::Validation(format!("not a node id: '{}'", s)))
    }
}

/// A single idea in the map.
///
/// Links are stored as ids; keeping them consistent across nodes is the
/// job of [`crate::domain::MindMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    /// User-supplied label, never empty
    pub text: String,
    /// Owning node, None for cards
    pub parent_id: Option<NodeId>,
    /// Child ids in display order
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(text: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: NodeId::new(),
            text: text.into(),
            parent_id,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {})", self.text, self.id)
    }
}

/// Flat, serializable form of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub text: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            text: node.text.clone(),
            parent_id: node.parent_id,
            children: node.children.clone(),
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            parent_id: record.parent_id,
            children: record.children,
        }
    }
}
