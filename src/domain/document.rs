//! Persisted shape of a mind map and the load-time integrity check.
//!
//! Files can be hand-edited, so nothing in a document is trusted: depth is
//! recomputed from parent chains and every link is checked in both directions.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::map::{MindMap, MAX_DEPTH};
use crate::domain::node::{Node, NodeId, NodeRecord};

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// A map as written to disk: title plus node records in forest pre-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl MindMap {
    /// Snapshot the map; cards keep their order, children keep theirs.
    #[instrument(level = "debug", skip(self))]
    pub fn to_document(&self) -> MapDocument {
        MapDocument {
            title: self.title().to_string(),
            version: DOCUMENT_VERSION,
            nodes: self.iter().map(|(_, node)| NodeRecord::from(node)).collect(),
        }
    }

    /// Rebuild a map, failing with [`DomainError::CorruptData`] on the first broken invariant.
    #[instrument(level = "debug", skip(document), fields(nodes = document.nodes.len()))]
    pub fn from_document(document: MapDocument) -> DomainResult<MindMap> {
        if document.version > DOCUMENT_VERSION {
            return Err(corrupt(format!(
                "unsupported document version {} (max {})",
                document.version, DOCUMENT_VERSION
            )));
        }

        let mut by_id: HashMap<NodeId, &NodeRecord> = HashMap::new();
        for record in &document.nodes {
            if record.text.trim().is_empty() {
                return Err(corrupt(format!("node {} has empty text", record.id)));
            }
            if by_id.insert(record.id, record).is_some() {
                return Err(corrupt(format!("duplicate node id {}", record.id)));
            }
        }

        for record in &document.nodes {
            check_links(record, &by_id)?;
        }
        for record in &document.nodes {
            check_depth(record, &by_id)?;
        }

        debug!("from_document: {} node(s) validated", document.nodes.len());
        let nodes = document.nodes.into_iter().map(Node::from).collect();
        Ok(MindMap::from_validated(document.title, nodes))
    }
}

fn corrupt(message: String) -> DomainError {
    DomainError::CorruptData(message)
}

/// Parent and child links must exist and agree with each other.
fn check_links(record: &NodeRecord, by_id: &HashMap<NodeId, &NodeRecord>) -> DomainResult<()> {
    if let Some(parent_id) = record.parent_id {
        if parent_id == record.id {
            return Err(corrupt(format!("node {} is its own parent", record.id)));
        }
        let parent = by_id.get(&parent_id).ok_or_else(|| {
            corrupt(format!(
                "node {} references missing parent {}",
                record.id, parent_id
            ))
        })?;
        if !parent.children.contains(&record.id) {
            return Err(corrupt(format!(
                "node {} claims parent {} but is not among its children",
                record.id, parent_id
            )));
        }
    }

    let mut seen = HashSet::new();
    for child_id in &record.children {
        if !seen.insert(child_id) {
            return Err(corrupt(format!(
                "child {} listed twice under {}",
                child_id, record.id
            )));
        }
        let child = by_id.get(child_id).ok_or_else(|| {
            corrupt(format!(
                "node {} lists missing child {}",
                record.id, child_id
            ))
        })?;
        if child.parent_id != Some(record.id) {
            return Err(corrupt(format!(
                "node {} lists child {} whose parent is {}",
                record.id,
                child_id,
                child
                    .parent_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "none".into())
            )));
        }
    }
    Ok(())
}

/// Walk up to the card, rejecting loops and anything deeper than [`MAX_DEPTH`].
fn check_depth(record: &NodeRecord, by_id: &HashMap<NodeId, &NodeRecord>) -> DomainResult<()> {
    let mut visited = HashSet::from([record.id]);
    let mut depth = 0;
    let mut current = record;
    while let Some(parent_id) = current.parent_id {
        if !visited.insert(parent_id) {
            return Err(corrupt(format!(
                "cycle through node {} detected from {}",
                parent_id, record.id
            )));
        }
        depth += 1;
        if depth > MAX_DEPTH {
            return Err(corrupt(format!(
                "node {} sits deeper than max depth {}",
                record.id, MAX_DEPTH
            )));
        }
        current = by_id.get(&parent_id).copied().ok_or_else(|| {
            corrupt(format!(
                "node {} references missing parent {}",
                current.id, parent_id
            ))
        })?;
    }
    Ok(())
}
