//! Read-only views of the map as `termtree` trees and plain-text exports.

use termtree::Tree;
use tracing::instrument;

use crate::domain::error::DomainResult;
use crate::domain::map::MindMap;
use crate::domain::node::{Node, NodeId};

/// Rule printed between cards in a text export.
pub const CARD_SEPARATOR: &str = "--------------------";

impl MindMap {
    /// One tree per card, or a single tree for the subtree at `id`.
    ///
    /// Labels read `text (ID: id)`.
    pub fn render_tree(&self, id: Option<&NodeId>) -> DomainResult<Vec<Tree<String>>> {
        self.render_tree_with(id, |node| node.to_string())
    }

    /// Same as [`MindMap::render_tree`] with a caller-chosen label.
    #[instrument(level = "debug", skip(self, label))]
    pub fn render_tree_with<F>(&self, id: Option<&NodeId>, label: F) -> DomainResult<Vec<Tree<String>>>
    where
        F: Fn(&Node) -> String,
    {
        let starts: Vec<NodeId> = match id {
            Some(id) => vec![self.node(id)?.id()],
            None => self.roots().to_vec(),
        };
        starts
            .iter()
            .map(|start| self.build_tree(start, &label))
            .collect()
    }

    fn build_tree<F>(&self, id: &NodeId, label: &F) -> DomainResult<Tree<String>>
    where
        F: Fn(&Node) -> String,
    {
        let node = self.node(id)?;
        let leaves = node
            .children
            .iter()
            .map(|child| self.build_tree(child, label))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Tree::new(label(node)).with_leaves(leaves))
    }

    /// Every card as a text tree, separated by [`CARD_SEPARATOR`].
    ///
    /// Returns an empty string for a map without cards.
    pub fn export_text(&self) -> DomainResult<String> {
        let trees = self.render_tree_with(None, |node| {
            if node.is_root() {
                format!("{} [CARD]", node)
            } else {
                node.to_string()
            }
        })?;
        Ok(trees
            .iter()
            .map(|tree| format!("{}{}\n", tree, CARD_SEPARATOR))
            .collect())
    }
}
