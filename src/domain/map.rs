//! Tree manager: sole owner of the node mapping.
//!
//! Nodes live in a generational arena and are addressed by [`NodeId`] through
//! an index map. Parent/child links are ids, so there is no shared ownership
//! to untangle and the whole map serializes as a flat list of records.
//!
//! Every mutation validates first and only then touches state, so a failed
//! call leaves the map exactly as it was.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeId};

/// Deepest allowed depth index: card = 0, child = 1, grandchild = 2.
pub const MAX_DEPTH: usize = 2;

/// What a delete would remove, handed to the front-end before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePreview {
    pub id: NodeId,
    pub text: String,
    /// The node itself followed by its descendants in pre-order
    pub ids: Vec<NodeId>,
    /// Cards need an explicit go-ahead from the caller
    pub requires_confirmation: bool,
}

/// A forest of cards, each heading a subtree at most three levels deep.
#[derive(Debug, Clone)]
pub struct MindMap {
    title: String,
    arena: Arena<Node>,
    index: HashMap<NodeId, Index>,
    roots: Vec<NodeId>,
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new("")
    }
}

impl MindMap {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            arena: Arena::new(),
            index: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Card ids in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).and_then(|&idx| self.arena.get(idx))
    }

    fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&idx) => self.arena.get_mut(idx),
            None => None,
        }
    }

    /// Like [`MindMap::get`], but a missing id is an error.
    pub fn node(&self, id: &NodeId) -> DomainResult<&Node> {
        self.get(id).ok_or(DomainError::NotFound(*id))
    }

    /// Distance from the node to its card.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self, id: &NodeId) -> DomainResult<usize> {
        let mut depth = 0;
        let mut current = self.node(id)?;
        while let Some(parent_id) = current.parent_id {
            current = self.node(&parent_id)?;
            depth += 1;
        }
        Ok(depth)
    }

    /// Height of the subtree below `id`: 0 for a leaf, 1 with children, 2 with grandchildren.
    #[instrument(level = "trace", skip(self))]
    pub fn subtree_height(&self, id: &NodeId) -> DomainResult<usize> {
        self.node(id)?;
        Ok(self
            .iter_subtree(id)
            .map(|(depth, _)| depth)
            .max()
            .unwrap_or(0))
    }

    /// Nodes from the card down to `id`, inclusive.
    pub fn path(&self, id: &NodeId) -> DomainResult<Vec<&Node>> {
        let mut path = vec![self.node(id)?];
        while let Some(parent_id) = path[path.len() - 1].parent_id {
            path.push(self.node(&parent_id)?);
        }
        path.reverse();
        Ok(path)
    }

    /// Pre-order walk over every card and its subtree, with absolute depth.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.roots.iter().rev().map(|&id| (id, 0)).collect())
    }

    /// Pre-order walk over one subtree, with depth relative to `id`.
    pub fn iter_subtree(&self, id: &NodeId) -> TreeIterator<'_> {
        let stack = if self.contains(id) {
            vec![(*id, 0)]
        } else {
            Vec::new()
        };
        TreeIterator::new(self, stack)
    }

    /// Insert a node whose links have already been validated.
    fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        let idx = self.arena.insert(node);
        self.index.insert(id, idx);
        id
    }

    /// Add a new card.
    #[instrument(level = "debug", skip(self))]
    pub fn create_root(&mut self, text: &str) -> DomainResult<NodeId> {
        let text = validate_text(text)?;
        let id = self.insert(Node::new(text, None));
        self.roots.push(id);
        debug!("create_root: {}", id);
        Ok(id)
    }

    /// Add a node under `parent_id`, or a new card when no parent is given.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(&mut self, text: &str, parent_id: Option<&NodeId>) -> DomainResult<NodeId> {
        let Some(parent_id) = parent_id else {
            return self.create_root(text);
        };
        let text = validate_text(text)?;
        let depth = self.depth(parent_id)? + 1;
        if depth > MAX_DEPTH {
            return Err(DomainError::DepthExceeded {
                text,
                depth,
                max: MAX_DEPTH,
            });
        }

        let id = self.insert(Node::new(text, Some(*parent_id)));
        if let Some(parent) = self.get_mut(parent_id) {
            parent.children.push(id);
        }
        debug!("add_node: {} under {} at depth {}", id, parent_id, depth);
        Ok(id)
    }

    /// Everything a delete of `id` would remove.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_preview(&self, id: &NodeId) -> DomainResult<DeletePreview> {
        let node = self.node(id)?;
        Ok(DeletePreview {
            id: *id,
            text: node.text.clone(),
            ids: self.iter_subtree(id).map(|(_, n)| n.id()).collect(),
            requires_confirmation: node.is_root(),
        })
    }

    /// Remove `id` and its whole subtree, returning the removed ids.
    ///
    /// Deleting a card fails with [`DomainError::ConfirmationRequired`] unless
    /// `confirmed` is set; the caller decides how to ask.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&mut self, id: &NodeId, confirmed: bool) -> DomainResult<Vec<NodeId>> {
        let preview = self.delete_preview(id)?;
        if preview.requires_confirmation && !confirmed {
            return Err(DomainError::ConfirmationRequired {
                id: *id,
                text: preview.text,
                count: preview.ids.len(),
            });
        }

        let parent_id = self.node(id)?.parent_id;
        match parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.get_mut(&parent_id) {
                    parent.children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }
        for removed in &preview.ids {
            if let Some(idx) = self.index.remove(removed) {
                self.arena.remove(idx);
            }
        }
        debug!("delete_node: removed {} node(s)", preview.ids.len());
        Ok(preview.ids)
    }

    /// Replace the text of `id`, returning the previous text.
    #[instrument(level = "debug", skip(self))]
    pub fn edit_node(&mut self, id: &NodeId, new_text: &str) -> DomainResult<String> {
        let node = self.get_mut(id).ok_or(DomainError::NotFound(*id))?;
        let text = validate_text(new_text)?;
        Ok(std::mem::replace(&mut node.text, text))
    }

    /// Re-parent `id` (and its subtree) under `new_parent_id`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, id: &NodeId, new_parent_id: &NodeId) -> DomainResult<()> {
        let node = self.node(id)?;
        self.node(new_parent_id)?;
        if id == new_parent_id {
            return Err(DomainError::SelfParent(*id));
        }
        if self.is_descendant(new_parent_id, id)? {
            return Err(DomainError::Cycle {
                node: *id,
                new_parent: *new_parent_id,
            });
        }
        if node.parent_id.as_ref() == Some(new_parent_id) {
            return Err(DomainError::Validation(format!(
                "'{}' is already under {}",
                node.text, new_parent_id
            )));
        }
        let deepest = self.depth(new_parent_id)? + 1 + self.subtree_height(id)?;
        if deepest > MAX_DEPTH {
            return Err(DomainError::DepthExceeded {
                text: node.text.clone(),
                depth: deepest,
                max: MAX_DEPTH,
            });
        }

        let old_parent_id = node.parent_id;

        match old_parent_id {
            Some(old_parent_id) => {
                if let Some(old_parent) = self.get_mut(&old_parent_id) {
                    old_parent.children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }
        if let Some(new_parent) = self.get_mut(new_parent_id) {
            new_parent.children.push(*id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent_id = Some(*new_parent_id);
        }
        debug!("move_node: {} now under {}", id, new_parent_id);
        Ok(())
    }

    /// True when `candidate` sits somewhere below `ancestor`.
    fn is_descendant(&self, candidate: &NodeId, ancestor: &NodeId) -> DomainResult<bool> {
        let mut current = self.node(candidate)?.parent_id;
        while let Some(parent_id) = current {
            if &parent_id == ancestor {
                return Ok(true);
            }
            current = self.node(&parent_id)?.parent_id;
        }
        Ok(false)
    }

    /// Lazily yield nodes whose text satisfies `predicate`, in pre-order.
    pub fn find<P>(&self, predicate: P) -> Find<'_, P>
    where
        P: FnMut(&str) -> bool,
    {
        Find {
            inner: self.iter(),
            predicate,
        }
    }

    /// Case-insensitive substring search over node text.
    pub fn find_text<'a>(&'a self, query: &str) -> Find<'a, impl FnMut(&str) -> bool> {
        let needle = query.to_lowercase();
        self.find(move |text: &str| text.to_lowercase().contains(&needle))
    }

    /// Direct children of `id` in order, or all cards when `id` is None.
    pub fn list_children(&self, id: Option<&NodeId>) -> DomainResult<Vec<&Node>> {
        let ids = match id {
            Some(id) => &self.node(id)?.children,
            None => &self.roots,
        };
        ids.iter().map(|child| self.node(child)).collect()
    }

    /// Restore a map from records already checked by the document loader.
    pub(crate) fn from_validated(title: String, nodes: Vec<Node>) -> Self {
        let mut map = Self::new(title);
        for node in nodes {
            if node.is_root() {
                map.roots.push(node.id());
            }
            map.insert(node);
        }
        map
    }
}

fn validate_text(text: &str) -> DomainResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::Validation("node text must not be empty".into()));
    }
    Ok(text.to_string())
}

/// Depth-first, left-to-right traversal yielding `(depth, node)`.
pub struct TreeIterator<'a> {
    map: &'a MindMap,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> TreeIterator<'a> {
    fn new(map: &'a MindMap, stack: Vec<(NodeId, usize)>) -> Self {
        Self { map, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, depth)) = self.stack.pop() {
            if let Some(node) = self.map.get(&current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some((depth, node));
            }
        }
        None
    }
}

/// Lazy search results; see [`MindMap::find`].
pub struct Find<'a, P> {
    inner: TreeIterator<'a>,
    predicate: P,
}

impl<'a, P> Iterator for Find<'a, P>
where
    P: FnMut(&str) -> bool,
{
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        for (_, node) in self.inner.by_ref() {
            if (self.predicate)(&node.text) {
                return Some(node);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn reachable(map: &MindMap) -> HashSet<NodeId> {
        map.iter().map(|(_, node)| node.id()).collect()
    }

    // Shopping List
    // ├── Groceries
    // │   └── Milk
    // └── Hardware
    fn shopping() -> (MindMap, NodeId, NodeId, NodeId, NodeId) {
        let mut map = MindMap::new("shopping");
        let root = map.create_root("Shopping List").unwrap();
        let groceries = map.add_node("Groceries", Some(&root)).unwrap();
        let hardware = map.add_node("Hardware", Some(&root)).unwrap();
        let milk = map.add_node("Milk", Some(&groceries)).unwrap();
        (map, root, groceries, hardware, milk)
    }

    #[test]
    fn given_added_nodes_when_computing_depth_then_follows_parent_chain() {
        let (map, root, groceries, _, milk) = shopping();
        assert_eq!(map.depth(&root).unwrap(), 0);
        assert_eq!(map.depth(&groceries).unwrap(), 1);
        assert_eq!(map.depth(&milk).unwrap(), 2);
    }

    #[test]
    fn given_blank_text_when_creating_root_then_validation_error() {
        let mut map = MindMap::default();
        let err = map.create_root("   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(map.is_empty());
    }

    #[test]
    fn given_tree_when_iterating_then_visits_in_pre_order() {
        let (map, ..) = shopping();
        let texts: Vec<_> = map.iter().map(|(d, n)| (d, n.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                (0, "Shopping List"),
                (1, "Groceries"),
                (2, "Milk"),
                (1, "Hardware")
            ]
        );
    }

    #[test]
    fn given_subtree_when_measuring_height_then_counts_levels_below() {
        let (map, root, groceries, hardware, _) = shopping();
        assert_eq!(map.subtree_height(&root).unwrap(), 2);
        assert_eq!(map.subtree_height(&groceries).unwrap(), 1);
        assert_eq!(map.subtree_height(&hardware).unwrap(), 0);
    }

    #[test]
    fn given_grandchild_when_asking_path_then_returns_card_first() {
        let (map, _, _, _, milk) = shopping();
        let path: Vec<_> = map
            .path(&milk)
            .unwrap()
            .iter()
            .map(|n| n.text.clone())
            .collect();
        assert_eq!(path, vec!["Shopping List", "Groceries", "Milk"]);
    }

    #[test]
    fn given_failed_move_when_inspecting_map_then_nothing_changed() {
        let (mut map, root, groceries, hardware, _) = shopping();
        // Groceries has a child, so under Hardware its child would sit at depth 3
        let err = map.move_node(&groceries, &hardware).unwrap_err();
        assert!(matches!(err, DomainError::DepthExceeded { depth: 3, .. }));
        assert_eq!(map.node(&root).unwrap().children, vec![groceries, hardware]);
        assert_eq!(map.node(&groceries).unwrap().parent_id, Some(root));
    }

    #[test]
    fn given_deleted_subtree_when_collecting_reachable_then_no_orphans_remain() {
        let (mut map, _, groceries, _, _) = shopping();
        map.delete_node(&groceries, false).unwrap();
        assert_eq!(reachable(&map).len(), map.len());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn given_find_consumed_when_searching_again_then_starts_fresh() {
        let (map, ..) = shopping();
        let mut first = map.find_text("o");
        assert!(first.next().is_some());
        let all: Vec<_> = map.find_text("o").collect();
        assert_eq!(all.len(), 2); // Shopping List, Groceries
    }
}
