//! Read-only projections of a document tree.
//!
//! All traversals are depth-first pre-order following child order, which is
//! what "document order" means everywhere in the crate. They fail closed: an
//! unresolvable root yields an empty result, and dangling child ids are skipped.

use std::collections::HashSet;

use crate::domain::{NodeId, NodeStore};

/// One preview block, keeping the id of the node it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewBlock {
    pub node_id: NodeId,
    pub text: String,
}

/// Concatenated content of every node, each followed by a blank line.
pub fn full_text(store: &NodeStore) -> String {
    walk(store)
        .map(|(_, node)| format!("{}\n\n", node.content))
        .collect()
}

/// One line per node: `<two spaces per depth>- <title> (id: <id>)`.
pub fn outline(store: &NodeStore) -> String {
    walk(store)
        .map(|(depth, node)| format!("{}- {} (id: {})\n", "  ".repeat(depth), node.title, node.id))
        .collect()
}

/// Lazy sequence of preview blocks, one per node.
///
/// The returned iterator can be cloned to restart from any point, and calling
/// this function again always starts from the root.
pub fn flat_preview(store: &NodeStore) -> FlatPreview<'_> {
    FlatPreview { walk: walk(store) }
}

/// Iterator returned by [`flat_preview`].
#[derive(Debug, Clone)]
pub struct FlatPreview<'a> {
    walk: Walk<'a>,
}

impl Iterator for FlatPreview<'_> {
    type Item = PreviewBlock;

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.next().map(|(_, node)| PreviewBlock {
            node_id: node.id.clone(),
            text: node.content.clone(),
        })
    }
}

/// Pre-order walk yielding `(depth, node)`.
pub fn walk(store: &NodeStore) -> Walk<'_> {
    let stack = if store.root().is_some() {
        vec![(0, store.root_id())]
    } else {
        Vec::new()
    };
    Walk {
        store,
        stack,
        visited: HashSet::new(),
    }
}

#[derive(Debug, Clone)]
pub struct Walk<'a> {
    store: &'a NodeStore,
    stack: Vec<(usize, &'a NodeId)>,
    visited: HashSet<&'a NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a crate::domain::Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, id)) = self.stack.pop() {
            let Some(node) = self.store.get(id) else {
                continue;
            };
            if !self.visited.insert(id) {
                continue;
            }
            // reverse so the first child is popped first
            for child in node.children_ids.iter().rev() {
                self.stack.push((depth + 1, child));
            }
            return Some((depth, node));
        }
        None
    }
}
