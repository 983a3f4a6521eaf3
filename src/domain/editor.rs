//! Tree mutations built on [`NodeStore`] primitives.
//!
//! Every function takes the current snapshot and returns a new one. Requests
//! that a user can trigger through ordinary interaction (moving the first child
//! up, indenting a first child, outdenting a child of the root) are silent
//! no-ops that hand back an unchanged snapshot. Genuine structural violations
//! are reported as [`DomainError`]s and also leave the snapshot untouched.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument, warn};

use crate::domain::{DomainError, DomainResult, Node, NodeId, NodeStore};

/// Direction for [`move_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    /// Outdent: become the next sibling of the current parent.
    Left,
    /// Indent: become the last child of the preceding sibling.
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" | "outdent" => Ok(Direction::Left),
            "right" | "indent" => Ok(Direction::Right),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Result of a successful [`delete_subtree`].
#[derive(Debug, Clone)]
pub struct Deletion {
    pub store: NodeStore,
    /// Every id removed, including the deleted node itself.
    pub removed: HashSet<NodeId>,
    /// Parent the deleted node was detached from.
    pub former_parent: NodeId,
}

/// Attach `node` as the last child of `parent_id`.
///
/// If the parent does not resolve the original snapshot is returned unchanged.
#[instrument(level = "debug", skip(store, node), fields(node_id = %node.id))]
pub fn create_node(store: &NodeStore, parent_id: &NodeId, mut node: Node) -> NodeStore {
    let Some(parent) = store.get(parent_id) else {
        warn!("create_node: parent {} not found, ignoring", parent_id);
        return store.clone();
    };
    if store.contains(&node.id) {
        warn!("create_node: id {} already in use, ignoring", node.id);
        return store.clone();
    }

    let mut parent = parent.clone();
    parent.children_ids.push(node.id.clone());
    node.parent_id = Some(parent_id.clone());
    debug!("create_node: {} under {}", node.id, parent_id);

    store.with_nodes([parent, node])
}

/// Remove `node_id` and all of its descendants.
///
/// The root cannot be deleted, neither directly nor as part of a cyclic
/// subtree. The whole closure is removed and the former parent's child list
/// updated in one new snapshot, or nothing changes.
#[instrument(level = "debug", skip(store))]
pub fn delete_subtree(store: &NodeStore, node_id: &NodeId) -> DomainResult<Deletion> {
    let node = store
        .get(node_id)
        .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
    if node_id == store.root_id() {
        return Err(DomainError::RootDeletion(node_id.clone()));
    }
    let former_parent = node
        .parent_id
        .clone()
        .unwrap_or_else(|| store.root_id().clone());

    let removed = store.subtree_closure(node_id);
    if removed.contains(store.root_id()) {
        return Err(DomainError::InvalidTree(format!(
            "subtree of {} contains the root {}",
            node_id,
            store.root_id()
        )));
    }
    debug!("delete_subtree: removing {} nodes", removed.len());

    let mut next = store.without_nodes(&removed);
    if let Some(parent) = next.get(&former_parent) {
        let mut parent = parent.clone();
        parent.children_ids.retain(|c| c != node_id);
        next = next.with_node(parent);
    }

    Ok(Deletion {
        store: next,
        removed,
        former_parent,
    })
}

/// Replace a node's title.
pub fn rename(store: &NodeStore, node_id: &NodeId, title: impl Into<String>) -> DomainResult<NodeStore> {
    update(store, node_id, |n| n.title = title.into())
}

/// Replace a node's content.
pub fn set_content(
    store: &NodeStore,
    node_id: &NodeId,
    content: impl Into<String>,
) -> DomainResult<NodeStore> {
    update(store, node_id, |n| n.content = content.into())
}

fn update(store: &NodeStore, node_id: &NodeId, f: impl FnOnce(&mut Node)) -> DomainResult<NodeStore> {
    let mut node = store
        .get(node_id)
        .cloned()
        .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
    f(&mut node);
    Ok(store.with_node(node))
}

/// Reorder or reparent a node. Illegal moves return the snapshot unchanged.
#[instrument(level = "debug", skip(store))]
pub fn move_node(store: &NodeStore, node_id: &NodeId, direction: Direction) -> NodeStore {
    match try_move(store, node_id, direction) {
        Some(next) => next,
        None => {
            debug!("move_node: {} {} is a no-op", node_id, direction);
            store.clone()
        }
    }
}

fn try_move(store: &NodeStore, node_id: &NodeId, direction: Direction) -> Option<NodeStore> {
    let node = store.get(node_id)?;
    let parent = store.get(node.parent_id.as_ref()?)?;
    let index = parent.children_ids.iter().position(|c| c == node_id)?;

    match direction {
        Direction::Up if index > 0 => {
            let mut parent = parent.clone();
            parent.children_ids.swap(index, index - 1);
            Some(store.with_node(parent))
        }
        Direction::Down if index + 1 < parent.children_ids.len() => {
            let mut parent = parent.clone();
            parent.children_ids.swap(index, index + 1);
            Some(store.with_node(parent))
        }
        Direction::Right if index > 0 => {
            let new_parent_id = &parent.children_ids[index - 1];
            let mut new_parent = store.get(new_parent_id)?.clone();
            let mut old_parent = parent.clone();
            old_parent.children_ids.retain(|c| c != node_id);
            new_parent.children_ids.push(node_id.clone());
            let mut node = node.clone();
            node.parent_id = Some(new_parent.id.clone());
            Some(store.with_nodes([old_parent, new_parent, node]))
        }
        Direction::Left => {
            let grandparent = store.get(parent.parent_id.as_ref()?)?;
            let parent_index = grandparent.children_ids.iter().position(|c| *c == parent.id)?;
            let mut grandparent = grandparent.clone();
            grandparent
                .children_ids
                .insert(parent_index + 1, node_id.clone());
            let mut old_parent = parent.clone();
            old_parent.children_ids.retain(|c| c != node_id);
            let mut node = node.clone();
            node.parent_id = Some(grandparent.id.clone());
            Some(store.with_nodes([old_parent, grandparent, node]))
        }
        _ => None,
    }
}
