//! Snapshot-based node storage for a single document tree.
//!
//! Nodes live in a flat id-keyed map and reference each other by id, so the
//! tree never needs owning pointers. Every mutation returns a new [`NodeStore`].
//! The index is a persistent [`OrdMap`]: a new snapshot copies only the path to
//! the changed entries and shares everything else, nodes included, with its
//! predecessor. A reader holding an older snapshot is never affected by a
//! writer building a newer one.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use imbl::OrdMap;
use tracing::instrument;

use crate::domain::{Node, NodeId};

/// Immutable snapshot of a document tree: id → node plus the designated root.
#[derive(Debug, Clone)]
pub struct NodeStore {
    nodes: OrdMap<NodeId, Arc<Node>>,
    root_id: NodeId,
}

impl PartialEq for NodeStore {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|(id, node)| other.nodes.get(id).is_some_and(|o| o == node))
    }
}

impl Eq for NodeStore {}

/// A single invariant violation found by [`NodeStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingRoot(NodeId),
    RootHasParent(NodeId),
    ExtraRoot(NodeId),
    DanglingParent { node: NodeId, parent: NodeId },
    NotListedByParent { node: NodeId, parent: NodeId },
    DanglingChild { parent: NodeId, child: NodeId },
    DuplicateChild { parent: NodeId, child: NodeId },
    ParentMismatch { parent: NodeId, child: NodeId },
    RootAsChild { parent: NodeId },
    Cycle(NodeId),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingRoot(id) => write!(f, "root {id} does not exist"),
            Violation::RootHasParent(id) => write!(f, "root {id} has a parent"),
            Violation::ExtraRoot(id) => write!(f, "node {id} has no parent but is not the root"),
            Violation::DanglingParent { node, parent } => {
                write!(f, "node {node} references missing parent {parent}")
            }
            Violation::NotListedByParent { node, parent } => {
                write!(f, "node {node} is not listed by its parent {parent}")
            }
            Violation::DanglingChild { parent, child } => {
                write!(f, "node {parent} lists missing child {child}")
            }
            Violation::DuplicateChild { parent, child } => {
                write!(f, "node {parent} lists child {child} more than once")
            }
            Violation::ParentMismatch { parent, child } => {
                write!(f, "node {parent} lists {child}, whose parent is different")
            }
            Violation::RootAsChild { parent } => write!(f, "node {parent} lists the root as a child"),
            Violation::Cycle(id) => write!(f, "node {id} is its own ancestor"),
        }
    }
}

impl NodeStore {
    /// Create a store holding a single root node.
    pub fn new(mut root: Node) -> Self {
        root.parent_id = None;
        let root_id = root.id.clone();
        let nodes = OrdMap::unit(root_id.clone(), Arc::new(root));
        Self { nodes, root_id }
    }

    /// Assemble a store from already-linked nodes without checking invariants.
    ///
    /// Used when loading persisted or imported payloads; call [`validate`](Self::validate)
    /// to find out whether the result is well-formed.
    pub fn from_nodes(root_id: NodeId, nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|n| (n.id.clone(), Arc::new(n)))
            .collect();
        Self { nodes, root_id }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root_id
    }

    pub fn root(&self) -> Option<&Node> {
        self.get(&self.root_id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|n| n.as_ref())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|n| n.as_ref())
    }

    /// New snapshot with `node` stored under its id (insert or replace).
    pub fn with_node(&self, node: Node) -> Self {
        self.with_nodes([node])
    }

    /// New snapshot with several nodes stored at once.
    pub fn with_nodes(&self, updated: impl IntoIterator<Item = Node>) -> Self {
        let mut nodes = self.nodes.clone();
        for node in updated {
            nodes.insert(node.id.clone(), Arc::new(node));
        }
        Self {
            nodes,
            root_id: self.root_id.clone(),
        }
    }

    /// New snapshot with every listed id removed. Unknown ids are ignored.
    pub fn without_nodes(&self, ids: &HashSet<NodeId>) -> Self {
        let mut nodes = self.nodes.clone();
        for id in ids {
            nodes.remove(id);
        }
        Self {
            nodes,
            root_id: self.root_id.clone(),
        }
    }

    /// Resolved children of `id` in order; dangling child ids are skipped.
    pub fn children(&self, id: &NodeId) -> Vec<&Node> {
        self.get(id)
            .map(|n| n.children_ids.iter().filter_map(|c| self.get(c)).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&Node> {
        self.get(id)
            .and_then(|n| n.parent_id.as_ref())
            .and_then(|p| self.get(p))
    }

    /// Index of `id` within its parent's child list.
    pub fn position_in_parent(&self, id: &NodeId) -> Option<usize> {
        self.parent_of(id)
            .and_then(|p| p.children_ids.iter().position(|c| c == id))
    }

    /// Distance from the root (root is 0). `None` if the node is missing or its
    /// parent chain does not reach the root.
    pub fn depth_of(&self, id: &NodeId) -> Option<usize> {
        let mut current = self.get(id)?;
        let mut depth = 0;
        while let Some(parent_id) = current.parent_id.as_ref() {
            if depth >= self.nodes.len() {
                return None;
            }
            current = self.get(parent_id)?;
            depth += 1;
        }
        (current.id == self.root_id).then_some(depth)
    }

    /// Ids of `id` and all its transitive descendants, collected breadth-first.
    #[instrument(level = "trace", skip(self))]
    pub fn subtree_closure(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut closure = HashSet::new();
        let mut queue = VecDeque::from([id.clone()]);

        while let Some(current) = queue.pop_front() {
            if !closure.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.get(&current) {
                queue.extend(node.children_ids.iter().cloned());
            }
        }
        closure
    }

    /// `id` if it resolves, otherwise the root id.
    pub fn resolve_or_root<'a>(&'a self, id: Option<&'a NodeId>) -> &'a NodeId {
        match id {
            Some(id) if self.contains(id) => id,
            _ => &self.root_id,
        }
    }

    /// Indent is legal for any node that is not the first child of its parent.
    pub fn can_indent(&self, id: &NodeId) -> bool {
        self.position_in_parent(id).is_some_and(|pos| pos > 0)
    }

    /// Outdent is legal when the node's parent itself has a parent.
    pub fn can_outdent(&self, id: &NodeId) -> bool {
        self.parent_of(id)
            .and_then(|p| p.parent_id.as_ref())
            .is_some_and(|g| self.contains(g))
    }

    /// Node ids in document order (pre-order, following child order).
    ///
    /// Dangling child ids and revisits are skipped, so malformed trees still terminate.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();
        let mut stack = vec![self.root_id.clone()];

        while let Some(current) = stack.pop() {
            let Some(node) = self.get(&current) else {
                continue;
            };
            if !visited.insert(current.clone()) {
                continue;
            }
            stack.extend(node.children_ids.iter().rev().cloned());
            order.push(current);
        }
        order
    }

    /// Nodes as `(id, node)` pairs: document order first, then unreachable nodes by id.
    pub fn to_pairs(&self) -> Vec<(NodeId, Node)> {
        let ordered = self.document_order();
        let reached: HashSet<&NodeId> = ordered.iter().collect();
        let orphans = self.nodes.keys().filter(|id| !reached.contains(id)).cloned();

        ordered
            .iter()
            .cloned()
            .chain(orphans.collect::<Vec<_>>())
            .filter_map(|id| self.get(&id).map(|n| (id.clone(), n.clone())))
            .collect()
    }

    /// Check root, parent-link and acyclicity invariants; report every violation found.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        match self.root() {
            None => violations.push(Violation::MissingRoot(self.root_id.clone())),
            Some(root) if root.parent_id.is_some() => {
                violations.push(Violation::RootHasParent(self.root_id.clone()))
            }
            Some(_) => {}
        }

        for node in self.nodes() {
            match node.parent_id.as_ref() {
                None if node.id != self.root_id => {
                    violations.push(Violation::ExtraRoot(node.id.clone()))
                }
                None => {}
                Some(parent_id) => match self.get(parent_id) {
                    None => violations.push(Violation::DanglingParent {
                        node: node.id.clone(),
                        parent: parent_id.clone(),
                    }),
                    Some(parent) if !parent.children_ids.contains(&node.id) => {
                        violations.push(Violation::NotListedByParent {
                            node: node.id.clone(),
                            parent: parent_id.clone(),
                        })
                    }
                    Some(_) => {}
                },
            }

            let mut seen = HashSet::new();
            for child_id in &node.children_ids {
                if !seen.insert(child_id) {
                    violations.push(Violation::DuplicateChild {
                        parent: node.id.clone(),
                        child: child_id.clone(),
                    });
                    continue;
                }
                if child_id == &self.root_id {
                    violations.push(Violation::RootAsChild {
                        parent: node.id.clone(),
                    });
                    continue;
                }
                match self.get(child_id) {
                    None => violations.push(Violation::DanglingChild {
                        parent: node.id.clone(),
                        child: child_id.clone(),
                    }),
                    Some(child) if child.parent_id.as_ref() != Some(&node.id) => {
                        violations.push(Violation::ParentMismatch {
                            parent: node.id.clone(),
                            child: child_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if self.has_cyclic_ancestry(&node.id) {
                violations.push(Violation::Cycle(node.id.clone()));
            }
        }

        violations
    }

    fn has_cyclic_ancestry(&self, id: &NodeId) -> bool {
        let mut seen = HashSet::from([id]);
        let mut current = self.get(id);
        while let Some(parent_id) = current.and_then(|n| n.parent_id.as_ref()) {
            if parent_id == id {
                return true;
            }
            if !seen.insert(parent_id) {
                // cycle above this node; reported for the nodes on it
                return false;
            }
            current = self.get(parent_id);
        }
        false
    }
}
