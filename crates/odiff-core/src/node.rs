//! The diff tree: nodes, states, and the arena that owns them.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. The
//! parent link is a plain index, so ownership runs strictly from the arena
//! to the nodes and from parents to the child id lists.
//!
//! # Invariants
//!
//! - A node's path is its parent's path plus its own element.
//! - `Circular` nodes always carry a circle-start path; the circle-start
//!   node may be absent.
//! - Child order is traversal order.

use std::fmt;

use serde::{Deserialize, Serialize};

use odiff_types::{ElementSelector, NodePath, Value, ValueType};

/// Outcome of comparing one location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffState {
    /// Both sides are equal (or both absent).
    Untouched,
    /// Only the working side has a value.
    Added,
    /// Only the base side has a value.
    Removed,
    /// Both sides have values that differ.
    Changed,
    /// Excluded by an inclusion rule; never compared.
    Ignored,
    /// Re-entry into an object already being compared on this branch.
    Circular,
}

impl DiffState {
    /// Every state, in declaration order.
    pub const ALL: [DiffState; 6] = [
        DiffState::Untouched,
        DiffState::Added,
        DiffState::Removed,
        DiffState::Changed,
        DiffState::Ignored,
        DiffState::Circular,
    ];

    /// Returns `true` for states that represent a difference.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Added | Self::Removed | Self::Changed)
    }
}

impl fmt::Display for DiffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Untouched => "untouched",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Ignored => "ignored",
            Self::Circular => "circular",
        };
        f.write_str(s)
    }
}

/// Index of a node inside its arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One location of the compared graphs.
#[derive(Clone, Debug)]
pub struct DiffNode {
    id: NodeId,
    parent: Option<NodeId>,
    element: ElementSelector,
    path: NodePath,
    value_type: Option<ValueType>,
    state: DiffState,
    children: Vec<NodeId>,
    circle_start_path: Option<NodePath>,
    circle_start_node: Option<NodeId>,
    working: Value,
    base: Value,
}

impl DiffNode {
    /// A detached node that has not been stored in an arena yet.
    pub(crate) fn candidate(
        parent: Option<NodeId>,
        element: ElementSelector,
        path: NodePath,
    ) -> Self {
        Self {
            id: NodeId(usize::MAX),
            parent,
            element,
            path,
            value_type: None,
            state: DiffState::Untouched,
            children: Vec::new(),
            circle_start_path: None,
            circle_start_node: None,
            working: Value::Null,
            base: Value::Null,
        }
    }

    pub(crate) fn with_values(mut self, value_type: ValueType, working: Value, base: Value) -> Self {
        self.value_type = Some(value_type);
        self.working = working;
        self.base = base;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The path step of this node.
    pub fn element(&self) -> &ElementSelector {
        &self.element
    }

    /// The full path from the root.
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Compared type; `None` for ignored nodes, which are never resolved.
    pub fn value_type(&self) -> Option<&ValueType> {
        self.value_type.as_ref()
    }

    pub fn state(&self) -> DiffState {
        self.state
    }

    /// Attached children in traversal order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Path of the ancestor occurrence where a detected cycle began.
    pub fn circle_start_path(&self) -> Option<&NodePath> {
        self.circle_start_path.as_ref()
    }

    /// The ancestor node at [`Self::circle_start_path`], if it was resolvable.
    pub fn circle_start_node(&self) -> Option<NodeId> {
        self.circle_start_node
    }

    /// The working-side value at this location.
    pub fn working(&self) -> &Value {
        &self.working
    }

    /// The base-side value at this location.
    pub fn base(&self) -> &Value {
        &self.base
    }

    /// Returns `true` if this node's path equals `path`.
    pub fn matches(&self, path: &NodePath) -> bool {
        self.path.matches(path)
    }

    pub fn is_added(&self) -> bool {
        self.state == DiffState::Added
    }

    pub fn is_removed(&self) -> bool {
        self.state == DiffState::Removed
    }

    pub fn is_changed(&self) -> bool {
        self.state == DiffState::Changed
    }

    pub fn is_untouched(&self) -> bool {
        self.state == DiffState::Untouched
    }

    pub fn is_ignored(&self) -> bool {
        self.state == DiffState::Ignored
    }

    pub fn is_circular(&self) -> bool {
        self.state == DiffState::Circular
    }

    pub(crate) fn set_state(&mut self, state: DiffState) {
        self.state = state;
    }

    pub(crate) fn set_circle_start(&mut self, path: NodePath, node: Option<NodeId>) {
        self.state = DiffState::Circular;
        self.circle_start_path = Some(path);
        self.circle_start_node = node;
    }
}

/// Flat node storage shared by the traversal context and the final tree.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<DiffNode>,
}

impl NodeArena {
    pub(crate) fn insert(&mut self, mut node: DiffNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &DiffNode {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut DiffNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Walk up from `start` (inclusive) to the first node whose path matches.
    pub(crate) fn find_ancestor(&self, start: Option<NodeId>, path: &NodePath) -> Option<NodeId> {
        let mut current = start;
        while let Some(id) = current {
            let node = self.get(id);
            if node.matches(path) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// A node has changes if it, or any attached descendant, is a change.
    pub(crate) fn has_changes(&self, id: NodeId) -> bool {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.get(next);
            if node.state.is_change() {
                return true;
            }
            stack.extend(node.children.iter().copied());
        }
        false
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Count of attached nodes per state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub untouched: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub ignored: usize,
    pub circular: usize,
}

impl ChangeSummary {
    fn record(&mut self, state: DiffState) {
        match state {
            DiffState::Untouched => self.untouched += 1,
            DiffState::Added => self.added += 1,
            DiffState::Removed => self.removed += 1,
            DiffState::Changed => self.changed += 1,
            DiffState::Ignored => self.ignored += 1,
            DiffState::Circular => self.circular += 1,
        }
    }

    /// Number of added, removed, and changed nodes.
    pub fn changes(&self) -> usize {
        self.added + self.removed + self.changed
    }
}

/// The result of a comparison: a rooted tree of [`DiffNode`]s.
///
/// Nodes rejected by the returnability policy stay in the arena but are not
/// reachable from the root; every query below only sees attached nodes.
#[derive(Clone, Debug)]
pub struct DiffTree {
    arena: NodeArena,
    root: NodeId,
}

impl DiffTree {
    pub(crate) fn new(arena: NodeArena, root: NodeId) -> Self {
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &DiffNode {
        self.arena.get(self.root)
    }

    /// Look up a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn node(&self, id: NodeId) -> &DiffNode {
        self.arena.get(id)
    }

    /// Attached children of `id`.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &DiffNode> {
        self.arena
            .get(id)
            .children
            .iter()
            .map(move |child| self.arena.get(*child))
    }

    /// The attached child of `id` addressed by `element`.
    pub fn child(&self, id: NodeId, element: &ElementSelector) -> Option<&DiffNode> {
        self.children(id).find(|c| c.element() == element)
    }

    /// The attached child of the root whose property is `name`.
    pub fn child_property(&self, name: &str) -> Option<&DiffNode> {
        self.child(self.root, &ElementSelector::property(name))
    }

    /// Descend from the root along `path`.
    pub fn find(&self, path: &NodePath) -> Option<&DiffNode> {
        let mut current = self.root_node();
        for element in &path.elements()[1..] {
            current = self.child(current.id, element)?;
        }
        Some(current)
    }

    /// The resolved circle-start node of a circular node.
    pub fn circle_start_node(&self, id: NodeId) -> Option<&DiffNode> {
        self.arena.get(id).circle_start_node.map(|n| self.arena.get(n))
    }

    /// Returns `true` if `id` or any attached descendant is a change.
    pub fn has_changes(&self, id: NodeId) -> bool {
        self.arena.has_changes(id)
    }

    /// Pre-order walk of all attached nodes, yielding `(depth, node)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![(0, self.root)],
        }
    }

    /// Number of attached nodes, including the root.
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Per-state counts over all attached nodes except the root.
    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for (_, node) in self.walk().skip(1) {
            summary.record(node.state());
        }
        summary
    }
}

/// Iterator returned by [`DiffTree::walk`].
pub struct Walk<'a> {
    tree: &'a DiffTree,
    stack: Vec<(usize, NodeId)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a DiffNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let node = self.tree.arena.get(id);
        self.stack
            .extend(node.children.iter().rev().map(|c| (depth + 1, *c)));
        Some((depth, node))
    }
}
