//! Arena-backed n-ary tree
//!
//! Nodes live in an arena owned by [`NaryTree`] and are addressed by
//! [`NodeId`]. A node either carries a value or is an *aggregator* (no value)
//! that collects children. Every node holds at most `branching_factor` active
//! children. Archiving a node moves its active children into a separate list
//! that is kept for read-only traversal but never receives new nodes.
//!
//! Released slots are reused. Each reuse bumps the slot generation, so a
//! [`NodeId`] kept from before the release no longer resolves: queries treat
//! it as absent and mutations return [`TreeError::Released`].
//!
//! # Placement
//!
//! [`NaryTree::push`] keeps every pushed leaf on the same level. The leaf is
//! appended under the most recently created aggregator one level up; when that
//! aggregator is full (or settled) a new one is created by the same rule one
//! level higher, and when the climb passes the root a new aggregator root
//! adopts the old root as its first child.

use std::fmt;

/// Handle to a node in a [`NaryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: usize, generation: u32) -> Self {
        debug_assert!(index <= u32::MAX as usize);
        NodeId {
            index: index as u32,
            generation,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Number of times the slot was reused before this node took it.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}@{}", self.index, self.generation)
        }
    }
}

/// Errors raised by structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("branching factor must be at least 2, got {0}")]
    BranchingFactor(usize),
    #[error("node {node} has no open slot (capacity {capacity})")]
    Full { node: NodeId, capacity: usize },
    #[error("node {0} is archived")]
    Archived(NodeId),
    #[error("node {0} was released")]
    Released(NodeId),
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: Option<T>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    archive: Vec<NodeId>,
    archived: bool,
}

impl<T> Node<T> {
    fn new(value: Option<T>, parent: Option<NodeId>) -> Self {
        Self {
            value,
            parent,
            children: Vec::new(),
            archive: Vec::new(),
            archived: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// N-ary tree with bounded fan-out and upward growth.
#[derive(Debug, Clone)]
pub struct NaryTree<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: Option<NodeId>,
    branching_factor: usize,
    /// Depth of the level that receives pushed leaves
    leaf_depth: usize,
    /// Most recent aggregator per level, counted upward from the leaf level
    spine: Vec<Option<NodeId>>,
}

impl<T> NaryTree<T> {
    pub fn new(branching_factor: usize) -> Result<Self, TreeError> {
        if branching_factor < 2 {
            return Err(TreeError::BranchingFactor(branching_factor));
        }
        Ok(Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            branching_factor,
            leaf_depth: 0,
            spine: Vec::new(),
        })
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of live nodes, archived subtrees included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Whether `id` refers to a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Value carried by `id`, `None` for aggregators and released ids.
    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.get(id)?.value.as_ref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Active children of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], |node| node.children.as_slice())
    }

    /// Children detached from active traversal by [`NaryTree::archive`].
    pub fn archived_children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], |node| node.archive.as_slice())
    }

    pub fn is_archived(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.archived)
    }

    /// Room left under `id`; released ids have none.
    pub fn open_slots(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |node| {
            self.branching_factor.saturating_sub(node.children.len())
        })
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent)?.parent;
        }
        Some(depth)
    }

    /// Depth at which [`NaryTree::push`] places new leaves.
    pub fn leaf_depth(&self) -> usize {
        self.leaf_depth
    }

    /// Number of levels, archived subtrees included.
    pub fn height(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut height = 0;
        let mut stack = vec![(root, 1)];
        while let Some((id, level)) = stack.pop() {
            height = height.max(level);
            if let Some(node) = self.get(id) {
                for &child in node.children.iter().chain(&node.archive) {
                    stack.push((child, level + 1));
                }
            }
        }
        height
    }

    /// Nodes reachable from the root through active links only.
    pub fn active_len(&self) -> usize {
        self.walk_active(usize::MAX).len()
    }

    /// Pre-order walk over active nodes down to `max_depth`, with depths.
    pub fn walk_active(&self, max_depth: usize) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![(root, 0)];
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            if depth < max_depth {
                for &child in self.children(id).iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        out
    }

    /// Insert `value` as a new leaf according to the placement policy.
    pub fn push(&mut self, value: T) -> NodeId {
        if self.root.is_none() {
            let id = self.alloc(Node::new(Some(value), None));
            self.root = Some(id);
            self.leaf_depth = 0;
            return id;
        }
        let parent = self.accepting_parent(1);
        self.link(parent, Some(value))
    }

    /// Append a child under `parent`, respecting its capacity.
    pub fn append_child(&mut self, parent: NodeId, value: Option<T>) -> Result<NodeId, TreeError> {
        let node = self.get(parent).ok_or(TreeError::Released(parent))?;
        if node.archived {
            return Err(TreeError::Archived(parent));
        }
        if node.children.len() >= self.branching_factor {
            return Err(TreeError::Full {
                node: parent,
                capacity: self.branching_factor,
            });
        }
        Ok(self.link(parent, value))
    }

    /// Replace the value of `id`, returning the previous one.
    pub fn set_value(&mut self, id: NodeId, value: Option<T>) -> Result<Option<T>, TreeError> {
        let node = self.get_mut(id).ok_or(TreeError::Released(id))?;
        Ok(std::mem::replace(&mut node.value, value))
    }

    /// Detach the active children of `id` into its archive.
    ///
    /// Returns `false` if the node was already archived or released.
    pub fn archive(&mut self, id: NodeId) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if node.archived {
            return false;
        }
        let children = std::mem::take(&mut node.children);
        node.archive.extend(children);
        node.archived = true;
        true
    }

    /// Free every node below the archive of `id` and return how many were
    /// released. Released slots are reused by later insertions.
    pub fn release_archive(&mut self, id: NodeId) -> usize {
        let Some(node) = self.get_mut(id) else {
            return 0;
        };
        let mut stack = std::mem::take(&mut node.archive);
        let mut released = 0;
        while let Some(current) = stack.pop() {
            let Some(node) = self.take(current) else {
                continue;
            };
            stack.extend(node.children);
            stack.extend(node.archive);
            for slot in self.spine.iter_mut() {
                if *slot == Some(current) {
                    *slot = None;
                }
            }
            self.free.push(current.index());
            released += 1;
        }
        released
    }

    fn get(&self, id: NodeId) -> Option<&Node<T>> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn take(&mut self, id: NodeId) -> Option<Node<T>> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.take()
    }

    fn accepts(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| {
            node.value.is_none() && !node.archived && node.children.len() < self.branching_factor
        })
    }

    /// Aggregator at `level` (counted up from the leaf level) with room for
    /// one more child, created on demand.
    fn accepting_parent(&mut self, level: usize) -> NodeId {
        if let Some(Some(id)) = self.spine.get(level) {
            if self.accepts(*id) {
                return *id;
            }
        }
        if level > self.leaf_depth {
            return self.grow_root();
        }
        let parent = self.accepting_parent(level + 1);
        let id = self.link(parent, None);
        self.set_spine(level, id);
        id
    }

    fn grow_root(&mut self) -> NodeId {
        let id = self.alloc(Node::new(None, None));
        if let Some(old) = self.root {
            if let Some(node) = self.get_mut(old) {
                node.parent = Some(id);
            }
            if let Some(node) = self.get_mut(id) {
                node.children.push(old);
            }
            self.leaf_depth += 1;
        }
        self.root = Some(id);
        self.set_spine(self.leaf_depth, id);
        id
    }

    fn set_spine(&mut self, level: usize, id: NodeId) {
        if self.spine.len() <= level {
            self.spine.resize(level + 1, None);
        }
        self.spine[level] = Some(id);
    }

    fn link(&mut self, parent: NodeId, value: Option<T>) -> NodeId {
        let id = self.alloc(Node::new(value, Some(parent)));
        if let Some(node) = self.get_mut(parent) {
            node.children.push(id);
        }
        id
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(self.slots.len() - 1, 0)
        }
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
