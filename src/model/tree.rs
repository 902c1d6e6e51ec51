//! Arena-backed layout tree owned by a single workspace.
//!
//! Nodes live in a [`SlotMap`] and refer to their children by [`NodeId`].
//! The parent map and the window index are derived from the child lists and
//! rebuilt after every structural change; they are never edited directly.

use slotmap::{SecondaryMap, SlotMap, new_key_type};
use thiserror::Error;
use tracing::trace;

use crate::common::collections::{HashMap, HashSet};
use crate::layout_engine::{Direction, LayoutKind, Orientation};
use crate::model::window::WindowId;

new_key_type! { pub struct NodeId; }

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("tree path {0:?} does not address an insertion slot")]
    InvalidPath(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(WindowId),
    Container {
        layout: LayoutKind,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    weight: f64,
    kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Swapped with a sibling or re-parented into an ancestor.
    Moved,
    /// No slot in that direction inside this tree.
    AtEdge,
    NotFound,
}

#[derive(Debug, Default, Clone)]
pub struct LayoutTree {
    nodes: SlotMap<NodeId, Node>,
    root: Option<NodeId>,
    parents: SecondaryMap<NodeId, NodeId>,
    windows: HashMap<WindowId, NodeId>,
}

impl LayoutTree {
    pub fn new() -> Self { Self::default() }

    pub fn root(&self) -> Option<NodeId> { self.root }

    pub fn is_empty(&self) -> bool { self.root.is_none() }

    pub fn window_count(&self) -> usize { self.windows.len() }

    pub fn contains_window(&self, wid: WindowId) -> bool { self.windows.contains_key(&wid) }

    pub fn node_for(&self, wid: WindowId) -> Option<NodeId> { self.windows.get(&wid).copied() }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { self.parents.get(node).copied() }

    pub fn kind(&self, node: NodeId) -> &NodeKind { &self.nodes[node].kind }

    pub fn weight(&self, node: NodeId) -> f64 { self.nodes[node].weight }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.nodes[node].kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Container { children, .. } => children,
        }
    }

    pub fn window_at(&self, node: NodeId) -> Option<WindowId> {
        match self.nodes[node].kind {
            NodeKind::Leaf(wid) => Some(wid),
            NodeKind::Container { .. } => None,
        }
    }

    pub fn layout(&self, node: NodeId) -> Option<LayoutKind> {
        match self.nodes[node].kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Container { layout, .. } => Some(layout),
        }
    }

    /// Windows in depth-first, left-to-right order.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::with_capacity(self.windows.len());
        if let Some(root) = self.root {
            self.collect_windows_under(root, &mut out);
        }
        out
    }

    fn collect_windows_under(&self, node: NodeId, out: &mut Vec<WindowId>) {
        match &self.nodes[node].kind {
            NodeKind::Leaf(wid) => out.push(*wid),
            NodeKind::Container { children, .. } => {
                for &child in children {
                    self.collect_windows_under(child, out);
                }
            }
        }
    }

    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Child indices leading from the root to `node`.
    pub fn path_of(&self, node: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = node;
        while let Some(parent) = self.parent(cur) {
            let idx = self.index_in_parent(parent, cur);
            path.push(idx);
            cur = parent;
        }
        path.reverse();
        path
    }

    fn index_in_parent(&self, parent: NodeId, node: NodeId) -> usize {
        self.children(parent)
            .iter()
            .position(|&c| c == node)
            .expect("parent map out of sync with child lists")
    }

    fn alloc_leaf(&mut self, wid: WindowId, weight: f64) -> NodeId {
        assert!(
            !self.windows.contains_key(&wid),
            "window {wid} already has a leaf in this tree"
        );
        self.nodes.insert(Node { weight, kind: NodeKind::Leaf(wid) })
    }

    fn children_mut(&mut self, node: NodeId) -> &mut Vec<NodeId> {
        match &mut self.nodes[node].kind {
            NodeKind::Container { children, .. } => children,
            NodeKind::Leaf(wid) => panic!("leaf for {wid} has no children"),
        }
    }

    fn average_child_weight(&self, container: NodeId) -> f64 {
        let children = self.children(container);
        if children.is_empty() {
            return 1.0;
        }
        children.iter().map(|&c| self.nodes[c].weight).sum::<f64>() / children.len() as f64
    }

    /// Puts `new` where `old` currently is: in its parent's child list, or as
    /// the root. Relies on the parent map still describing `old`.
    fn replace_in_parent(&mut self, old: NodeId, new: NodeId) {
        match self.parent(old) {
            Some(parent) => {
                let idx = self.index_in_parent(parent, old);
                self.children_mut(parent)[idx] = new;
            }
            None => self.root = Some(new),
        }
    }

    /// Wraps `node` into a fresh container holding `[node, leaf]` (or
    /// `[leaf, node]` when `before`). The container takes over `node`'s weight.
    fn wrap_with_leaf(
        &mut self,
        node: NodeId,
        wid: WindowId,
        layout: LayoutKind,
        before: bool,
    ) -> NodeId {
        let leaf = self.alloc_leaf(wid, 1.0);
        let weight = std::mem::replace(&mut self.nodes[node].weight, 1.0);
        let children = if before { vec![leaf, node] } else { vec![node, leaf] };
        let container = self.nodes.insert(Node {
            weight,
            kind: NodeKind::Container { layout, children },
        });
        self.replace_in_parent(node, container);
        leaf
    }

    fn insert_child(&mut self, container: NodeId, index: usize, wid: WindowId) -> NodeId {
        let weight = self.average_child_weight(container);
        let leaf = self.alloc_leaf(wid, weight);
        self.children_mut(container).insert(index, leaf);
        leaf
    }

    /// Inserts `wid` as the next sibling of `anchor`'s leaf.
    ///
    /// Without an anchor the window is appended to the root container. When
    /// the new sibling would share a lone root leaf, a root container of kind
    /// `layout` is created to hold both.
    pub fn insert_after(
        &mut self,
        anchor: Option<WindowId>,
        wid: WindowId,
        layout: LayoutKind,
    ) -> NodeId {
        let anchor = anchor.and_then(|a| self.node_for(a));
        let leaf = match (self.root, anchor) {
            (None, _) => {
                let leaf = self.alloc_leaf(wid, 1.0);
                self.root = Some(leaf);
                leaf
            }
            (Some(_), Some(anchor)) => match self.parent(anchor) {
                Some(parent) => {
                    let idx = self.index_in_parent(parent, anchor);
                    self.insert_child(parent, idx + 1, wid)
                }
                None => self.wrap_with_leaf(anchor, wid, layout, false),
            },
            (Some(root), None) => match self.nodes[root].kind {
                NodeKind::Leaf(_) => self.wrap_with_leaf(root, wid, layout, false),
                NodeKind::Container { .. } => {
                    let len = self.children(root).len();
                    self.insert_child(root, len, wid)
                }
            },
        };
        self.reindex();
        trace!(%wid, path = ?self.path_of(leaf), "inserted leaf");
        leaf
    }

    /// Inserts `wid` at an explicit slot. All but the last element of `path`
    /// walk child indices from the root; the last is the insertion index in
    /// the container reached. A path ending on a leaf wraps that leaf into a
    /// new container of kind `layout` (index 0 = before it, 1 = after it).
    pub fn insert_at(
        &mut self,
        path: &[usize],
        wid: WindowId,
        layout: LayoutKind,
    ) -> Result<NodeId, TreeError> {
        let invalid = || TreeError::InvalidPath(path.to_vec());
        let Some((&index, prefix)) = path.split_last() else {
            return Err(invalid());
        };
        let Some(root) = self.root else {
            if prefix.is_empty() && index == 0 {
                return Ok(self.insert_after(None, wid, layout));
            }
            return Err(invalid());
        };
        let mut node = root;
        for &i in prefix {
            node = *self.children(node).get(i).ok_or_else(invalid)?;
        }
        let is_leaf = self.window_at(node).is_some();
        let leaf = if !is_leaf && index <= self.children(node).len() {
            self.insert_child(node, index, wid)
        } else if is_leaf && index <= 1 {
            self.wrap_with_leaf(node, wid, layout, index == 0)
        } else {
            return Err(invalid());
        };
        self.reindex();
        Ok(leaf)
    }

    /// Removes the leaf holding `wid`, collapsing a parent left with a single
    /// child. Returns false when the window is not in this tree.
    pub fn remove_window(&mut self, wid: WindowId) -> bool {
        let Some(node) = self.node_for(wid) else {
            return false;
        };
        self.detach(node);
        self.nodes.remove(node);
        self.reindex();
        true
    }

    /// Unlinks `node` from the tree without freeing it. The parent map must be
    /// current on entry and is stale on exit.
    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            self.root = None;
            return;
        };
        let idx = self.index_in_parent(parent, node);
        self.children_mut(parent).remove(idx);
        if self.children(parent).len() == 1 {
            let only = self.children(parent)[0];
            let weight = self.nodes[parent].weight;
            self.nodes[only].weight = weight;
            self.replace_in_parent(parent, only);
            self.nodes.remove(parent);
        }
    }

    /// Exchanges the positions of two windows. Weights stay with the slots.
    pub fn swap_windows(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(na), Some(nb)) = (self.node_for(a), self.node_for(b)) else {
            return false;
        };
        self.nodes[na].kind = NodeKind::Leaf(b);
        self.nodes[nb].kind = NodeKind::Leaf(a);
        self.reindex();
        true
    }

    pub fn set_layout(&mut self, container: NodeId, kind: LayoutKind) -> bool {
        match &mut self.nodes[container].kind {
            NodeKind::Container { layout, .. } => {
                *layout = kind;
                true
            }
            NodeKind::Leaf(_) => false,
        }
    }

    /// Changes `node`'s share of its parent by `fraction` of the parent's
    /// extent. Growing takes weight from the siblings still above
    /// `min_share` of the parent total, in proportion to their weights;
    /// shrinking hands it to all siblings the same way. The result never
    /// moves against the sign of `fraction`, and neither `node` nor a donor
    /// is pushed below the floor.
    pub fn resize(&mut self, node: NodeId, fraction: f64, min_share: f64) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let siblings: Vec<NodeId> =
            self.children(parent).iter().copied().filter(|&c| c != node).collect();
        if siblings.is_empty() {
            return false;
        }
        let weight = self.nodes[node].weight;
        let total = weight + siblings.iter().map(|&s| self.nodes[s].weight).sum::<f64>();
        let floor = min_share * total;
        let requested = fraction * total;

        let receivers: Vec<NodeId> = if requested > 0.0 {
            siblings.into_iter().filter(|&s| self.nodes[s].weight > floor).collect()
        } else {
            siblings
        };
        let pool: f64 = receivers.iter().map(|&s| self.nodes[s].weight).sum();
        if receivers.is_empty() || pool <= 0.0 {
            return false;
        }

        let delta = if requested > 0.0 {
            let upper = receivers
                .iter()
                .map(|&s| pool * (1.0 - floor / self.nodes[s].weight))
                .fold(f64::INFINITY, f64::min);
            requested.min(upper.max(0.0))
        } else {
            requested.max((floor - weight).min(0.0))
        };
        if delta.abs() < EPSILON {
            return false;
        }

        self.nodes[node].weight += delta;
        for s in receivers {
            let w = self.nodes[s].weight;
            self.nodes[s].weight = w - delta * w / pool;
        }
        true
    }

    /// The nearest ancestor-or-self of `wid`'s leaf whose parent is a split
    /// along `orientation` (or along any axis when `None`).
    pub fn resize_target(&self, wid: WindowId, orientation: Option<Orientation>) -> Option<NodeId> {
        let leaf = self.node_for(wid)?;
        std::iter::once(leaf).chain(self.ancestors(leaf)).find(|&n| {
            self.parent(n).and_then(|p| self.layout(p)).is_some_and(|kind| {
                !kind.is_stacked() && orientation.is_none_or(|o| kind.orientation() == o)
            })
        })
    }

    pub fn resize_window(
        &mut self,
        wid: WindowId,
        orientation: Option<Orientation>,
        fraction: f64,
        min_share: f64,
    ) -> bool {
        match self.resize_target(wid, orientation) {
            Some(node) => self.resize(node, fraction, min_share),
            None => false,
        }
    }

    /// Resets every weight under `node` to an equal share.
    pub fn rebalance(&mut self, node: NodeId) {
        let children = self.children(node).to_vec();
        for child in children {
            self.nodes[child].weight = 1.0;
            self.rebalance(child);
        }
    }

    pub fn rebalance_all(&mut self) {
        if let Some(root) = self.root {
            self.rebalance(root);
        }
    }

    pub fn parent_of_window(&self, wid: WindowId) -> Option<NodeId> {
        self.node_for(wid).and_then(|n| self.parent(n))
    }

    /// Merges `wid` with its neighbour in `direction` into a container of the
    /// perpendicular orientation. When the two are the only children, the
    /// parent itself flips orientation instead of nesting.
    pub fn join(&mut self, wid: WindowId, direction: Direction) -> bool {
        let Some(node) = self.node_for(wid) else {
            return false;
        };
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let Some(kind) = self.layout(parent) else {
            return false;
        };
        if kind.orientation() != direction.orientation() {
            return false;
        }
        let idx = self.index_in_parent(parent, node);
        let len = self.children(parent).len();
        let neighbor = if direction.is_forward() {
            (idx + 1 < len).then_some(idx + 1)
        } else {
            idx.checked_sub(1)
        };
        let Some(neighbor) = neighbor else {
            return false;
        };
        let joined = LayoutKind::from(kind.orientation().perpendicular());
        if len == 2 {
            return self.set_layout(parent, joined);
        }
        let (lo, hi) = (idx.min(neighbor), idx.max(neighbor));
        let pair = [self.children(parent)[lo], self.children(parent)[hi]];
        let weight = pair.iter().map(|&n| self.nodes[n].weight).sum();
        let container = self.nodes.insert(Node {
            weight,
            kind: NodeKind::Container { layout: joined, children: pair.to_vec() },
        });
        let children = self.children_mut(parent);
        children[lo] = container;
        children.remove(hi);
        self.reindex();
        true
    }

    /// Moves `wid` one slot in `direction`: swaps with the adjacent sibling
    /// when the parent splits along that axis, otherwise re-parents the window
    /// into the nearest ancestor that does, next to the branch it came from.
    pub fn move_window(&mut self, wid: WindowId, direction: Direction) -> MoveOutcome {
        let Some(leaf) = self.node_for(wid) else {
            return MoveOutcome::NotFound;
        };
        let axis = direction.orientation();
        let mut branch = leaf;
        while let Some(parent) = self.parent(branch) {
            let matches_axis = self.layout(parent).is_some_and(|k| k.orientation() == axis);
            if !matches_axis {
                branch = parent;
                continue;
            }
            let idx = self.index_in_parent(parent, branch);
            let len = self.children(parent).len();
            let target = if direction.is_forward() {
                (idx + 1 < len).then_some(idx + 1)
            } else {
                idx.checked_sub(1)
            };
            if branch == leaf {
                let Some(target) = target else {
                    branch = parent;
                    continue;
                };
                self.children_mut(parent).swap(idx, target);
                self.reindex();
                return MoveOutcome::Moved;
            }
            let insert_at = if direction.is_forward() { idx + 1 } else { idx };
            self.detach(leaf);
            self.nodes.remove(leaf);
            self.reindex();
            self.insert_child(parent, insert_at, wid);
            self.reindex();
            return MoveOutcome::Moved;
        }
        MoveOutcome::AtEdge
    }

    fn reindex(&mut self) {
        self.parents.clear();
        self.windows.clear();
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match &self.nodes[node].kind {
                NodeKind::Leaf(wid) => {
                    self.windows.insert(*wid, node);
                }
                NodeKind::Container { children, .. } => {
                    for &child in children {
                        self.parents.insert(child, node);
                        stack.push(child);
                    }
                }
            }
        }
        debug_assert_eq!(
            self.nodes.len(),
            self.parents.len() + 1,
            "unreachable nodes left in the arena"
        );
    }

    /// Panics if the structure is corrupt: a cycle, a node reachable twice, a
    /// window in two leaves, a container with fewer than two children, or a
    /// non-positive weight.
    pub fn check_invariants(&self) {
        let Some(root) = self.root else {
            assert!(self.nodes.is_empty(), "empty tree still owns nodes");
            return;
        };
        let mut seen = HashSet::default();
        let mut windows = HashSet::default();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node), "node {node:?} reachable twice (cycle or shared child)");
            assert!(self.nodes[node].weight > 0.0, "node {node:?} has non-positive weight");
            match &self.nodes[node].kind {
                NodeKind::Leaf(wid) => {
                    assert!(windows.insert(*wid), "window {wid} appears in two leaves");
                }
                NodeKind::Container { children, .. } => {
                    assert!(
                        children.len() >= 2,
                        "container {node:?} has {} children",
                        children.len()
                    );
                    for &child in children {
                        assert_eq!(self.parent(child), Some(node), "stale parent for {child:?}");
                        stack.push(child);
                    }
                }
            }
        }
        assert_eq!(seen.len(), self.nodes.len(), "arena holds unreachable nodes");
    }

    pub fn draw_tree(&self) -> String {
        let Some(root) = self.root else {
            return "(empty)\n".to_string();
        };
        let tree = self.ascii_tree(root);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            out.push_str("<failed to render tree>\n");
        }
        out
    }

    fn ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let weight = self.nodes[node].weight;
        match &self.nodes[node].kind {
            NodeKind::Leaf(wid) => ascii_tree::Tree::Leaf(vec![format!("{wid} [weight {weight:.3}]")]),
            NodeKind::Container { layout, children } => ascii_tree::Tree::Node(
                format!("{layout} [weight {weight:.3}]"),
                children.iter().map(|&c| self.ascii_tree(c)).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn w(idx: u32) -> WindowId { WindowId::new(1, idx) }

    fn tree_with(n: u32) -> LayoutTree {
        let mut tree = LayoutTree::new();
        let mut last = None;
        for i in 1..=n {
            tree.insert_after(last, w(i), LayoutKind::Horizontal);
            last = Some(w(i));
        }
        tree
    }

    fn shape(tree: &LayoutTree) -> String { tree.draw_tree() }

    #[test]
    fn first_insert_becomes_root_leaf() {
        let mut tree = LayoutTree::new();
        let leaf = tree.insert_after(None, w(1), LayoutKind::Horizontal);
        assert_eq!(tree.root(), Some(leaf));
        assert_eq!(tree.window_at(leaf), Some(w(1)));
        tree.check_invariants();
    }

    #[test]
    fn second_insert_creates_root_container() {
        let tree = tree_with(2);
        let root = tree.root().unwrap();
        assert_eq!(tree.layout(root), Some(LayoutKind::Horizontal));
        assert_eq!(tree.windows(), vec![w(1), w(2)]);
        tree.check_invariants();
    }

    #[test]
    fn insert_after_anchor_preserves_order() {
        let mut tree = tree_with(3);
        tree.insert_after(Some(w(1)), w(4), LayoutKind::Horizontal);
        assert_eq!(tree.windows(), vec![w(1), w(4), w(2), w(3)]);
        let root = tree.root().unwrap();
        for &child in tree.children(root) {
            assert_eq!(tree.weight(child), 1.0);
        }
    }

    #[test]
    fn new_leaf_gets_average_weight() {
        let mut tree = tree_with(2);
        let n1 = tree.node_for(w(1)).unwrap();
        assert!(tree.resize(n1, 0.25, 0.05));
        tree.insert_after(Some(w(2)), w(3), LayoutKind::Horizontal);
        let n3 = tree.node_for(w(3)).unwrap();
        assert!((tree.weight(n3) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn removing_last_leaf_empties_tree() {
        let mut tree = tree_with(1);
        assert!(tree.remove_window(w(1)));
        assert!(tree.is_empty());
        assert!(!tree.remove_window(w(1)));
        tree.check_invariants();
    }

    #[test]
    fn removal_collapses_single_child_container() {
        let mut tree = tree_with(2);
        tree.remove_window(w(1));
        let root = tree.root().unwrap();
        assert_eq!(tree.window_at(root), Some(w(2)));
        tree.check_invariants();
    }

    #[test]
    fn removal_splices_lone_child_into_grandparent() {
        let mut tree = tree_with(3);
        assert!(tree.join(w(2), Direction::Right));
        // H[w1, V[w2, w3]]
        let inner = tree.parent_of_window(w(2)).unwrap();
        let inner_weight = tree.weight(inner);
        tree.remove_window(w(3));
        let n2 = tree.node_for(w(2)).unwrap();
        assert_eq!(tree.parent(n2), tree.root());
        assert_eq!(tree.weight(n2), inner_weight);
        assert_eq!(tree.windows(), vec![w(1), w(2)]);
        tree.check_invariants();
    }

    #[test]
    fn insert_then_remove_round_trips() {
        let mut tree = tree_with(3);
        tree.join(w(1), Direction::Right);
        let before = shape(&tree);
        for anchor in [w(1), w(2), w(3)] {
            tree.insert_after(Some(anchor), w(9), LayoutKind::Vertical);
            tree.check_invariants();
            tree.remove_window(w(9));
            assert_eq!(shape(&tree), before);
        }
        let mut single = tree_with(1);
        let before = shape(&single);
        single.insert_after(Some(w(1)), w(2), LayoutKind::Horizontal);
        single.remove_window(w(2));
        assert_eq!(shape(&single), before);
    }

    #[test]
    fn insert_at_explicit_path() {
        let mut tree = tree_with(2);
        tree.insert_at(&[0], w(3), LayoutKind::Horizontal).unwrap();
        assert_eq!(tree.windows(), vec![w(3), w(1), w(2)]);
        // Wrap the middle leaf, new window before it.
        tree.insert_at(&[1, 0], w(4), LayoutKind::Vertical).unwrap();
        assert_eq!(tree.windows(), vec![w(3), w(4), w(1), w(2)]);
        let n4 = tree.node_for(w(4)).unwrap();
        assert_eq!(tree.path_of(n4), vec![1, 0]);
        assert_eq!(tree.layout(tree.parent(n4).unwrap()), Some(LayoutKind::Vertical));
        tree.check_invariants();
    }

    #[test]
    fn insert_at_rejects_bad_paths() {
        let mut tree = tree_with(2);
        assert_eq!(
            tree.insert_at(&[5], w(3), LayoutKind::Horizontal),
            Err(TreeError::InvalidPath(vec![5]))
        );
        assert!(tree.insert_at(&[], w(3), LayoutKind::Horizontal).is_err());
        assert!(tree.insert_at(&[0, 0, 0], w(3), LayoutKind::Horizontal).is_err());
        let mut empty = LayoutTree::new();
        assert!(empty.insert_at(&[1], w(1), LayoutKind::Horizontal).is_err());
        assert!(empty.insert_at(&[0], w(1), LayoutKind::Horizontal).is_ok());
    }

    #[test]
    fn resize_redistributes_proportionally() {
        let mut tree = tree_with(3);
        let n2 = tree.node_for(w(2)).unwrap();
        let n3 = tree.node_for(w(3)).unwrap();
        assert!(tree.resize(n2, 0.5, 0.05));
        assert!(!tree.resize(n3, 0.0, 0.05));
        let root = tree.root().unwrap();
        let total: f64 = tree.children(root).iter().map(|&c| tree.weight(c)).sum();
        assert!((total - 3.0).abs() < 1e-9);
        assert!(tree.weight(n2) > 1.0);
    }

    #[test]
    fn resize_is_clamped_to_min_share() {
        let mut tree = tree_with(2);
        let n1 = tree.node_for(w(1)).unwrap();
        let n2 = tree.node_for(w(2)).unwrap();
        assert!(tree.resize(n1, 10.0, 0.05));
        assert!((tree.weight(n2) - 0.1).abs() < 1e-9);
        assert!((tree.weight(n1) - 1.9).abs() < 1e-9);
        // Already at the floor.
        assert!(!tree.resize(n1, 1.0, 0.05));
        assert!(tree.resize(n1, -10.0, 0.05));
        assert!((tree.weight(n1) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn grow_skips_siblings_already_at_the_floor() {
        let mut tree = tree_with(2);
        let n1 = tree.node_for(w(1)).unwrap();
        let n2 = tree.node_for(w(2)).unwrap();
        assert!(tree.resize(n1, 10.0, 0.05));
        tree.insert_after(Some(w(2)), w(3), LayoutKind::Horizontal);
        let n3 = tree.node_for(w(3)).unwrap();
        let (before, starved) = (tree.weight(n1), tree.weight(n2));

        assert!(tree.resize(n1, 0.1, 0.05));
        assert!(tree.weight(n1) > before);
        assert_eq!(tree.weight(n2), starved);
        assert!(tree.weight(n3) < 1.0);
        let root = tree.root().unwrap();
        let total: f64 = tree.children(root).iter().map(|&c| tree.weight(c)).sum();
        assert!((total - 3.0).abs() < 1e-9);

        // Shrinking still works and feeds every sibling.
        assert!(tree.resize(n1, -0.1, 0.05));
        assert!(tree.weight(n2) > starved);
        tree.check_invariants();
    }

    #[test]
    fn crowded_container_never_inverts_a_resize() {
        let mut tree = tree_with(25);
        let n1 = tree.node_for(w(1)).unwrap();
        // Every child sits below 5% of the total, so nothing may move.
        assert!(!tree.resize(n1, -0.01, 0.05));
        assert_eq!(tree.weight(n1), 1.0);
        assert!(!tree.resize(n1, 0.01, 0.05));
        assert_eq!(tree.weight(n1), 1.0);
        tree.check_invariants();
    }

    #[test]
    fn resize_window_picks_matching_ancestor() {
        let mut tree = tree_with(3);
        tree.join(w(2), Direction::Right);
        // H[w1, V[w2, w3]]: a horizontal resize of w2 acts on the V container.
        assert!(tree.resize_window(w(2), Some(Orientation::Horizontal), 0.1, 0.05));
        let inner = tree.parent_of_window(w(2)).unwrap();
        assert!(tree.weight(inner) > 1.0);
        assert!(tree.resize_window(w(2), Some(Orientation::Vertical), 0.1, 0.05));
        assert!(!tree.resize_window(w(9), None, 0.1, 0.05));
    }

    #[test]
    fn join_flips_two_child_parent() {
        let mut tree = tree_with(2);
        assert!(tree.join(w(1), Direction::Right));
        assert_eq!(tree.layout(tree.root().unwrap()), Some(LayoutKind::Vertical));
        assert!(!tree.join(w(1), Direction::Right));
        tree.check_invariants();
    }

    #[test]
    fn move_window_swaps_then_moves_out() {
        let mut tree = tree_with(3);
        assert_eq!(tree.move_window(w(1), Direction::Right), MoveOutcome::Moved);
        assert_eq!(tree.windows(), vec![w(2), w(1), w(3)]);
        assert_eq!(tree.move_window(w(2), Direction::Left), MoveOutcome::AtEdge);
        assert_eq!(tree.move_window(w(2), Direction::Up), MoveOutcome::AtEdge);

        tree.join(w(1), Direction::Right);
        // H[w2, V[w1, w3]]: moving w1 left leaves the V container.
        assert_eq!(tree.move_window(w(1), Direction::Left), MoveOutcome::Moved);
        assert_eq!(tree.windows(), vec![w(2), w(1), w(3)]);
        let root = tree.root().unwrap();
        assert_eq!(tree.children(root).len(), 3);
        tree.check_invariants();
        assert_eq!(tree.move_window(w(9), Direction::Left), MoveOutcome::NotFound);
    }

    #[test]
    fn swap_keeps_weights_in_place() {
        let mut tree = tree_with(2);
        let n1 = tree.node_for(w(1)).unwrap();
        tree.resize(n1, 0.25, 0.05);
        let left_weight = tree.weight(n1);
        assert!(tree.swap_windows(w(1), w(2)));
        assert_eq!(tree.windows(), vec![w(2), w(1)]);
        assert_eq!(tree.weight(tree.node_for(w(2)).unwrap()), left_weight);
    }

    #[test]
    fn rebalance_resets_weights() {
        let mut tree = tree_with(3);
        let n1 = tree.node_for(w(1)).unwrap();
        tree.resize(n1, 0.3, 0.05);
        tree.rebalance_all();
        let root = tree.root().unwrap();
        assert!(tree.children(root).iter().all(|&c| tree.weight(c) == 1.0));
    }

    #[test]
    fn invariants_hold_over_mixed_sequence() {
        let mut tree = LayoutTree::new();
        let mut alive = Vec::new();
        for i in 1..=24u32 {
            let anchor = alive.get((i as usize * 7) % (alive.len().max(1))).copied();
            tree.insert_after(anchor, w(i), LayoutKind::Horizontal);
            alive.push(w(i));
            if i % 3 == 0 {
                tree.join(w(i), Direction::Left);
            }
            if i % 4 == 0 {
                let victim = alive.remove((i as usize * 5) % alive.len());
                assert!(tree.remove_window(victim));
            }
            tree.check_invariants();
        }
        let mut remaining = tree.windows();
        remaining.sort();
        alive.sort();
        assert_eq!(remaining, alive);
    }
}
