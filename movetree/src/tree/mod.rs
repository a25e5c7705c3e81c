//! Arena-backed move tree.
//!
//! Nodes live in a slot vector owned by the tree and refer to each other by
//! [`NodeId`]. Ownership runs strictly downwards through `next` and
//! `variations`; `previous` is a plain index used for upward lookups only.
//! Every non-root node is referenced by exactly one slot of its parent.

mod node;
mod traversal;

use std::sync::atomic::{AtomicU32, Ordering};

use cozy_chess::Move;
use tracing::debug;

use crate::annotations::{AnnotationError, AnnotationKey, Annotations, Nag};
use crate::moves::MoveDescriptor;
use crate::pgn::san::{parse_san, SanError};
use crate::position::Position;
use crate::uci::{parse_uci_move, UciError};

pub use node::{MoveNode, NodeId};
pub use traversal::{Line, Preorder};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

fn next_tree_id() -> u32 {
    NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct MoveTree {
    id: u32,
    nodes: Vec<Option<MoveNode>>,
    len: usize,
}

impl MoveTree {
    /// Empty tree rooted at `start`.
    pub fn new(start: Position) -> Self {
        Self {
            id: next_tree_id(),
            nodes: vec![Some(MoveNode::root(start))],
            len: 0,
        }
    }

    /// The virtual root. It carries no move.
    pub fn root(&self) -> NodeId {
        NodeId::new(self.id, 0)
    }

    pub fn start_position(&self) -> &Position {
        &self.root_node().position
    }

    /// Number of moves in the tree, variations included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&MoveNode> {
        if id.tree != self.id {
            return None;
        }
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&MoveNode, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MoveNode, TreeError> {
        if id.tree != self.id {
            return Err(TreeError::UnknownNode(id));
        }
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    fn root_node(&self) -> &MoveNode {
        match self.nodes.first() {
            Some(Some(root)) => root,
            _ => unreachable!("the root slot is never vacated"),
        }
    }

    /// Cached position after `id`; the start position for the root.
    pub fn position_at(&self, id: NodeId) -> Result<&Position, TreeError> {
        Ok(&self.node(id)?.position)
    }

    /// Pre-order walk over every move of the tree.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder::new(self, self.root())
    }

    /// Pre-order walk over every move below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Result<Preorder<'_>, TreeError> {
        self.node(id)?;
        Ok(Preorder::new(self, id))
    }

    pub fn mainline(&self) -> Line<'_> {
        Line::new(self, self.root())
    }

    /// The `next` chain below `id`.
    pub fn line_after(&self, id: NodeId) -> Result<Line<'_>, TreeError> {
        self.node(id)?;
        Ok(Line::new(self, id))
    }

    /// `next` then the variation heads of `id`.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.node(id)?.children().collect())
    }

    /// Existing child of `parent` that plays `mv`.
    pub fn find_child(&self, parent: NodeId, mv: Move) -> Option<NodeId> {
        let node = self.get(parent)?;
        node.children()
            .find(|child| self.get(*child).and_then(MoveNode::mv).is_some_and(|d| d.raw() == mv))
    }

    /// Play `mv` after `parent`.
    ///
    /// An existing continuation with the same move is returned as is. A new
    /// move becomes the mainline if `parent` has none, otherwise a new
    /// variation. Existing continuations are never replaced.
    pub fn insert_move(&mut self, parent: NodeId, mv: Move) -> Result<NodeId, TreeError> {
        self.node(parent)?;
        if let Some(existing) = self.find_child(parent, mv) {
            return Ok(existing);
        }
        self.add_variation(parent, mv)
    }

    /// Like [`MoveTree::insert_move`], but always creates a new branch.
    pub fn add_variation(&mut self, parent: NodeId, mv: Move) -> Result<NodeId, TreeError> {
        let parent_node = self.node(parent)?;
        let position = parent_node.position.play(mv).map_err(|e| TreeError::IllegalMove(e.to_string()))?;
        let descriptor = MoveDescriptor::describe(&parent_node.position, mv)
            .ok_or_else(|| TreeError::IllegalMove(crate::uci::format_uci_move(mv)))?;
        let ply = parent_node.ply + 1;

        let id = NodeId::new(self.id, self.nodes.len());
        debug!(node = %id, parent = %parent, san = %descriptor.san, ply, "insert move");
        self.nodes
            .push(Some(MoveNode::child(parent, ply, descriptor, position)));
        self.len += 1;

        let parent_node = self.node_mut(parent)?;
        if parent_node.next.is_none() {
            debug_assert!(parent_node.variations.is_empty());
            parent_node.next = Some(id);
        } else {
            parent_node.variations.push(id);
        }
        Ok(id)
    }

    pub fn insert_san(&mut self, parent: NodeId, san: &str) -> Result<NodeId, TreeError> {
        let mv = parse_san(self.position_at(parent)?.board(), san)?;
        self.insert_move(parent, mv)
    }

    pub fn insert_uci(&mut self, parent: NodeId, uci: &str) -> Result<NodeId, TreeError> {
        let mv = parse_uci_move(self.position_at(parent)?.board(), uci)?;
        self.insert_move(parent, mv)
    }

    /// Remove `id` and everything below it.
    ///
    /// When the mainline slot of the parent is vacated, its first variation
    /// takes its place. Returns the number of removed moves.
    pub fn delete_from(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let parent = self.node(id)?.previous.ok_or(TreeError::RootMutation)?;

        let parent_node = self.node_mut(parent)?;
        if parent_node.next == Some(id) {
            parent_node.next = if parent_node.variations.is_empty() {
                None
            } else {
                Some(parent_node.variations.remove(0))
            };
        } else if let Some(idx) = parent_node.variations.iter().position(|v| *v == id) {
            parent_node.variations.remove(idx);
        } else {
            debug_assert!(false, "node {id} is not referenced by its parent {parent}");
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current.slot()).and_then(Option::take) else {
                debug_assert!(false, "node {current} reachable twice");
                continue;
            };
            removed += 1;
            stack.extend(node.next);
            stack.extend(node.variations);
        }
        self.len -= removed;
        debug!(node = %id, removed, "delete subtree");
        Ok(removed)
    }

    /// Swap a variation head with its parent's mainline move.
    pub fn promote_variation(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.previous.ok_or(TreeError::RootMutation)?;
        let parent_node = self.node_mut(parent)?;
        let idx = parent_node
            .variations
            .iter()
            .position(|v| *v == id)
            .ok_or(TreeError::NotAVariation(id))?;
        let Some(mainline) = parent_node.next else {
            debug_assert!(false, "variations without a mainline move at {parent}");
            return Err(TreeError::NotAVariation(id));
        };
        parent_node.variations[idx] = mainline;
        parent_node.next = Some(id);
        debug!(node = %id, demoted = %mainline, "promote variation");
        Ok(())
    }

    /// Change the move played at `id`, recomputing every position below it.
    ///
    /// Fails without touching the tree if any continuation becomes illegal.
    pub fn replace_move(&mut self, id: NodeId, mv: Move) -> Result<(), TreeError> {
        let node = self.node(id)?;
        let parent = node.previous.ok_or(TreeError::RootMutation)?;
        if node.mv.as_ref().is_some_and(|d| d.raw() == mv) {
            return Ok(());
        }
        let parent_node = self.node(parent)?;
        if parent_node.children().any(|sibling| {
            sibling != id && self.get(sibling).and_then(MoveNode::mv).is_some_and(|d| d.raw() == mv)
        }) {
            return Err(TreeError::DuplicateMove(crate::uci::format_uci_move(mv)));
        }

        // Recompute into a staging list first so a failure leaves the tree intact.
        let mut updates: Vec<(NodeId, MoveDescriptor, Position)> = Vec::new();
        let mut stack: Vec<(NodeId, Move, Position)> = vec![(id, mv, parent_node.position.clone())];
        while let Some((current, played, before)) = stack.pop() {
            let after = before.play(played).map_err(|_| {
                if current == id {
                    TreeError::IllegalMove(crate::uci::format_uci_move(played))
                } else {
                    TreeError::IllegalContinuation {
                        node: current,
                        san: self
                            .get(current)
                            .and_then(MoveNode::san)
                            .unwrap_or_default()
                            .to_string(),
                    }
                }
            })?;
            let descriptor = MoveDescriptor::describe(&before, played)
                .ok_or_else(|| TreeError::IllegalMove(crate::uci::format_uci_move(played)))?;
            for child in self.node(current)?.children() {
                if let Some(child_mv) = self.get(child).and_then(MoveNode::mv) {
                    stack.push((child, child_mv.raw(), after.clone()));
                }
            }
            updates.push((current, descriptor, after));
        }

        let count = updates.len();
        for (current, descriptor, position) in updates {
            let node = self.node_mut(current)?;
            node.mv = Some(descriptor);
            node.position = position;
        }
        debug!(node = %id, recomputed = count, "replace move");
        Ok(())
    }

    /// Ids from the first move down to `id`, root excluded.
    pub fn path_to(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = Vec::new();
        let mut cursor = id;
        loop {
            let node = self.node(cursor)?;
            match node.previous {
                Some(parent) => {
                    path.push(cursor);
                    cursor = parent;
                }
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    /// SAN of every move from the first move down to `id`.
    pub fn san_path(&self, id: NodeId) -> Result<Vec<String>, TreeError> {
        self.path_to(id)?
            .into_iter()
            .map(|step| Ok(self.node(step)?.san().unwrap_or_default().to_string()))
            .collect()
    }

    /// Follow a SAN path from the root, taking the first matching child at
    /// each step. An empty path addresses the root.
    pub fn find_by_san_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut cursor = self.root();
        for san in path {
            let node = self.get(cursor)?;
            cursor = node
                .children()
                .find(|child| self.get(*child).and_then(MoveNode::san) == Some(san.as_ref()))?;
        }
        Some(cursor)
    }

    /// Child index of every move from the first move down to `id`: 0 is the
    /// mainline continuation, `n` the n-th variation. Unlike a SAN path this
    /// tells apart sibling branches that play the same move.
    pub fn index_path(&self, id: NodeId) -> Result<Vec<usize>, TreeError> {
        let mut path = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.node(cursor)?.previous {
            let index = self
                .node(parent)?
                .children()
                .position(|child| child == cursor)
                .ok_or(TreeError::UnknownNode(cursor))?;
            path.push(index);
            cursor = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Follow child indices from the root. An empty path addresses the root.
    pub fn find_by_index_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut cursor = self.root();
        for &index in path {
            cursor = self.get(cursor)?.children().nth(index)?;
        }
        Some(cursor)
    }

    pub fn annotations(&self, id: NodeId) -> Result<&Annotations, TreeError> {
        Ok(&self.node(id)?.annotations)
    }

    /// Direct access to a node's store. Root-only restrictions of
    /// [`MoveTree::set_annotation`] do not apply here.
    pub fn annotations_mut(&mut self, id: NodeId) -> Result<&mut Annotations, TreeError> {
        Ok(&mut self.node_mut(id)?.annotations)
    }

    /// Rendered value with any dirty marker intact. Unknown keys are `None`.
    pub fn annotation(&self, id: NodeId, key: &AnnotationKey) -> Result<Option<String>, TreeError> {
        Ok(self.annotations(id)?.get(key))
    }

    pub fn set_annotation(
        &mut self,
        id: NodeId,
        key: AnnotationKey,
        value: &str,
    ) -> Result<(), TreeError> {
        self.node(id)?;
        if id.is_root() && key == AnnotationKey::CommentBefore {
            return Err(TreeError::RootMutation);
        }
        self.annotations_mut(id)?.set(key, value)?;
        Ok(())
    }

    pub fn mark_saved(&mut self, id: NodeId, key: &AnnotationKey) -> Result<bool, TreeError> {
        Ok(self.annotations_mut(id)?.mark_saved(key))
    }

    pub fn is_dirty(&self, id: NodeId, key: &AnnotationKey) -> Result<bool, TreeError> {
        Ok(self.annotations(id)?.is_dirty(key))
    }

    pub fn add_nag(&mut self, id: NodeId, nag: Nag) -> Result<bool, TreeError> {
        if self.node(id)?.is_root() {
            return Err(TreeError::RootMutation);
        }
        Ok(self.annotations_mut(id)?.add_nag(nag))
    }

    pub fn remove_nag(&mut self, id: NodeId, nag: Nag) -> Result<bool, TreeError> {
        Ok(self.annotations_mut(id)?.nags_mut().remove(nag))
    }
}

/// A clone is a distinct tree: it takes a fresh id, so handles issued by
/// the original are rejected by the copy and the other way round.
impl Clone for MoveTree {
    fn clone(&self) -> Self {
        let id = next_tree_id();
        let rebase = |node: NodeId| NodeId { tree: id, ..node };
        let nodes = self
            .nodes
            .iter()
            .map(|slot| {
                slot.as_ref().map(|node| {
                    let mut node = node.clone();
                    node.next = node.next.map(rebase);
                    node.previous = node.previous.map(rebase);
                    for variation in &mut node.variations {
                        *variation = rebase(*variation);
                    }
                    node
                })
            })
            .collect();
        Self {
            id,
            nodes,
            len: self.len,
        }
    }
}

impl Default for MoveTree {
    fn default() -> Self {
        Self::new(Position::default())
    }
}

/// Structural equality: same start position, same shape, same moves and
/// same annotations. Node ids are not compared.
impl PartialEq for MoveTree {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.root(), other.root())];
        while let Some((a, b)) = stack.pop() {
            let (Some(a), Some(b)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if a.ply != b.ply
                || a.san() != b.san()
                || a.position != b.position
                || a.annotations != b.annotations
                || a.next.is_some() != b.next.is_some()
                || a.variations.len() != b.variations.len()
            {
                return false;
            }
            stack.extend(a.children().zip(b.children()));
        }
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Node {0} does not belong to this tree")]
    UnknownNode(NodeId),
    #[error("The root node cannot be changed this way")]
    RootMutation,
    #[error("Node {0} is not a variation head")]
    NotAVariation(NodeId),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Move {0} is already played from this position")]
    DuplicateMove(String),
    #[error("Continuation {san} at node {node} would become illegal")]
    IllegalContinuation { node: NodeId, san: String },
    #[error("SAN error: {0}")]
    San(#[from] SanError),
    #[error("UCI error: {0}")]
    Uci(#[from] UciError),
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_line(sans: &[&str]) -> (MoveTree, Vec<NodeId>) {
        let mut tree = MoveTree::default();
        let mut ids = Vec::new();
        let mut parent = tree.root();
        for san in sans {
            parent = tree.insert_san(parent, san).unwrap();
            ids.push(parent);
        }
        (tree, ids)
    }

    /// Count how many slots across the tree reference `id`.
    fn references(tree: &MoveTree, id: NodeId) -> usize {
        std::iter::once((tree.root(), tree.get(tree.root()).unwrap()))
            .chain(tree.preorder())
            .map(|(_, node)| node.children().filter(|c| *c == id).count())
            .sum()
    }

    #[test]
    fn test_insert_sets_next_then_appends_variations() {
        let (mut tree, ids) = tree_with_line(&["e4"]);
        let e5 = tree.insert_san(ids[0], "e5").unwrap();
        let c5 = tree.insert_san(ids[0], "c5").unwrap();

        let e4 = tree.node(ids[0]).unwrap();
        assert_eq!(e4.next(), Some(e5));
        assert_eq!(e4.variations(), &[c5]);
        assert_eq!(tree.node(c5).unwrap().previous(), Some(ids[0]));
        assert_eq!(tree.node(c5).unwrap().ply(), 2);
        assert_eq!(references(&tree, c5), 1);
        assert_eq!(references(&tree, e5), 1);
    }

    #[test]
    fn test_insert_existing_move_returns_existing_node() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5"]);
        let c5 = tree.insert_san(ids[0], "c5").unwrap();
        assert_eq!(tree.insert_san(ids[0], "e5").unwrap(), ids[1]);
        assert_eq!(tree.insert_uci(ids[0], "c7c5").unwrap(), c5);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_insert_rejects_illegal_moves_and_foreign_nodes() {
        let (mut tree, ids) = tree_with_line(&["e4"]);
        assert!(matches!(tree.insert_san(ids[0], "e4"), Err(TreeError::San(_))));

        let other = MoveTree::default();
        let foreign = other.root();
        assert!(matches!(
            tree.insert_san(foreign, "e4"),
            Err(TreeError::UnknownNode(_))
        ));
        assert!(matches!(tree.delete_from(foreign), Err(TreeError::UnknownNode(_))));
        assert!(matches!(
            tree.set_annotation(foreign, AnnotationKey::CommentBefore, "x"),
            Err(TreeError::UnknownNode(_))
        ));
        assert!(matches!(tree.add_nag(foreign, Nag::GOOD_MOVE), Err(TreeError::UnknownNode(_))));
    }

    #[test]
    fn test_clone_rejects_ids_minted_after_split() {
        let (mut original, ids) = tree_with_line(&["e4"]);
        let mut copy = original.clone();
        assert_eq!(copy, original);
        assert!(!copy.contains(ids[0]));
        assert!(!copy.contains(original.root()));

        let d4 = original.insert_san(original.root(), "d4").unwrap();
        let c4 = copy.insert_san(copy.root(), "c4").unwrap();
        assert_ne!(d4, c4);
        assert!(matches!(copy.delete_from(d4), Err(TreeError::UnknownNode(_))));
        assert!(matches!(original.delete_from(c4), Err(TreeError::UnknownNode(_))));
        assert!(copy.contains(c4));
        assert!(original.contains(d4));
        assert_eq!(copy.san_path(c4).unwrap(), vec!["c4"]);
    }

    #[test]
    fn test_clone_links_stay_inside_the_copy() {
        let (original, _) = tree_with_line(&["e4", "e5", "Nf3"]);
        let copy = original.clone();
        let nf3 = copy.find_by_san_path(&["e4", "e5", "Nf3"]).unwrap();
        let path = copy.path_to(nf3).unwrap();
        assert_eq!(path.len(), 3);
        assert!(path.iter().all(|id| copy.contains(*id) && !original.contains(*id)));
        assert_eq!(copy.node(path[0]).unwrap().previous(), Some(copy.root()));
    }

    #[test]
    fn test_index_paths_tell_duplicate_branches_apart() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5"]);
        let root = tree.root();
        let mv = parse_san(tree.start_position().board(), "e4").unwrap();
        let twin = tree.add_variation(root, mv).unwrap();
        let c5 = tree.insert_san(twin, "c5").unwrap();

        assert_eq!(tree.san_path(c5).unwrap(), vec!["e4", "c5"]);
        assert_eq!(tree.find_by_san_path(&["e4", "c5"]), None);
        assert_eq!(tree.index_path(c5).unwrap(), vec![1, 0]);
        assert_eq!(tree.find_by_index_path(&[1, 0]), Some(c5));
        assert_eq!(tree.index_path(ids[1]).unwrap(), vec![0, 0]);
        assert_eq!(tree.find_by_index_path(&[0, 0]), Some(ids[1]));
        assert_eq!(tree.index_path(root).unwrap(), Vec::<usize>::new());
        assert_eq!(tree.find_by_index_path(&[]), Some(root));
        assert_eq!(tree.find_by_index_path(&[2]), None);
    }

    #[test]
    fn test_delete_unlinks_and_removes_subtree() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5", "Nf3"]);
        let c5 = tree.insert_san(ids[0], "c5").unwrap();
        let c5_nf3 = tree.insert_san(c5, "Nf3").unwrap();

        assert_eq!(tree.delete_from(c5).unwrap(), 2);
        assert!(!tree.contains(c5));
        assert!(!tree.contains(c5_nf3));
        assert!(tree.preorder().all(|(id, _)| id != c5 && id != c5_nf3));
        assert!(tree.node(ids[0]).unwrap().variations().is_empty());
        assert_eq!(tree.len(), 3);
        assert!(matches!(tree.delete_from(c5), Err(TreeError::UnknownNode(_))));
    }

    #[test]
    fn test_deleting_mainline_promotes_first_variation() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5"]);
        let c5 = tree.insert_san(ids[0], "c5").unwrap();
        let e6 = tree.insert_san(ids[0], "e6").unwrap();

        assert_eq!(tree.delete_from(ids[1]).unwrap(), 1);
        let e4 = tree.node(ids[0]).unwrap();
        assert_eq!(e4.next(), Some(c5));
        assert_eq!(e4.variations(), &[e6]);
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let (mut tree, _) = tree_with_line(&["e4"]);
        let root = tree.root();
        assert!(matches!(tree.delete_from(root), Err(TreeError::RootMutation)));
    }

    #[test]
    fn test_promote_variation_swaps_with_mainline() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5"]);
        let c5 = tree.insert_san(ids[0], "c5").unwrap();
        tree.promote_variation(c5).unwrap();
        let e4 = tree.node(ids[0]).unwrap();
        assert_eq!(e4.next(), Some(c5));
        assert_eq!(e4.variations(), &[ids[1]]);
        assert!(matches!(
            tree.promote_variation(c5),
            Err(TreeError::NotAVariation(_))
        ));
    }

    #[test]
    fn test_replace_move_recomputes_descendants() {
        let (mut tree, ids) = tree_with_line(&["Nf3", "d5", "g3"]);
        let mv = parse_san(tree.start_position().board(), "Nc3").unwrap();
        tree.replace_move(ids[0], mv).unwrap();
        assert_eq!(tree.san_path(ids[2]).unwrap(), vec!["Nc3", "d5", "g3"]);
        assert_eq!(
            tree.position_at(ids[2]).unwrap().normalized_fen(),
            "rnbqkbnr/ppp1pppp/8/3p4/8/2N3P1/PPPPPP1P/R1BQKBNR b KQkq -"
        );
    }

    #[test]
    fn test_replace_move_rejects_broken_continuation() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5", "Bc4"]);
        let before = tree.clone();
        let mv = parse_san(tree.start_position().board(), "d4").unwrap();
        assert!(matches!(
            tree.replace_move(ids[0], mv),
            Err(TreeError::IllegalContinuation { .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_replace_move_rejects_sibling_duplicate() {
        let (mut tree, ids) = tree_with_line(&["e4"]);
        tree.insert_san(tree.root(), "d4").unwrap();
        let mv = parse_san(tree.start_position().board(), "d4").unwrap();
        assert!(matches!(
            tree.replace_move(ids[0], mv),
            Err(TreeError::DuplicateMove(_))
        ));
    }

    #[test]
    fn test_san_paths_address_nodes() {
        let (mut tree, ids) = tree_with_line(&["e4", "e5"]);
        let c5 = tree.insert_san(ids[0], "c5").unwrap();
        let nf3 = tree.insert_san(c5, "Nf3").unwrap();
        assert_eq!(tree.san_path(nf3).unwrap(), vec!["e4", "c5", "Nf3"]);
        assert_eq!(tree.find_by_san_path(&["e4", "c5", "Nf3"]), Some(nf3));
        assert_eq!(tree.find_by_san_path::<&str>(&[]), Some(tree.root()));
        assert_eq!(tree.find_by_san_path(&["d4"]), None);
        assert_eq!(tree.path_to(nf3).unwrap(), vec![ids[0], c5, nf3]);
    }

    #[test]
    fn test_position_at_root_is_start_position() {
        let start = Position::from_fen("8/8/8/4k3/8/8/8/4K2R w K - 0 1").unwrap();
        let tree = MoveTree::new(start.clone());
        assert_eq!(tree.position_at(tree.root()).unwrap(), &start);
    }

    #[test]
    fn test_annotation_wrappers_use_the_store() {
        let (mut tree, ids) = tree_with_line(&["e4"]);
        let key = AnnotationKey::TrainingComment;
        tree.set_annotation(ids[0], key.clone(), "bob,Bob,unsaved").unwrap();
        assert!(tree.is_dirty(ids[0], &key).unwrap());
        assert!(tree.mark_saved(ids[0], &key).unwrap());
        assert_eq!(tree.annotation(ids[0], &key).unwrap().as_deref(), Some("bob,Bob"));
        assert_eq!(tree.annotation(ids[0], &AnnotationKey::Clock).unwrap(), None);

        let root = tree.root();
        assert!(tree.set_annotation(root, AnnotationKey::CommentBefore, "x").is_err());
        assert!(tree.add_nag(root, Nag::GOOD_MOVE).is_err());
    }
}
