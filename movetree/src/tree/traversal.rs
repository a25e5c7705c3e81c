//! Iterators over a [`MoveTree`].

use super::{MoveNode, MoveTree, NodeId};

enum Work {
    /// Yield the node itself.
    Emit(NodeId),
    /// Schedule everything that follows the node.
    Expand(NodeId),
}

/// Depth-first pre-order walk.
///
/// At a branch point the mainline move comes first, then every variation
/// subtree in order, then the continuation of the mainline move. Runs on an
/// explicit stack, so nesting depth is bounded by memory only.
pub struct Preorder<'a> {
    tree: &'a MoveTree,
    stack: Vec<Work>,
}

impl<'a> Preorder<'a> {
    pub(crate) fn new(tree: &'a MoveTree, from: NodeId) -> Self {
        Self {
            tree,
            stack: vec![Work::Expand(from)],
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (NodeId, &'a MoveNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Emit(id) => {
                    if let Some(node) = self.tree.get(id) {
                        return Some((id, node));
                    }
                }
                Work::Expand(id) => {
                    let Some(node) = self.tree.get(id) else {
                        continue;
                    };
                    let Some(next) = node.next else {
                        continue;
                    };
                    self.stack.push(Work::Expand(next));
                    for &head in node.variations.iter().rev() {
                        self.stack.push(Work::Expand(head));
                        self.stack.push(Work::Emit(head));
                    }
                    self.stack.push(Work::Emit(next));
                }
            }
        }
        None
    }
}

/// The chain of `next` links below a node.
pub struct Line<'a> {
    tree: &'a MoveTree,
    cursor: Option<NodeId>,
}

impl<'a> Line<'a> {
    pub(crate) fn new(tree: &'a MoveTree, after: NodeId) -> Self {
        let cursor = tree.get(after).and_then(|node| node.next);
        Self { tree, cursor }
    }
}

impl<'a> Iterator for Line<'a> {
    type Item = (NodeId, &'a MoveNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.tree.get(id)?;
        self.cursor = node.next;
        Some((id, node))
    }
}
