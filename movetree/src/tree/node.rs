use crate::annotations::Annotations;
use crate::moves::MoveDescriptor;
use crate::position::Position;

/// Handle to a node of one specific [`MoveTree`](super::MoveTree).
///
/// Ids carry the identity of the tree that issued them, so a handle from
/// another tree is rejected instead of silently addressing a foreign slot.
/// Slots are never reused: a handle to a deleted node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) tree: u32,
    pub(crate) index: u32,
}

impl NodeId {
    pub(crate) fn new(tree: u32, index: usize) -> Self {
        Self {
            tree,
            index: index as u32,
        }
    }

    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }

    pub fn is_root(self) -> bool {
        self.index == 0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tree, self.index)
    }
}

/// One ply of the tree, or the virtual root when `mv` is `None`.
#[derive(Debug, Clone)]
pub struct MoveNode {
    pub(crate) ply: u32,
    pub(crate) mv: Option<MoveDescriptor>,
    pub(crate) position: Position,
    pub(crate) next: Option<NodeId>,
    pub(crate) variations: Vec<NodeId>,
    pub(crate) previous: Option<NodeId>,
    pub(crate) annotations: Annotations,
}

impl MoveNode {
    pub(crate) fn root(position: Position) -> Self {
        Self {
            ply: position.starting_ply(),
            mv: None,
            position,
            next: None,
            variations: Vec::new(),
            previous: None,
            annotations: Annotations::new(),
        }
    }

    pub(crate) fn child(parent: NodeId, ply: u32, mv: MoveDescriptor, position: Position) -> Self {
        Self {
            ply,
            mv: Some(mv),
            position,
            next: None,
            variations: Vec::new(),
            previous: Some(parent),
            annotations: Annotations::new(),
        }
    }

    /// 1-based half-move index. The root holds the ply of its start position.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn mv(&self) -> Option<&MoveDescriptor> {
        self.mv.as_ref()
    }

    pub fn san(&self) -> Option<&str> {
        self.mv.as_ref().map(|mv| mv.san.as_str())
    }

    /// Position after this move.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Mainline continuation.
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Heads of the alternatives to [`MoveNode::next`], in order.
    pub fn variations(&self) -> &[NodeId] {
        &self.variations
    }

    /// Parent node. `None` only for the virtual root.
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_root(&self) -> bool {
        self.mv.is_none()
    }

    /// `next` followed by the variation heads.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.next.into_iter().chain(self.variations.iter().copied())
    }
}
