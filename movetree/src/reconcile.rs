//! Dirty-state sweeps used when local edits are persisted or accepted.

use tracing::debug;

use crate::annotations::AnnotationKey;
use crate::tree::{MoveTree, NodeId, TreeError};

/// One annotation entry holding unsynchronized local edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyAnnotation {
    pub node: NodeId,
    pub key: AnnotationKey,
    /// Rendered value, dirty marker included.
    pub value: String,
}

/// Mark `key` as saved on `root` and every node it transitively owns.
///
/// Returns the number of visited nodes, whether or not each was dirty.
pub fn mark_subtree_saved(
    tree: &mut MoveTree,
    root: NodeId,
    key: &AnnotationKey,
) -> Result<usize, TreeError> {
    tree.node(root)?;
    let mut visited = 0;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        tree.mark_saved(id, key)?;
        visited += 1;
        stack.extend(tree.children(id)?);
    }
    debug!(root = %root, key = %key, visited, "mark subtree saved");
    Ok(visited)
}

/// Every dirty entry of the tree, root first, then in pre-order.
pub fn collect_dirty(tree: &MoveTree) -> Vec<DirtyAnnotation> {
    let root = tree.root();
    tree.get(root)
        .map(|node| (root, node))
        .into_iter()
        .chain(tree.preorder())
        .flat_map(|(id, node)| {
            let annotations = node.annotations();
            annotations
                .dirty_keys()
                .filter_map(|key| {
                    annotations.get(key).map(|value| DirtyAnnotation {
                        node: id,
                        key: key.clone(),
                        value,
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Clear the dirty state of every entry. Returns the number of cleared entries.
pub fn mark_all_saved(tree: &mut MoveTree) -> usize {
    let dirty = collect_dirty(tree);
    let mut cleared = 0;
    for entry in &dirty {
        if let Ok(true) = tree.mark_saved(entry.node, &entry.key) {
            cleared += 1;
        }
    }
    cleared
}
