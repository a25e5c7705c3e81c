//! Merging lines from one tree into another.
//!
//! Moves already present in the target are reused; everything else is added
//! as new mainline moves or variations. Annotations of the source are folded
//! into the target according to [`MergeOptions`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::annotations::{AnnotationError, AnnotationKey, AnnotationValue, Annotations};
use crate::game::Game;
use crate::tree::{MoveTree, NodeId, TreeError};

/// How a category of source annotations is combined with the target's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Keep the target's annotations only.
    Discard,
    /// Source annotations replace the target's where the source has any.
    Overwrite,
    /// Source annotations are added to the target's.
    #[default]
    Append,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub comments: MergeMode,
    pub nags: MergeMode,
    pub drawables: MergeMode,
    /// Appended to the comment of the last merged mainline move.
    pub citation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub created: usize,
    pub matched: usize,
    /// Target node of the last move of the merged line.
    pub last_mainline: Option<NodeId>,
}

/// A line suggested by another user, rooted at the position where it starts.
#[derive(Debug, Clone)]
pub struct SuggestedVariation {
    pub line: MoveTree,
    /// `username,display name,comment id` recorded on every new node.
    pub training_comment: String,
    /// Sortable creation timestamp; suggestions merge oldest first.
    pub created_at: String,
}

const COMMENT_SEPARATOR: &str = "\n\n";

/// Merge the line following `source_parent` in `source` into `target`
/// after `at`, including every variation nested in it.
pub fn merge_line(
    target: &mut MoveTree,
    at: NodeId,
    source: &MoveTree,
    source_parent: NodeId,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    let report = merge_into(target, at, source, source_parent, Some(options), None)?;
    if let (Some(citation), Some(last)) = (&options.citation, report.last_mainline) {
        let citation = citation.trim();
        if !citation.is_empty() {
            append_comment(target.annotations_mut(last)?, AnnotationKey::CommentAfter, citation)?;
        }
    }
    debug!(created = report.created, matched = report.matched, "merge line");
    Ok(report)
}

/// Merge a whole game into another. Both must start from the same position.
pub fn merge_games(
    source: &Game,
    target: &mut Game,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    let source_fen = source.tree().start_position().normalized_fen();
    let target_fen = target.tree().start_position().normalized_fen();
    if source_fen != target_fen {
        return Err(MergeError::StartPositionMismatch {
            source_fen,
            target_fen,
        });
    }

    let source_tree = source.tree();
    let target_tree = target.tree_mut();
    let target_root = target_tree.root();
    merge_annotations(
        source_tree.annotations(source_tree.root())?,
        target_tree.annotations_mut(target_root)?,
        options,
    )?;
    merge_line(target_tree, target_root, source_tree, source_tree.root(), options)
}

/// Merge suggested lines into `target` at every node whose position
/// matches the start of a suggestion.
///
/// Suggestions for the same position are merged oldest first. Nodes created
/// by a suggestion carry its training comment. A suggestion that no longer
/// fits the target is skipped. Returns the number of created nodes.
pub fn merge_suggestions(target: &mut MoveTree, suggestions: &[SuggestedVariation]) -> usize {
    let mut by_fen: HashMap<String, Vec<&SuggestedVariation>> = HashMap::new();
    for suggestion in suggestions {
        by_fen
            .entry(suggestion.line.start_position().normalized_fen())
            .or_default()
            .push(suggestion);
    }
    if by_fen.is_empty() {
        return 0;
    }
    for group in by_fen.values_mut() {
        group.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }

    // Only positions present before the merge are branch points.
    let root = target.root();
    let mut stack = vec![root];
    let mut anchors = Vec::new();
    while let Some(id) = stack.pop() {
        let Some(node) = target.get(id) else {
            continue;
        };
        if let Some(group) = by_fen.get(&node.position().normalized_fen()) {
            anchors.push((id, group));
        }
        stack.extend(node.children());
    }

    let mut created = 0;
    for (anchor, group) in anchors {
        for suggestion in group {
            let line = &suggestion.line;
            match merge_into(
                target,
                anchor,
                line,
                line.root(),
                None,
                Some(&suggestion.training_comment),
            ) {
                Ok(report) => created += report.created,
                Err(err) => warn!(
                    anchor = %anchor,
                    comment = %suggestion.training_comment,
                    "skipping suggested variation: {err}"
                ),
            }
        }
    }
    debug!(suggestions = suggestions.len(), created, "merge suggestions");
    created
}

/// Explicit-stack merge. Each work item is a target parent and the head of a
/// source line to replay under it.
fn merge_into(
    target: &mut MoveTree,
    at: NodeId,
    source: &MoveTree,
    source_parent: NodeId,
    options: Option<&MergeOptions>,
    tag: Option<&str>,
) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();
    target.node(at)?;
    let Some(first) = source.node(source_parent)?.next() else {
        return Ok(report);
    };

    let mut work = vec![(at, first, true)];
    while let Some((target_parent, head, is_top_line)) = work.pop() {
        let mut t = target_parent;
        let mut cursor = Some(head);
        while let Some(s) = cursor {
            let s_node = source.node(s)?;
            let Some(mv) = s_node.mv() else {
                break;
            };
            let existing = target.find_child(t, mv.raw());
            let new_t = match existing {
                Some(id) => {
                    report.matched += 1;
                    id
                }
                None => {
                    let id = target.insert_move(t, mv.raw())?;
                    report.created += 1;
                    if let Some(tag) = tag {
                        target.set_annotation(id, AnnotationKey::TrainingComment, tag)?;
                    }
                    id
                }
            };

            if let Some(options) = options {
                merge_annotations(s_node.annotations(), target.annotations_mut(new_t)?, options)?;
            }

            if let Some(parent) = s_node.previous() {
                let parent_node = source.node(parent)?;
                if parent_node.next() == Some(s) {
                    for &variation in parent_node.variations().iter().rev() {
                        work.push((t, variation, false));
                    }
                }
            }

            if is_top_line {
                report.last_mainline = Some(new_t);
            }
            t = new_t;
            cursor = s_node.next();
        }
    }
    Ok(report)
}

fn merge_annotations(
    source: &Annotations,
    target: &mut Annotations,
    options: &MergeOptions,
) -> Result<(), MergeError> {
    if options.comments != MergeMode::Discard {
        for key in [AnnotationKey::CommentBefore, AnnotationKey::CommentAfter] {
            let Some(incoming) = source.get(&key) else {
                continue;
            };
            if options.comments == MergeMode::Overwrite || target.get(&key).is_none() {
                target.set(key, &incoming)?;
            } else {
                append_comment(target, key, &incoming)?;
            }
        }
    }

    match options.nags {
        MergeMode::Discard => {}
        MergeMode::Overwrite if !source.nags().is_empty() => {
            target.nags_mut().clear();
            for nag in source.nags().iter() {
                target.add_nag(nag);
            }
        }
        MergeMode::Overwrite => {}
        MergeMode::Append => {
            for nag in source.nags().iter() {
                target.add_nag(nag);
            }
        }
    }

    if options.drawables != MergeMode::Discard {
        for key in [AnnotationKey::Arrows, AnnotationKey::Squares] {
            merge_drawables(source, target, key, options.drawables)?;
        }
    }

    // Remaining commands are only filled in where the target has none.
    for key in source.keys() {
        if matches!(
            key,
            AnnotationKey::CommentBefore
                | AnnotationKey::CommentAfter
                | AnnotationKey::Arrows
                | AnnotationKey::Squares
        ) || target.get(key).is_some()
        {
            continue;
        }
        if let Some(value) = source.get(key) {
            target.set(key.clone(), &value)?;
        }
    }
    Ok(())
}

fn merge_drawables(
    source: &Annotations,
    target: &mut Annotations,
    key: AnnotationKey,
    mode: MergeMode,
) -> Result<(), MergeError> {
    let Some(incoming) = source.value(&key).cloned() else {
        return Ok(());
    };
    let dirty = source.is_dirty(&key) || target.is_dirty(&key);
    let merged = match (mode, target.value(&key)) {
        (MergeMode::Append, Some(AnnotationValue::Arrows(existing))) => {
            let mut arrows = existing.clone();
            if let AnnotationValue::Arrows(new) = incoming {
                arrows.extend(new.into_iter().filter(|a| !existing.contains(a)));
            }
            AnnotationValue::Arrows(arrows)
        }
        (MergeMode::Append, Some(AnnotationValue::Squares(existing))) => {
            let mut squares = existing.clone();
            if let AnnotationValue::Squares(new) = incoming {
                squares.extend(new.into_iter().filter(|s| !existing.contains(s)));
            }
            AnnotationValue::Squares(squares)
        }
        _ => incoming,
    };
    target.set_value(key.clone(), merged)?;
    if dirty {
        target.mark_dirty(&key);
    }
    Ok(())
}

/// Append text to a comment, keeping the entry dirty if either side was.
fn append_comment(
    target: &mut Annotations,
    key: AnnotationKey,
    addition: &str,
) -> Result<(), MergeError> {
    let mut value = match target.text(&key) {
        Some(existing) => format!("{existing}{COMMENT_SEPARATOR}{}", strip(addition)),
        None => strip(addition).to_string(),
    };
    if target.is_dirty(&key) || crate::annotations::has_dirty_marker(addition) {
        value.push_str(crate::annotations::DIRTY_MARKER);
    }
    target.set(key, &value)?;
    Ok(())
}

fn strip(value: &str) -> &str {
    crate::annotations::strip_dirty_marker(value)
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Games do not start from the same position: {source_fen} vs {target_fen}")]
    StartPositionMismatch {
        source_fen: String,
        target_fen: String,
    },
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),
}
