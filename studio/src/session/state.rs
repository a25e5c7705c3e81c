use std::sync::Arc;

use movetree::pgn::san::parse_san;
use movetree::{
    collect_dirty, mark_subtree_saved, merge_suggestions, strip_dirty_marker, AnnotationKey, Game,
    MoveTree, NodeId, SuggestedVariation, TreeError, DIRTY_MARKER,
};

use super::commands::{MovePath, SessionError};
use super::snapshot::SessionSnapshot;
use crate::sync::AnnotationDelta;

/// All mutable state of one editing session. Only the actor touches it.
pub(crate) struct SessionState {
    pub game_id: String,
    game: Arc<Game>,
    revision: u64,
}

/// Node ids are only valid for the tree that issued them, and a copy on
/// write issues a new tree. Resolve against the tree about to be mutated.
fn resolve(tree: &MoveTree, path: &[usize]) -> Result<NodeId, SessionError> {
    tree.find_by_index_path(path)
        .ok_or_else(|| SessionError::UnknownPath(path.to_vec()))
}

impl SessionState {
    pub fn new(game_id: String, game: Game) -> Self {
        Self {
            game_id,
            game: Arc::new(game),
            revision: 0,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.game_id.clone(),
            revision: self.revision,
            game: Arc::clone(&self.game),
            dirty_count: collect_dirty(self.game.tree()).len(),
        }
    }

    fn game_mut(&mut self) -> &mut Game {
        Arc::make_mut(&mut self.game)
    }

    /// Tree to mutate, after any copy on write. Rejects unknown paths
    /// before copying.
    fn tree_at(&mut self, path: &[usize]) -> Result<(&mut MoveTree, NodeId), SessionError> {
        resolve(self.game.tree(), path)?;
        let tree = self.game_mut().tree_mut();
        let id = resolve(tree, path)?;
        Ok((tree, id))
    }

    fn commit(&mut self) -> SessionSnapshot {
        self.revision += 1;
        self.snapshot()
    }

    pub fn apply_insert_san(
        &mut self,
        parent: &[usize],
        san: &str,
    ) -> Result<(MovePath, SessionSnapshot), SessionError> {
        let (tree, parent) = self.tree_at(parent)?;
        let id = tree.insert_san(parent, san)?;
        let path = tree.index_path(id)?;
        Ok((path, self.commit()))
    }

    /// Add a line as a suggestion. Every move the line creates carries
    /// `training_comment` as a dirty entry; moves already in the tree are
    /// left alone. Nothing changes if any move is illegal.
    pub fn apply_suggest_line(
        &mut self,
        parent: &[usize],
        sans: &[String],
        training_comment: &str,
    ) -> Result<(MovePath, SessionSnapshot), SessionError> {
        if sans.is_empty() {
            return Err(SessionError::EmptyLine);
        }
        let comment = format!("{}{}", strip_dirty_marker(training_comment), DIRTY_MARKER);

        let mut staged = Game::clone(&self.game);
        let tree = staged.tree_mut();
        let mut parent = resolve(tree, parent)?;
        for san in sans {
            let before = tree.len();
            let id = tree.insert_san(parent, san)?;
            if tree.len() > before {
                tree.set_annotation(id, AnnotationKey::TrainingComment, &comment)?;
            }
            parent = id;
        }

        let path = staged.tree().index_path(parent)?;
        self.game = Arc::new(staged);
        tracing::debug!(moves = sans.len(), "suggested line added");
        Ok((path, self.commit()))
    }

    /// Accept the suggestion rooted at `head`: its training comments, and
    /// those of every move below it, become saved.
    pub fn apply_accept_suggestion(&mut self, head: &[usize]) -> Result<usize, SessionError> {
        let (tree, head) = self.tree_at(head)?;
        let visited = mark_subtree_saved(tree, head, &AnnotationKey::TrainingComment)?;
        self.revision += 1;
        Ok(visited)
    }

    pub fn apply_delete_from(&mut self, path: &[usize]) -> Result<usize, SessionError> {
        let (tree, id) = self.tree_at(path)?;
        let removed = tree.delete_from(id)?;
        self.revision += 1;
        Ok(removed)
    }

    pub fn apply_promote_variation(&mut self, path: &[usize]) -> Result<SessionSnapshot, SessionError> {
        let (tree, id) = self.tree_at(path)?;
        tree.promote_variation(id)?;
        Ok(self.commit())
    }

    pub fn apply_replace_move(
        &mut self,
        path: &[usize],
        san: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tree, id) = self.tree_at(path)?;
        let parent = tree.node(id)?.previous().ok_or(TreeError::RootMutation)?;
        let mv = parse_san(tree.position_at(parent)?.board(), san).map_err(TreeError::from)?;
        tree.replace_move(id, mv)?;
        Ok(self.commit())
    }

    /// Record a local edit. Non-empty values stay dirty until synced.
    pub fn apply_set_annotation(
        &mut self,
        path: &[usize],
        key: AnnotationKey,
        value: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tree, id) = self.tree_at(path)?;
        tree.set_annotation(id, key.clone(), value)?;
        tree.annotations_mut(id)?.mark_dirty(&key);
        Ok(self.commit())
    }

    pub fn apply_mark_saved(
        &mut self,
        path: &[usize],
        key: &AnnotationKey,
    ) -> Result<bool, SessionError> {
        let id = resolve(self.game.tree(), path)?;
        if !self.game.tree().is_dirty(id, key)? {
            return Ok(false);
        }
        let (tree, id) = self.tree_at(path)?;
        tree.mark_saved(id, key)?;
        self.revision += 1;
        Ok(true)
    }

    pub fn apply_set_tag(&mut self, name: &str, value: &str) -> Result<SessionSnapshot, SessionError> {
        self.game_mut().tags_mut().set(name, value)?;
        Ok(self.commit())
    }

    pub fn apply_merge_suggestions(&mut self, suggestions: &[SuggestedVariation]) -> usize {
        let created = merge_suggestions(self.game_mut().tree_mut(), suggestions);
        if created > 0 {
            self.revision += 1;
        }
        created
    }

    /// Clear the dirty state of entries whose stored value reached the
    /// repository. Entries edited again since then keep their marker.
    pub fn apply_synced(&mut self, deltas: &[AnnotationDelta]) -> usize {
        let current = |tree: &MoveTree, delta: &AnnotationDelta| {
            let id = tree.find_by_index_path(&delta.path)?;
            let value = tree.annotation(id, &delta.key).ok().flatten()?;
            (value == delta.value).then_some(id)
        };
        if !deltas.iter().any(|delta| current(self.game.tree(), delta).is_some()) {
            return 0;
        }

        let tree = self.game_mut().tree_mut();
        let mut cleared = 0;
        for delta in deltas {
            let Some(id) = current(&*tree, delta) else {
                continue;
            };
            if let Ok(true) = tree.mark_saved(id, &delta.key) {
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.revision += 1;
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|s| s.to_string()).collect()
    }

    fn state(pgn: &str) -> SessionState {
        SessionState::new("g".to_string(), Game::parse(pgn).unwrap())
    }

    #[test]
    fn test_insert_returns_canonical_path() {
        let mut state = state("1. e4 *");
        let (p, snap) = state.apply_insert_san(&[0], "Ng8f6").unwrap();
        assert_eq!(p, vec![0, 0]);
        assert_eq!(snap.revision, 1);
        assert_eq!(snap.game.tree().len(), 2);

        let (again, _) = state.apply_insert_san(&[0], "Nf6").unwrap();
        assert_eq!(again, p);
    }

    #[test]
    fn test_unknown_path_is_rejected() {
        let mut state = state("1. e4 *");
        let err = state.apply_delete_from(&[1]).unwrap_err();
        assert!(matches!(err, SessionError::UnknownPath(p) if p == vec![1]));
        assert_eq!(state.snapshot().revision, 0);
    }

    #[test]
    fn test_edits_resolve_after_copy_on_write() {
        let mut state = state("1. e4 e5 (1... c5) *");
        let held = state.snapshot();

        let snap = state.apply_promote_variation(&[0, 1]).unwrap();
        let tree = snap.game.tree();
        let head = tree.find_by_index_path(&[0, 0]).unwrap();
        assert_eq!(tree.san_path(head).unwrap(), vec!["e4", "c5"]);

        let held_again = state.snapshot();
        assert_eq!(state.apply_delete_from(&[0, 1]).unwrap(), 1);
        let held_third = state.snapshot();
        state
            .apply_set_annotation(&[0, 0], AnnotationKey::CommentAfter, "sharp")
            .unwrap();
        assert!(state.apply_mark_saved(&[0, 0], &AnnotationKey::CommentAfter).unwrap());

        assert_eq!(held.game.tree().len(), 3);
        assert_eq!(held_again.game.tree().len(), 3);
        assert_eq!(held_third.dirty_count, 0);
        assert_eq!(held_third.game.tree().len(), 2);
        assert_eq!(state.snapshot().revision, 4);
    }

    #[test]
    fn test_suggest_line_tags_only_new_moves() {
        let mut state = state("1. e4 e5 *");
        let (p, snap) = state
            .apply_suggest_line(&[], &sans(&["e4", "c5", "Nf3"]), "amy,Amy,c1")
            .unwrap();
        assert_eq!(p, vec![0, 1, 0]);
        assert_eq!(snap.dirty_count, 2);

        let tree = snap.game.tree();
        let e4 = tree.find_by_san_path(&["e4"]).unwrap();
        let c5 = tree.find_by_san_path(&["e4", "c5"]).unwrap();
        assert_eq!(tree.annotation(e4, &AnnotationKey::TrainingComment).unwrap(), None);
        assert_eq!(
            tree.annotation(c5, &AnnotationKey::TrainingComment)
                .unwrap()
                .as_deref(),
            Some("amy,Amy,c1,unsaved")
        );
    }

    #[test]
    fn test_suggest_line_is_all_or_nothing() {
        let mut state = state("1. e4 *");
        let before = state.snapshot();
        let err = state
            .apply_suggest_line(&[0], &sans(&["c5", "Ke3"]), "amy,Amy,c1")
            .unwrap_err();
        assert!(matches!(err, SessionError::Tree(_)));
        let after = state.snapshot();
        assert_eq!(after.revision, before.revision);
        assert_eq!(after.game, before.game);
    }

    #[test]
    fn test_accept_suggestion_sweeps_subtree() {
        let mut state = state("1. e4 *");
        state
            .apply_suggest_line(&[0], &sans(&["c5", "Nf3", "d6"]), "amy,Amy,c1")
            .unwrap();
        state
            .apply_suggest_line(&[0, 0], &sans(&["Nc3"]), "bob,Bob,c2")
            .unwrap();
        assert_eq!(state.snapshot().dirty_count, 4);

        let visited = state.apply_accept_suggestion(&[0, 0]).unwrap();
        assert_eq!(visited, 4);
        assert_eq!(state.snapshot().dirty_count, 0);
    }

    #[test]
    fn test_snapshots_are_not_affected_by_later_edits() {
        let mut state = state("1. e4 *");
        let old = state.snapshot();
        state
            .apply_set_annotation(&[0], AnnotationKey::CommentAfter, "best")
            .unwrap();
        let e4 = old.game.tree().find_by_san_path(&["e4"]).unwrap();
        assert_eq!(old.game.tree().annotation(e4, &AnnotationKey::CommentAfter).unwrap(), None);

        let new = state.snapshot();
        let tree = new.game.tree();
        assert!(!tree.contains(e4));
        let e4 = tree.find_by_san_path(&["e4"]).unwrap();
        assert_eq!(
            tree.annotation(e4, &AnnotationKey::CommentAfter)
                .unwrap()
                .as_deref(),
            Some("best,unsaved")
        );
    }

    #[test]
    fn test_replace_move_uses_parent_position() {
        let mut state = state("1. e4 e5 2. Nf3 *");
        let held = state.snapshot();
        let snap = state.apply_replace_move(&[0, 0], "e6").unwrap();
        assert_eq!(
            snap.game.tree().mainline().filter_map(|(_, n)| n.san()).collect::<Vec<_>>(),
            vec!["e4", "e6", "Nf3"]
        );
        assert_eq!(
            held.game.tree().mainline().filter_map(|(_, n)| n.san()).collect::<Vec<_>>(),
            vec!["e4", "e5", "Nf3"]
        );
        assert!(matches!(
            state.apply_replace_move(&[], "e4"),
            Err(SessionError::Tree(TreeError::RootMutation))
        ));
    }

    #[test]
    fn test_synced_skips_entries_edited_since() {
        let mut state = state("1. e4 e5 *");
        state
            .apply_set_annotation(&[0], AnnotationKey::CommentAfter, "one")
            .unwrap();
        state
            .apply_set_annotation(&[0, 0], AnnotationKey::CommentAfter, "two")
            .unwrap();
        let deltas = vec![
            AnnotationDelta {
                path: vec![0],
                key: AnnotationKey::CommentAfter,
                value: "one,unsaved".to_string(),
            },
            AnnotationDelta {
                path: vec![0, 0],
                key: AnnotationKey::CommentAfter,
                value: "stale,unsaved".to_string(),
            },
        ];
        assert_eq!(state.apply_synced(&deltas), 1);
        assert_eq!(state.snapshot().dirty_count, 1);
        assert_eq!(state.apply_synced(&deltas), 0);
    }

    #[test]
    fn test_synced_reaches_duplicate_branches() {
        let mut state = state("1. e4 (1. e4 c5 {sharp,unsaved}) 1... e5 *");
        assert_eq!(state.snapshot().dirty_count, 1);
        let deltas = vec![AnnotationDelta {
            path: vec![1, 0],
            key: AnnotationKey::CommentAfter,
            value: "sharp,unsaved".to_string(),
        }];
        let held = state.snapshot();
        assert_eq!(state.apply_synced(&deltas), 1);
        assert_eq!(state.snapshot().dirty_count, 0);
        assert_eq!(held.dirty_count, 1);
    }
}
