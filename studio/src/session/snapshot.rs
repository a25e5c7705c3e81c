use std::sync::Arc;

use movetree::Game;

use super::commands::MovePath;

/// Immutable view of the session's game at one revision.
///
/// The game is shared with the actor and only copied when the actor writes
/// while a snapshot is still alive.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub game_id: String,
    /// Incremented by every successful mutation.
    pub revision: u64,
    pub game: Arc<Game>,
    pub dirty_count: usize,
}

impl SessionSnapshot {
    /// Path of the first move reached by following `sans` from the start.
    pub fn locate<S: AsRef<str>>(&self, sans: &[S]) -> Option<MovePath> {
        let tree = self.game.tree();
        let id = tree.find_by_san_path(sans)?;
        tree.index_path(id).ok()
    }
}
