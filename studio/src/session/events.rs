use super::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Full snapshot after any mutation of the game.
    StateChanged(SessionSnapshot),
    /// Dirty entries were cleared after their values reached the store.
    Synced { revision: u64, cleared: usize },
}
