//! Single-writer editing sessions.
//!
//! Each open game is owned by one actor task. Views hold a
//! [`SessionHandle`], send their edits through it and re-read the game from
//! the snapshots broadcast after every change.

mod actor;
mod commands;
mod events;
mod handle;
mod snapshot;
mod state;

use std::collections::HashMap;

use movetree::Game;
use tokio::sync::{broadcast, mpsc, RwLock};

use actor::run_session_actor;
pub use commands::{MovePath, SessionError};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::SessionSnapshot;
use state::SessionState;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 100;

/// Start an actor owning `game` and return the handle to it.
pub fn spawn_session(game_id: &str, game: Game) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let state = SessionState::new(game_id.to_string(), game);
    tokio::spawn(async move {
        run_session_actor(state, cmd_rx, event_tx).await;
    });

    SessionHandle::new(game_id.to_string(), cmd_tx)
}

/// Manages all open sessions, at most one per game id.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `game_id`. An already open session wins over
    /// `game`, so there is never more than one writer per game.
    pub async fn open(&self, game_id: &str, game: Game) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(game_id) {
            return handle.clone();
        }
        let handle = spawn_session(game_id, game);
        sessions.insert(game_id.to_string(), handle.clone());
        tracing::info!(game_id, "Session opened");
        handle
    }

    pub async fn get_handle(&self, game_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(game_id).cloned()
    }

    /// Stop the actor of `game_id`. Returns false if no session was open.
    pub async fn close(&self, game_id: &str) -> bool {
        let handle = self.sessions.write().await.remove(game_id);
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                tracing::info!(game_id, "Session closed");
                true
            }
            None => false,
        }
    }

    pub async fn open_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movetree::{AnnotationKey, SuggestedVariation};

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let handle = spawn_session("g1", Game::parse("1. e4 *").unwrap());
        let (initial, mut events) = handle.subscribe().await.unwrap();
        assert_eq!(initial.revision, 0);

        handle.insert_san(vec![0], "e5").await.unwrap();
        handle
            .set_annotation(vec![0, 0], AnnotationKey::CommentAfter, "solid")
            .await
            .unwrap();

        let SessionEvent::StateChanged(first) = events.recv().await.unwrap() else {
            panic!("expected a state change");
        };
        let SessionEvent::StateChanged(second) = events.recv().await.unwrap() else {
            panic!("expected a state change");
        };
        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
        assert_eq!(second.dirty_count, 1);
        assert_eq!(first.game.tree().len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_edit_sends_no_event() {
        let handle = spawn_session("g2", Game::new());
        let (_, mut events) = handle.subscribe().await.unwrap();

        let err = handle.insert_san(vec![], "e5").await.unwrap_err();
        assert!(matches!(err, SessionError::Tree(_)));
        handle.insert_san(vec![], "e4").await.unwrap();

        let SessionEvent::StateChanged(snap) = events.recv().await.unwrap() else {
            panic!("expected a state change");
        };
        assert_eq!(snap.revision, 1);
    }

    #[tokio::test]
    async fn test_suggest_then_accept() {
        let handle = spawn_session("g3", Game::parse("1. e4 e5 *").unwrap());
        let (head, snap) = handle
            .suggest_line(vec![0], sans(&["c5", "Nf3"]), "amy,Amy,c1")
            .await
            .unwrap();
        assert_eq!(head, vec![0, 1, 0]);
        assert_eq!(snap.locate(&["e4", "c5", "Nf3"]), Some(head));
        assert_eq!(snap.dirty_count, 2);

        let visited = handle.accept_suggestion(vec![0, 1]).await.unwrap();
        assert_eq!(visited, 2);
        assert_eq!(handle.get_snapshot().await.unwrap().dirty_count, 0);
    }

    #[tokio::test]
    async fn test_merge_suggestions_through_session() {
        let handle = spawn_session("g4", Game::parse("1. d4 d5 2. c4 *").unwrap());
        let line = Game::parse("1. e4 *").unwrap().tree().clone();
        let created = handle
            .merge_suggestions(vec![SuggestedVariation {
                line,
                training_comment: "bob,Bob,c9,unsaved".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(created, 1);
        let snap = handle.get_snapshot().await.unwrap();
        assert!(snap.game.tree().find_by_san_path(&["e4"]).is_some());
        assert_eq!(snap.dirty_count, 1);
    }

    #[tokio::test]
    async fn test_manager_keeps_one_session_per_game() {
        let manager = SessionManager::new();
        let first = manager.open("g5", Game::parse("1. e4 *").unwrap()).await;
        let second = manager.open("g5", Game::new()).await;
        assert_eq!(first.id(), second.id());
        assert_eq!(second.get_snapshot().await.unwrap().game.tree().len(), 1);
        assert_eq!(manager.open_ids().await, vec!["g5".to_string()]);

        assert!(manager.close("g5").await);
        assert!(!manager.close("g5").await);
        assert!(manager.get_handle("g5").await.is_none());
        assert!(first.get_snapshot().await.is_err());
    }
}
