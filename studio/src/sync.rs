//! Reconciles a session's local edits with the stored game record.
//!
//! Dirty annotations are what the store has not seen yet. A sync writes the
//! game with every marker cleared, then tells the session which entries
//! reached the store so it can clear them too.

use movetree::{collect_dirty, mark_all_saved, AnnotationKey, Game, ParseLimits, PgnError};
use serde::{Deserialize, Serialize};

use crate::persistence::{now_timestamp, GameRecord, GameRepository, PersistenceError};
use crate::session::{MovePath, SessionError, SessionHandle, SessionManager};

/// One dirty annotation, addressed by the child-index path of its move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDelta {
    pub path: MovePath,
    pub key: AnnotationKey,
    /// Rendered value, dirty marker included.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub game_id: String,
    pub revision: u64,
    pub deltas: Vec<AnnotationDelta>,
    /// Entries cleared in the session. Lower than `deltas.len()` when some
    /// were edited again while the record was being written.
    pub cleared: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Game not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Stored game is unreadable: {0}")]
    Pgn(#[from] PgnError),
}

/// Every dirty entry of `game`, root first, then in pre-order.
pub fn pending_deltas(game: &Game) -> Vec<AnnotationDelta> {
    let tree = game.tree();
    collect_dirty(tree)
        .into_iter()
        .filter_map(|entry| {
            let path = tree.index_path(entry.node).ok()?;
            Some(AnnotationDelta {
                path,
                key: entry.key,
                value: entry.value,
            })
        })
        .collect()
}

pub struct Synchronizer<R> {
    repo: R,
    limits: ParseLimits,
}

impl<R: GameRepository> Synchronizer<R> {
    pub fn new(repo: R, limits: ParseLimits) -> Self {
        Self { repo, limits }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Store `game` as it is, dirty markers included.
    pub async fn save(&self, game_id: &str, game: &Game) -> Result<GameRecord, SyncError> {
        let record = self.record_for(game_id, game).await?;
        self.repo.save_game(&record).await?;
        tracing::info!(game_id, "Game saved");
        Ok(record)
    }

    pub async fn load(&self, game_id: &str) -> Result<Game, SyncError> {
        let record = self
            .repo
            .load_game(game_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(game_id.to_string()))?;
        Ok(record.game(self.limits)?)
    }

    /// Load `game_id` into a session, or return the session already editing it.
    pub async fn open(
        &self,
        manager: &SessionManager,
        game_id: &str,
    ) -> Result<SessionHandle, SyncError> {
        if let Some(handle) = manager.get_handle(game_id).await {
            return Ok(handle);
        }
        let game = self.load(game_id).await?;
        Ok(manager.open(game_id, game).await)
    }

    /// Write the session's current game to the repository and clear the
    /// dirty state of everything that was written.
    pub async fn sync(&self, handle: &SessionHandle) -> Result<SyncReport, SyncError> {
        let snapshot = handle.get_snapshot().await?;
        let deltas = pending_deltas(&snapshot.game);

        let mut clean = Game::clone(&snapshot.game);
        mark_all_saved(clean.tree_mut());
        let record = self.record_for(handle.id(), &clean).await?;
        self.repo.save_game(&record).await?;

        let cleared = if deltas.is_empty() {
            0
        } else {
            handle.mark_synced(deltas.clone()).await?
        };
        tracing::info!(
            game_id = handle.id(),
            revision = snapshot.revision,
            deltas = deltas.len(),
            cleared,
            "Game synced"
        );
        Ok(SyncReport {
            game_id: handle.id().to_string(),
            revision: snapshot.revision,
            deltas,
            cleared,
        })
    }

    /// Keeps the creation time of an existing record.
    async fn record_for(&self, game_id: &str, game: &Game) -> Result<GameRecord, SyncError> {
        let now = now_timestamp();
        let mut record = GameRecord::from_game(game_id, game, now);
        if let Some(existing) = self.repo.load_game(game_id).await? {
            record.created_at = existing.created_at;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::JsonGameStore;

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|s| s.to_string()).collect()
    }

    fn synchronizer(dir: &std::path::Path) -> Synchronizer<JsonGameStore> {
        Synchronizer::new(JsonGameStore::new(dir.to_path_buf()), ParseLimits::default())
    }

    #[test]
    fn test_pending_deltas_address_moves_by_path() {
        let game = Game::parse(
            "{intro,unsaved} 1. e4 {[%dojoComment amy,Amy,c1,unsaved] fine} e5 (1... c5 {sharp,unsaved}) *",
        )
        .unwrap();
        let deltas = pending_deltas(&game);
        assert_eq!(
            deltas,
            vec![
                AnnotationDelta {
                    path: vec![],
                    key: AnnotationKey::CommentAfter,
                    value: "intro,unsaved".to_string(),
                },
                AnnotationDelta {
                    path: vec![0],
                    key: AnnotationKey::TrainingComment,
                    value: "amy,Amy,c1,unsaved".to_string(),
                },
                AnnotationDelta {
                    path: vec![0, 1],
                    key: AnnotationKey::CommentAfter,
                    value: "sharp,unsaved".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_delta_json_shape() {
        let delta = AnnotationDelta {
            path: vec![0, 1],
            key: AnnotationKey::Squares,
            value: "Rd4,unsaved".to_string(),
        };
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"{"path":[0,1],"key":"csl","value":"Rd4,unsaved"}"#);
        assert_eq!(serde_json::from_str::<AnnotationDelta>(&json).unwrap(), delta);
    }

    #[tokio::test]
    async fn test_sync_writes_clean_record_and_clears_session() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = synchronizer(tmp.path());
        let manager = SessionManager::new();
        sync.save("g1", &Game::parse("1. e4 e5 *").unwrap())
            .await
            .unwrap();

        let handle = sync.open(&manager, "g1").await.unwrap();
        handle
            .set_annotation(vec![0], AnnotationKey::CommentAfter, "main line")
            .await
            .unwrap();
        handle
            .suggest_line(vec![0], sans(&["c5"]), "amy,Amy,c1")
            .await
            .unwrap();

        let report = sync.sync(&handle).await.unwrap();
        assert_eq!(report.deltas.len(), 2);
        assert_eq!(report.cleared, 2);
        assert_eq!(handle.get_snapshot().await.unwrap().dirty_count, 0);

        let record = sync.repository().load("g1").unwrap().unwrap();
        assert!(!record.pgn.contains(",unsaved"));
        assert!(record.pgn.contains("{main line}"));
        let stored = sync.load("g1").await.unwrap();
        assert_eq!(stored, *handle.get_snapshot().await.unwrap().game);

        let again = sync.sync(&handle).await.unwrap();
        assert!(again.deltas.is_empty());
        assert_eq!(again.cleared, 0);
    }

    #[tokio::test]
    async fn test_sync_clears_duplicate_branch() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = synchronizer(tmp.path());
        let manager = SessionManager::new();
        let game = Game::parse("1. e4 (1. e4 c5 {sharp,unsaved}) 1... e5 *").unwrap();
        sync.save("dup", &game).await.unwrap();

        let handle = sync.open(&manager, "dup").await.unwrap();
        let first = sync.sync(&handle).await.unwrap();
        assert_eq!(first.deltas.len(), 1);
        assert_eq!(first.deltas[0].path, vec![1, 0]);
        assert_eq!(first.cleared, 1);
        assert_eq!(handle.get_snapshot().await.unwrap().dirty_count, 0);

        let second = sync.sync(&handle).await.unwrap();
        assert!(second.deltas.is_empty());
        assert_eq!(second.cleared, 0);
        let record = sync.repository().load("dup").unwrap().unwrap();
        assert!(!record.pgn.contains(",unsaved"));
    }

    #[tokio::test]
    async fn test_sync_keeps_created_at() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = synchronizer(tmp.path());
        let record = GameRecord::from_game("g2", &Game::new(), 5);
        sync.repository().save(&record).unwrap();

        let manager = SessionManager::new();
        let handle = sync.open(&manager, "g2").await.unwrap();
        handle.insert_san(vec![], "d4").await.unwrap();
        sync.sync(&handle).await.unwrap();

        let stored = sync.repository().load("g2").unwrap().unwrap();
        assert_eq!(stored.created_at, 5);
        assert!(stored.updated_at >= 5);
        assert!(stored.pgn.contains("1. d4"));
    }

    #[tokio::test]
    async fn test_open_reuses_session_and_reports_missing_games() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = synchronizer(tmp.path());
        let manager = SessionManager::new();

        assert!(matches!(
            sync.open(&manager, "missing").await,
            Err(SyncError::NotFound(_))
        ));

        sync.save("g3", &Game::new()).await.unwrap();
        let first = sync.open(&manager, "g3").await.unwrap();
        first.insert_san(vec![], "c4").await.unwrap();
        let second = sync.open(&manager, "g3").await.unwrap();
        assert_eq!(second.get_snapshot().await.unwrap().game.tree().len(), 1);
    }
}
