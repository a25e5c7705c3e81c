//! Async repository trait for the persistence collaborator.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` and can be driven from `tokio::spawn`.

use super::{GameRecord, PersistenceError};
use std::future::Future;

/// Repository for game records keyed by an opaque game id.
pub trait GameRepository: Send + Sync {
    fn save_game(
        &self,
        record: &GameRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    /// All records, most recently updated first.
    fn list_games(
        &self,
    ) -> impl Future<Output = Result<Vec<GameRecord>, PersistenceError>> + Send;
    fn load_game(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<GameRecord>, PersistenceError>> + Send;
    /// Returns whether a record was removed.
    fn delete_game(&self, id: &str)
        -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}
