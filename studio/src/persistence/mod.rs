mod game_store;
mod json_store;
mod traits;

pub use game_store::{GameRecord, JsonGameStore};
pub use traits::GameRepository;

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),
}

/// Generate a unique game id.
pub fn generate_game_id() -> String {
    format!("game_{}", uuid::Uuid::new_v4().simple())
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
