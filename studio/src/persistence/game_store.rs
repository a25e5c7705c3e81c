use super::json_store::{JsonStore, Storable};
use super::PersistenceError;
use movetree::{Game, ParseLimits, PgnError, TagPairs, ANNOTATION_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Structured per-game record. The PGN carries the whole tree, dirty markers
/// included; the tags are duplicated for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: String,
    pub tags: TagPairs,
    pub pgn: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

fn default_schema_version() -> u32 {
    ANNOTATION_SCHEMA_VERSION
}

impl GameRecord {
    pub fn from_game(id: impl Into<String>, game: &Game, now: u64) -> Self {
        Self {
            id: id.into(),
            tags: game.tags().clone(),
            pgn: game.to_pgn(),
            schema_version: ANNOTATION_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild the game. Stored text is re-validated against `limits` like
    /// any other import.
    pub fn game(&self, limits: ParseLimits) -> Result<Game, PgnError> {
        Game::parse_with_limits(&self.pgn, limits)
    }
}

impl Storable for GameRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Persistence layer for game records. Uses JSON files in a directory.
pub struct JsonGameStore {
    inner: JsonStore<GameRecord>,
}

impl JsonGameStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            inner: JsonStore::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.inner.dir()
    }

    /// Save a record. Returns the id.
    pub fn save(&self, record: &GameRecord) -> Result<String, PersistenceError> {
        self.inner.save(record)
    }

    /// List all records, sorted by updated_at descending (most recent first).
    pub fn list(&self) -> Result<Vec<GameRecord>, PersistenceError> {
        let mut games = self.inner.load_all()?;
        games.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(games)
    }

    /// Load a specific record by ID.
    pub fn load(&self, id: &str) -> Result<Option<GameRecord>, PersistenceError> {
        self.inner.load(id)
    }

    /// Delete a record by ID.
    pub fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        self.inner.delete(id)
    }
}

impl super::traits::GameRepository for JsonGameStore {
    async fn save_game(&self, record: &GameRecord) -> Result<(), PersistenceError> {
        self.save(record)?;
        tracing::debug!(id = %record.id, "saved game record");
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameRecord>, PersistenceError> {
        self.list()
    }

    async fn load_game(&self, id: &str) -> Result<Option<GameRecord>, PersistenceError> {
        self.load(id)
    }

    async fn delete_game(&self, id: &str) -> Result<bool, PersistenceError> {
        self.delete(id)
    }
}
