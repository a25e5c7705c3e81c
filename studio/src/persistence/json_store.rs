use super::PersistenceError;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::PathBuf;

/// Trait for types that can be persisted in a JsonStore.
pub trait Storable: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

/// Generic JSON-file-per-record persistence store.
pub struct JsonStore<T> {
    dir: PathBuf,
    _phantom: PhantomData<T>,
}

/// Ids become file names, so only a conservative character set is allowed.
pub(crate) fn validate_id(id: &str) -> Result<(), PersistenceError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidId(id.to_string()))
    }
}

impl<T: Storable> JsonStore<T> {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            _phantom: PhantomData,
        }
    }

    pub fn ensure_dir(&self) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save a record. Returns the id.
    ///
    /// The record is written to a temporary file first and renamed over the
    /// old one, so readers never observe a half-written record.
    pub fn save(&self, data: &T) -> Result<String, PersistenceError> {
        validate_id(data.id())?;
        self.ensure_dir()?;
        let path = self.file_path(data.id());
        let tmp = self.dir.join(format!(".{}.json.tmp", data.id()));
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(data.id().to_string())
    }

    /// Load a record by id. Returns None if not found.
    pub fn load(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        validate_id(id)?;
        let path = self.file_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let data = serde_json::from_str(&contents)?;
        Ok(Some(data))
    }

    /// Load all records from the store directory, skipping files that fail to parse.
    pub fn load_all(&self) -> Result<Vec<T>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut items = Vec::new();
        let entries = std::fs::read_dir(&self.dir)?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match serde_json::from_str::<T>(&contents) {
                        Ok(data) => items.push(data),
                        Err(e) => tracing::warn!("Skipping unreadable record {:?}: {}", path, e),
                    },
                    Err(e) => {
                        tracing::warn!("Failed to read file {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(items)
    }

    /// Delete a record by id. Returns whether a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        validate_id(id)?;
        let path = self.file_path(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
            return Ok(true);
        }
        Ok(false)
    }
}
