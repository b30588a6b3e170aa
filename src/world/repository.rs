use std::path::{Path, PathBuf};

use crate::core::serialization::{load_state_from_path, save_state_to_path, SaveError, SaveState};
use crate::world::sqlite::SaveDb;

/// Somewhere a session can be saved to and loaded from.
pub trait SaveRepository {
    fn load(&mut self) -> Result<Option<SaveState>, SaveError>;
    fn save(&mut self, state: &SaveState) -> Result<(), SaveError>;
}

/// Pretty JSON save file.
#[derive(Debug, Clone)]
pub struct JsonSaveFile {
    path: PathBuf,
}

impl JsonSaveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveRepository for JsonSaveFile {
    fn load(&mut self) -> Result<Option<SaveState>, SaveError> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_state_from_path(&self.path).map(Some)
    }

    fn save(&mut self, state: &SaveState) -> Result<(), SaveError> {
        save_state_to_path(state, &self.path)
    }
}

/// Pick a store by extension: `.db`, `.sqlite` and `.sqlite3` use SQLite,
/// anything else is a JSON file.
pub fn open_repository(path: impl AsRef<Path>) -> Result<Box<dyn SaveRepository>, SaveError> {
    let path = path.as_ref();
    let sqlite = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| matches!(ext, "db" | "sqlite" | "sqlite3"));
    if sqlite {
        Ok(Box::new(SaveDb::open(path)?))
    } else {
        Ok(Box::new(JsonSaveFile::new(path)))
    }
}
