use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::serialization::{load_state_from_path, save_state_to_path, SaveFileError, SaveState};

/// A single save slot.
pub trait SaveRepository {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<SaveState>, Box<dyn std::error::Error>>;
    fn save(&mut self, state: &SaveState) -> Result<(), Box<dyn std::error::Error>>;
    /// Forget the saved game. Clearing an empty slot is not an error.
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

/// Save slot backed by a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonSaveFile {
    path: PathBuf,
}

impl JsonSaveFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveRepository for JsonSaveFile {
    fn load(&mut self) -> Result<Option<SaveState>, Box<dyn std::error::Error>> {
        match load_state_from_path(&self.path) {
            Ok(state) => Ok(Some(state)),
            Err(SaveFileError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Box::new(err)),
        }
    }

    fn save(&mut self, state: &SaveState) -> Result<(), Box<dyn std::error::Error>> {
        save_state_to_path(state, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Box::new(err)),
        }
    }
}
