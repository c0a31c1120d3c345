//! File-backed save store.
//!
//! Loading never fails: a missing, unreadable or corrupt save falls back to a
//! fresh world. Wall-clock time elapsed since the save is applied on load as
//! one lump tick.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sahara_core::config::GameConfig;
use sahara_core::save::{SaveData, SaveError};
use sahara_core::sync::SyncSink;
use sahara_core::world::GameData;
use thiserror::Error;
use tracing::{info, warn};

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read or write the save file.
    #[error("Save file IO failed: {0}")]
    Io(#[from] io::Error),
    /// The file exists but is not a readable save.
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Wall-clock unix seconds, zero if the system clock is before 1970.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// A save file at a fixed path.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    /// Store backed by `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the save file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a save file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and parse the save file.
    pub fn read(&self) -> Result<SaveData, StorageError> {
        let json = fs::read_to_string(&self.path)?;
        Ok(SaveData::from_json(&json)?)
    }

    /// Restore the saved world, or start a fresh one if there is nothing
    /// usable on disk.
    ///
    /// Time elapsed between the save and `now` is applied as a single tick.
    pub fn load_or_default(&self, config: GameConfig, now: u64, sink: Box<dyn SyncSink>) -> GameData {
        if !self.exists() {
            info!(path = %self.path.display(), "No save found, starting a new world");
            return GameData::with_sink(config, sink);
        }
        match self.read() {
            Ok(save) => {
                let elapsed = save.elapsed_since(now);
                let mut game = save.restore(config, sink);
                let events = game.tick(elapsed);
                info!(
                    path = %self.path.display(),
                    elapsed,
                    events = events.len(),
                    "Save restored"
                );
                game
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Save unusable, starting a new world"
                );
                GameData::with_sink(config, sink)
            }
        }
    }

    /// Write the world, then push a sync snapshot.
    ///
    /// The file is written to a sibling temp file first and renamed into
    /// place, so a crash mid-write leaves the previous save intact.
    pub fn save(&self, game: &GameData, now: u64) -> Result<(), StorageError> {
        let json = SaveData::capture(game, now).to_json()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), clock = game.clock(), "World saved");
        game.push_snapshot();
        Ok(())
    }

    /// Remove the save file. A file that is already gone is not an error.
    pub fn delete(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Save deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
