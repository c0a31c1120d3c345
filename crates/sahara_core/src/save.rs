//! Persisted save layout.
//!
//! A save is plain JSON. Every field has a default, so older saves missing
//! newer fields still load. Derived state is never trusted: it is rebuilt by
//! [`GameData::from_state`] on restore.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfig;
use crate::sync::SyncSink;
use crate::world::{GameData, WorldState};

/// Version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Errors reading or writing a save.
#[derive(Error, Debug)]
pub enum SaveError {
    /// Malformed JSON or mismatched shape.
    #[error("Failed to parse save: {0}")]
    Json(#[from] serde_json::Error),
    /// Written by a newer build.
    #[error("Unsupported save version {found} (this build reads up to {SAVE_VERSION})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
    },
}

fn default_version() -> u32 {
    SAVE_VERSION
}

/// On-disk record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Layout version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Wall-clock unix seconds at save time.
    #[serde(default)]
    pub saved_at: u64,
    /// The world.
    #[serde(default)]
    pub world: WorldState,
}

impl SaveData {
    /// Capture a world at wall-clock time `saved_at`.
    #[must_use]
    pub fn capture(game: &GameData, saved_at: u64) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            world: game.state().clone(),
        }
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and version-check a save.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let save: Self = serde_json::from_str(json)?;
        if save.version > SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: save.version,
            });
        }
        Ok(save)
    }

    /// Wall-clock seconds between the save and `now` (zero if the clock went back).
    #[must_use]
    pub fn elapsed_since(&self, now: u64) -> f64 {
        now.saturating_sub(self.saved_at) as f64
    }

    /// Rebuild the world, recomputing derived state.
    #[must_use]
    pub fn restore(self, config: GameConfig, sink: Box<dyn SyncSink>) -> GameData {
        GameData::from_state(self.world, config, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{BuildingKind, CellPos};
    use crate::resources::ResourceKind;
    use crate::sync::OfflineSink;

    #[test]
    fn test_round_trip_preserves_hash() {
        let mut game = GameData::new(GameConfig::default());
        game.place_building(CellPos::new(3, 4), BuildingKind::Watchtower).unwrap();
        game.tick(1234.5);
        let json = SaveData::capture(&game, 1_700_000_000).to_json().unwrap();

        let save = SaveData::from_json(&json).unwrap();
        assert_eq!(save.saved_at, 1_700_000_000);
        let restored = save.restore(GameConfig::default(), Box::new(OfflineSink));
        assert_eq!(restored.state_hash(), game.state_hash());
        assert_eq!(restored.camp().get(CellPos::new(3, 4)).unwrap().level, 1);
    }

    #[test]
    fn test_string_keys_in_layout() {
        let mut game = GameData::new(GameConfig::default());
        game.place_building(CellPos::new(2, 5), BuildingKind::Tent).unwrap();
        let json = SaveData::capture(&game, 0).to_json().unwrap();
        assert!(json.contains("\"2,5\""));
    }

    #[test]
    fn test_missing_fields_default() {
        let save = SaveData::from_json(r#"{"world": {"raiders": 7}}"#).unwrap();
        assert_eq!(save.version, SAVE_VERSION);
        let game = save.restore(GameConfig::default(), Box::new(OfflineSink));
        assert_eq!(game.raiders(), 7);
        assert_eq!(game.resources().whole(ResourceKind::Water), 0);
        assert_eq!(game.heroes().heroes().len(), 3);
        assert!(game.invariant_violations().is_empty());
    }

    #[test]
    fn test_rejects_newer_version() {
        assert!(matches!(
            SaveData::from_json(r#"{"version": 99}"#),
            Err(SaveError::UnsupportedVersion { found: 99 })
        ));
        assert!(matches!(SaveData::from_json("not json"), Err(SaveError::Json(_))));
    }

    #[test]
    fn test_elapsed_since() {
        let save = SaveData {
            version: SAVE_VERSION,
            saved_at: 100,
            world: WorldState::default(),
        };
        assert!((save.elapsed_since(160) - 60.0).abs() < f64::EPSILON);
        assert!(save.elapsed_since(50).abs() < f64::EPSILON);
    }
}
