//! Loading balance configuration from disk.

use std::path::Path;

use sahara_core::config::{ConfigError, GameConfig};
use thiserror::Error;

/// Error type for config file operations.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Load and validate a RON config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GameConfig, ConfigFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigFileError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(GameConfig::from_ron_str(&contents)?)
}

/// Load `path` if given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<GameConfig, ConfigFileError> {
    path.map_or_else(|| Ok(GameConfig::default()), load_config)
}
