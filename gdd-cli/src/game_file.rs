//! TOML file describing the game being edited.
//!
//! ```toml
//! id = "star-forge"
//! name = "Star Forge"
//! concept = "Build and fly salvaged starships."
//! platforms = ["PC", "Switch"]
//! timeline = "18 months"
//! ```

use std::path::{Path, PathBuf};

use gdd_core::GameContext;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum GameFileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid game file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Game file is missing an id")]
    MissingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameFile {
    pub id: String,
    #[serde(flatten)]
    pub context: GameContext,
}

impl GameFile {
    pub fn load(path: &Path) -> Result<Self, GameFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| GameFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, GameFileError> {
        let mut file: Self = toml::from_str(content)?;
        file.id = file.id.trim().to_string();
        if file.id.is_empty() {
            return Err(GameFileError::MissingId);
        }
        Ok(file)
    }
}
