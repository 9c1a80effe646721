//! Saved glow presets.
//!
//! The library is a JSON array of `{ id, name, settings }` objects, newest
//! first. Ids are the creation time in unix milliseconds, bumped when two
//! presets are saved within the same millisecond.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use glowshader::{ParamError, ParameterSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const LIBRARY_FILE: &str = "library.json";

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("failed to access preset library at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preset library at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preset library: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no preset matches '{0}'")]
    NotFound(String),
    #[error("preset settings are invalid: {0}")]
    Invalid(#[from] ParamError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: i64,
    pub name: String,
    pub settings: ParameterSet,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_or_default(path: &Path) -> Result<Self, LibraryError> {
        if !path.exists() {
            debug!(path = %path.display(), "no preset library yet");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let presets: Vec<Preset> =
            serde_json::from_str(&contents).map_err(|source| LibraryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), count = presets.len(), "loaded preset library");
        Ok(Self { presets })
    }

    pub fn persist(&self, path: &Path) -> Result<(), LibraryError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| LibraryError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(&self.presets).map_err(LibraryError::Serialize)?;
        fs::write(path, serialized).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), count = self.presets.len(), "persisted preset library");
        Ok(())
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.id == id)
    }

    /// Looks a preset up by id, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Result<&Preset, LibraryError> {
        let key = key.trim();
        let by_id = key.parse::<i64>().ok().and_then(|id| self.get(id));
        by_id
            .or_else(|| {
                self.presets
                    .iter()
                    .find(|preset| preset.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| LibraryError::NotFound(key.to_string()))
    }

    /// Saves `settings` as the newest preset. Without a name the preset is
    /// called `Glow N`, N being the new library size.
    pub fn add(
        &mut self,
        name: Option<&str>,
        settings: ParameterSet,
    ) -> Result<&Preset, LibraryError> {
        self.add_at(name, settings, Utc::now().timestamp_millis())
    }

    pub fn add_at(
        &mut self,
        name: Option<&str>,
        settings: ParameterSet,
        created_ms: i64,
    ) -> Result<&Preset, LibraryError> {
        settings.validate()?;

        let newest = self.presets.iter().map(|preset| preset.id).max();
        let id = match newest {
            Some(newest) if newest >= created_ms => newest + 1,
            _ => created_ms,
        };
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Glow {}", self.presets.len() + 1));

        info!(id, name = %name, shape = %settings.shape_mode, "saved preset");
        self.presets.insert(0, Preset { id, name, settings });
        Ok(&self.presets[0])
    }

    pub fn remove(&mut self, id: i64) -> Result<Preset, LibraryError> {
        let index = self
            .presets
            .iter()
            .position(|preset| preset.id == id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        let removed = self.presets.remove(index);
        info!(id, name = %removed.name, "removed preset");
        Ok(removed)
    }
}
