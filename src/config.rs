//! Explicit application configuration.
//!
//! Components receive the values they need at construction time; nothing in
//! the crate reads an ambient preference store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    persist::{StorageError, StorageResult},
    types::SortKey,
};

/// Remote synchronization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether the user turned synchronization on.
    #[serde(default)]
    pub enabled: bool,
    /// Mounted share directory holding the remote catalog; empty disables
    /// synchronization regardless of `enabled`.
    #[serde(default)]
    pub location: String,
}

impl SyncSettings {
    /// Returns true when synchronization should actually run.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.location.is_empty()
    }
}

/// Application configuration consumed by the catalog core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sort order applied to catalog views.
    #[serde(default)]
    pub sort_method: SortKey,
    /// Remote synchronization settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Loads the configuration file, defaulting on first run.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let bytes = match fs::read(path.as_ref()) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(StorageError::Io(err)),
        };
        serde_json::from_slice(&bytes).map_err(|err| StorageError::Format(err.to_string()))
    }

    /// Writes the configuration file, replacing any previous contents.
    pub fn save(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| StorageError::Format(err.to_string()))?;
        fs::write(path.as_ref(), bytes).map_err(StorageError::Io)
    }
}
