//! Persisted user settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::FormatOptions;

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Stored settings were not valid JSON for this shape.
    #[error("Settings decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// Settings could not be serialized.
    #[error("Settings encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// The backing store failed.
    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host persistence for the serialized settings document.
pub trait SettingsStore {
    /// Returns the stored document, or `None` when nothing was saved yet.
    fn load_data(&self) -> Result<Option<String>, SettingsError>;
    /// Replaces the stored document.
    fn save_data(&self, data: &str) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_data(&self) -> Result<Option<String>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_data(&self, data: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// User-facing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AsideSettings {
    /// Vault-relative path of the template used by the insert command.
    pub template_path: String,
    /// Optional formatting rules.
    pub format: FormatOptions,
}

impl AsideSettings {
    /// Decodes stored settings, filling missing fields with defaults.
    pub fn from_json(data: &str) -> Result<Self, SettingsError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(data).map_err(SettingsError::Decode)
    }

    /// Encodes settings for storage.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(SettingsError::Encode)
    }

    /// Loads settings at startup.
    ///
    /// A missing, unreadable or malformed document yields defaults.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let data = match store.load_data() {
            Ok(Some(data)) => data,
            Ok(None) => return Self::default(),
            Err(err) => {
                log::warn!("using default settings: {}", err);
                return Self::default();
            }
        };
        Self::from_json(&data).unwrap_or_else(|err| {
            log::warn!("using default settings: {}", err);
            Self::default()
        })
    }

    /// Persists the settings.
    pub fn save(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        store.save_data(&self.to_json()?)
    }

    /// Updates the template path, saving only when it changed.
    pub fn set_template_path(
        &mut self,
        path: impl Into<String>,
        store: &dyn SettingsStore,
    ) -> Result<(), SettingsError> {
        let path = path.into();
        if self.template_path == path {
            return Ok(());
        }
        self.template_path = path;
        self.save(store)
    }
}
