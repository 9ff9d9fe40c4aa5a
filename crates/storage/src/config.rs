//! Declarative manager configuration.
//!
//! A [`ManagerConfig`] describes the registry of a [`Manager`]: which
//! identifiers exist, which backend each one uses and whether it sits behind
//! a cache. Configurations are usually read from JSON:
//!
//! ```json
//! {
//!   "preferences_file": "/var/lib/app/preferences.json",
//!   "storages": {
//!     "users":    { "backend": { "kind": "file", "directory": "/var/lib/app", "relative_path": "users" }, "cached": true },
//!     "settings": { "backend": { "kind": "preferences", "key": "settings" } },
//!     "scratch":  { "backend": { "kind": "memory" } }
//!   }
//! }
//! ```
//!
//! All preference storages of one configuration share a single
//! [`PreferenceStore`], persisted at `preferences_file` when one is given and
//! kept in memory otherwise.
//!
//! ```
//! use local_storage::ManagerConfig;
//!
//! let config = ManagerConfig::from_json_str(r#"{ "storages": { "users": { "backend": { "kind": "memory" }, "cached": true } } }"#).unwrap();
//! let manager = config.open().unwrap();
//! assert_eq!(manager.identifiers(), vec!["users".to_owned()]);
//! ```

use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    backend_enum::AnyStorage,
    error::ConfigError,
    manager::Manager,
    preferences::PreferenceStore,
};

/// Which backend a configured storage uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BackendConfig {
    /// In-memory records.
    Memory,
    /// Records in `<directory>/<relative_path>/storage_file`.
    File {
        /// Base directory.
        directory: PathBuf,
        /// Path of the storage directory below `directory`.
        relative_path: PathBuf,
    },
    /// Records under `key` in the shared preference store.
    Preferences {
        /// Key inside the preference store.
        key: String,
    },
}

/// One configured storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend of the storage.
    pub backend: BackendConfig,
    /// Whether the storage is wrapped in a decoded-snapshot cache.
    #[serde(default)]
    #[builder(default)]
    pub cached: bool,
}

/// Registry description for a [`Manager`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// File backing the shared preference store; in-memory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_file: Option<PathBuf>,
    /// Storages keyed by identifier.
    #[serde(default)]
    pub storages: BTreeMap<String, StorageConfig>,
}

impl ManagerConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise see
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&json)
    }

    /// Adds or replaces the storage named `identifier`.
    #[must_use]
    pub fn with_storage(mut self, identifier: impl Into<String>, storage: StorageConfig) -> Self {
        self.storages.insert(identifier.into(), storage);
        self
    }

    /// Checks that every identifier, key and path is usable.
    ///
    /// Two storages may not share a preference key or a file location, since
    /// each would overwrite the other's records and neither cache would notice.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preferences_file.as_ref().is_some_and(|file| file.as_os_str().is_empty()) {
            return Err(ConfigError::invalid("preferences_file", "must not be empty"));
        }

        let mut keys: BTreeMap<&str, &str> = BTreeMap::new();
        let mut locations: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for (identifier, storage) in &self.storages {
            if identifier.trim().is_empty() {
                return Err(ConfigError::invalid("storages", "identifier must not be blank"));
            }
            match &storage.backend {
                BackendConfig::Memory => {},
                BackendConfig::File { directory, relative_path } => {
                    if directory.as_os_str().is_empty() {
                        return Err(ConfigError::invalid(format!("storages.{identifier}.directory"), "must not be empty"));
                    }
                    if relative_path.as_os_str().is_empty() {
                        return Err(ConfigError::invalid(
                            format!("storages.{identifier}.relative_path"),
                            "must not be empty",
                        ));
                    }
                    if let Some(owner) = locations.insert(directory.join(relative_path), identifier) {
                        return Err(ConfigError::invalid(
                            format!("storages.{identifier}.relative_path"),
                            format!("location already used by storages.{owner}"),
                        ));
                    }
                },
                BackendConfig::Preferences { key } => {
                    if key.trim().is_empty() {
                        return Err(ConfigError::invalid(format!("storages.{identifier}.key"), "must not be blank"));
                    }
                    if let Some(owner) = keys.insert(key, identifier) {
                        return Err(ConfigError::invalid(
                            format!("storages.{identifier}.key"),
                            format!("key already used by storages.{owner}"),
                        ));
                    }
                },
            }
        }
        Ok(())
    }

    /// Validates the configuration and opens every storage it names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if validation fails and
    /// [`ConfigError::Storage`] if a backend cannot be opened.
    #[tracing::instrument(skip_all, fields(storages = self.storages.len()))]
    pub fn open(&self) -> Result<Manager, ConfigError> {
        self.validate()?;

        let preferences = match &self.preferences_file {
            Some(file) => PreferenceStore::open(file)
                .map_err(|source| ConfigError::Storage { identifier: "preferences_file".into(), source })?,
            None => PreferenceStore::in_memory(),
        };

        let mut storages = Vec::with_capacity(self.storages.len());
        for (identifier, config) in &self.storages {
            let storage = match &config.backend {
                BackendConfig::Memory => AnyStorage::memory(),
                BackendConfig::File { directory, relative_path } => AnyStorage::file(directory, relative_path)
                    .map_err(|source| ConfigError::Storage { identifier: identifier.clone(), source })?,
                BackendConfig::Preferences { key } => AnyStorage::preferences(preferences.clone(), key.clone()),
            };
            let storage = if config.cached { storage.cached() } else { storage };
            debug!(storage = %identifier, kind = storage.kind(), "configured storage");
            storages.push((identifier.clone(), storage));
        }

        Ok(Manager::new(storages))
    }
}
