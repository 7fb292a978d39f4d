//! Persisted user preferences.
//!
//! The last applied volume token and the apply-on-connect flags, stored
//! as a small TOML file and written through on every change.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// User preferences the daemon acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Last volume token that was successfully applied
    #[serde(default = "default_volume")]
    pub volume: String,
    /// Apply the saved volume as soon as the dongle connects
    #[serde(default)]
    pub auto_apply: bool,
    /// Exit after a successful auto-apply
    #[serde(default)]
    pub quit_after_apply: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { volume: default_volume(), auto_apply: false, quit_after_apply: false }
    }
}

fn default_volume() -> String {
    "007f".to_string()
}

/// Write-through store for [`Preferences`].
pub struct PrefsStore {
    path: PathBuf,
    prefs: Preferences,
}

impl PrefsStore {
    /// Load preferences from `path`, falling back to defaults if the file
    /// does not exist yet.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: PathBuf) -> Result<Self> {
        let prefs = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences file: {path:?}"))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse preferences file: {path:?}"))?
        } else {
            info!(?path, "Preferences file not found, using defaults");
            Preferences::default()
        };

        Ok(Self { path, prefs })
    }

    /// Default preferences file path.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "dacvol", "dacvol")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("prefs.toml"))
    }

    #[must_use]
    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    /// Persist a new volume token. Unchanged values are not rewritten.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn set_volume(&mut self, volume: &str) -> Result<()> {
        if self.prefs.volume == volume {
            return Ok(());
        }
        self.prefs.volume = volume.to_string();
        self.save()
    }

    /// Persist the auto-apply flag.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn set_auto_apply(&mut self, enabled: bool) -> Result<()> {
        if self.prefs.auto_apply == enabled {
            return Ok(());
        }
        self.prefs.auto_apply = enabled;
        self.save()
    }

    /// Persist the quit-after-apply flag.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn set_quit_after_apply(&mut self, enabled: bool) -> Result<()> {
        if self.prefs.quit_after_apply == enabled {
            return Ok(());
        }
        self.prefs.quit_after_apply = enabled;
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {parent:?}"))?;
        }
        let content = toml::to_string_pretty(&self.prefs)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write preferences file: {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PrefsStore {
        PrefsStore::load(dir.path().join("prefs.toml")).unwrap()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get().volume, "007f");
        assert!(!store.get().auto_apply);
        assert!(!store.get().quit_after_apply);
    }

    #[test]
    fn test_changes_round_trip_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        store.set_volume("0a3c").unwrap();
        store.set_auto_apply(true).unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.get().volume, "0a3c");
        assert!(reloaded.get().auto_apply);
        assert!(!reloaded.get().quit_after_apply);
    }

    #[test]
    fn test_unchanged_value_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        // Setting the default value again must not create the file.
        store.set_volume("007f").unwrap();
        assert!(!dir.path().join("prefs.toml").exists());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "auto_apply = true\n").unwrap();

        let store = PrefsStore::load(path).unwrap();
        assert!(store.get().auto_apply);
        assert_eq!(store.get().volume, "007f");
    }
}
