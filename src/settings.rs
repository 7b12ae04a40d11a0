//! Runtime settings snapshot
//!
//! Plugins decide whether to run, and how hard, from two flat maps: boolean
//! toggles and numeric values keyed by control name. A snapshot is taken
//! once per patch run so selection and execution see the same values.
//!
//! Settings persist in ~/.config/ggpatch/settings.json.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable view of the runtime settings for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub booleans: BTreeMap<String, bool>,

    #[serde(default)]
    pub numerics: BTreeMap<String, f32>,
}

impl SettingsSnapshot {
    /// Boolean toggle; absent keys read as `false`
    pub fn flag(&self, name: &str) -> bool {
        self.booleans.get(name).copied().unwrap_or(false)
    }

    /// Numeric value; absent keys read as `0.0`
    pub fn value(&self, name: &str) -> f32 {
        self.numerics.get(name).copied().unwrap_or(0.0)
    }

    pub fn with_flag(mut self, name: &str, on: bool) -> Self {
        self.booleans.insert(name.to_string(), on);
        self
    }

    pub fn with_value(mut self, name: &str, value: f32) -> Self {
        self.numerics.insert(name.to_string(), value);
        self
    }

    /// Apply a `key=value` override: `true`/`false` set a flag, numbers set a value
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("Expected key=value, got '{}'", assignment);
        };
        let key = key.trim();
        let raw = raw.trim();
        if key.is_empty() {
            bail!("Empty setting name in '{}'", assignment);
        }

        match raw.to_lowercase().as_str() {
            "true" | "on" | "yes" => {
                self.booleans.insert(key.to_string(), true);
            }
            "false" | "off" | "no" => {
                self.booleans.insert(key.to_string(), false);
            }
            _ => {
                let value: f32 = raw
                    .parse()
                    .with_context(|| format!("Setting '{}' is neither a boolean nor a number: {}", key, raw))?;
                self.numerics.insert(key.to_string(), value);
            }
        }
        Ok(())
    }
}

/// Source of runtime settings
pub trait SettingsProvider {
    /// Capture the current settings
    fn snapshot(&self) -> SettingsSnapshot;
}

impl SettingsProvider for SettingsSnapshot {
    fn snapshot(&self) -> SettingsSnapshot {
        self.clone()
    }
}

/// Settings stored as JSON on disk, re-read on every snapshot
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    overrides: Vec<String>,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: Vec::new(),
        }
    }

    /// Settings file in the user config directory
    pub fn default_location() -> Result<Self> {
        let path = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ggpatch")
            .join("settings.json");
        Ok(Self::new(path))
    }

    /// Layer `key=value` assignments on top of the file
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = String>) -> Result<Self> {
        let overrides: Vec<String> = overrides.into_iter().collect();
        // Validate once up front so snapshot() can stay infallible
        let mut probe = SettingsSnapshot::default();
        for assignment in &overrides {
            probe.apply_override(assignment)?;
        }
        self.overrides = overrides;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, returning defaults if the file is missing
    pub fn load(&self) -> Result<SettingsSnapshot> {
        if !self.path.exists() {
            return Ok(SettingsSnapshot::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(SettingsSnapshot::default());
        }

        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", self.path))
    }

    /// Save a snapshot to disk
    pub fn save(&self, settings: &SettingsSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, content).with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }
}

impl SettingsProvider for SettingsFile {
    fn snapshot(&self) -> SettingsSnapshot {
        let mut settings = match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                crate::console::report_failure("Error in CollectSettings", &e);
                SettingsSnapshot::default()
            }
        };
        for assignment in &self.overrides {
            // Already validated in with_overrides
            let _ = settings.apply_override(assignment);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_absent_keys_default() {
        let settings = SettingsSnapshot::default();
        assert!(!settings.flag("removeFog"));
        assert_eq!(settings.value("zoomLevel"), 0.0);
    }

    #[test]
    fn test_overrides() {
        let mut settings = SettingsSnapshot::default();
        settings.apply_override("removeFog=true").unwrap();
        settings.apply_override("zoomLevel = 2.5").unwrap();
        settings.apply_override("cameraZoom=off").unwrap();

        assert!(settings.flag("removeFog"));
        assert!(!settings.flag("cameraZoom"));
        assert_eq!(settings.value("zoomLevel"), 2.5);

        assert!(settings.apply_override("novalue").is_err());
        assert!(settings.apply_override("=true").is_err());
        assert!(settings.apply_override("zoomLevel=far").is_err());
    }

    #[test]
    fn test_settings_file_roundtrip() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("nested/settings.json"));
        assert_eq!(file.snapshot(), SettingsSnapshot::default());

        let settings = SettingsSnapshot::default()
            .with_flag("removeFog", true)
            .with_value("zoomLevel", 1.5);
        file.save(&settings).unwrap();
        assert_eq!(file.snapshot(), settings);
    }

    #[test]
    fn test_settings_file_partial_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"booleans":{"disableShadows":true}}"#).unwrap();

        let snapshot = SettingsFile::new(&path).snapshot();
        assert!(snapshot.flag("disableShadows"));
        assert!(snapshot.numerics.is_empty());
    }

    #[test]
    fn test_overrides_layer_on_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"booleans":{"removeFog":false}}"#).unwrap();

        let file = SettingsFile::new(&path)
            .with_overrides(vec!["removeFog=true".to_string()])
            .unwrap();
        assert!(file.snapshot().flag("removeFog"));

        assert!(SettingsFile::new(&path).with_overrides(vec!["bad".to_string()]).is_err());
    }
}
