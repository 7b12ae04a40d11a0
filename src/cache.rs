//! Two-layer patch cache
//!
//! Vanilla assets live in the original cache and are never written during a
//! patch run. The first time a plugin changes an asset, the result lands in
//! the modified overlay at the same relative path and the path joins the
//! modified set; later plugins then read and rewrite the overlay copy, so
//! transforms compose in plugin order.
//!
//! A [`PatchContext`] holds this state for exactly one run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::config::PatchConfig;
use crate::encoding;
use crate::paths;
use crate::plugins::PatchPlugin;

/// Failures of a single asset operation
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {cause:#}")]
    Read { path: String, cause: anyhow::Error },

    #[error("Failed to write {path}: {cause:#}")]
    Write { path: String, cause: anyhow::Error },

    #[error("Plugin {plugin} panicked on {path}")]
    Plugin { plugin: String, path: String },
}

impl PatchError {
    /// Short label for the error log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Read { .. } => "ReadError",
            Self::Write { .. } => "WriteError",
            Self::Plugin { .. } => "PluginError",
        }
    }
}

/// Per-run counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchStats {
    /// Writes into the overlay (an asset touched by two plugins counts twice)
    pub writes: usize,
    /// Transforms that returned "no change"
    pub unchanged: usize,
    /// Assets skipped because of an error
    pub failed: usize,
}

/// State of one patch run: cache roots and the modified set
#[derive(Debug)]
pub struct PatchContext {
    original_root: PathBuf,
    modified_root: PathBuf,
    modified: BTreeSet<String>,
    pub stats: PatchStats,
}

impl PatchContext {
    /// Start a run: wipe and recreate the overlay, empty modified set.
    pub fn begin(original_root: &Path, modified_root: &Path) -> anyhow::Result<Self> {
        paths::recreate_dir(modified_root)
            .with_context(|| format!("Failed to reset modified cache: {}", modified_root.display()))?;

        Ok(Self {
            original_root: original_root.to_path_buf(),
            modified_root: modified_root.to_path_buf(),
            modified: BTreeSet::new(),
            stats: PatchStats::default(),
        })
    }

    /// Start a run with the roots from `config`
    pub fn from_config(config: &PatchConfig) -> anyhow::Result<Self> {
        Self::begin(&config.extract_cache, &config.modified_cache)
    }

    pub fn original_root(&self) -> &Path {
        &self.original_root
    }

    pub fn modified_root(&self) -> &Path {
        &self.modified_root
    }

    /// Archive paths whose current content lives in the overlay
    pub fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    pub fn is_modified(&self, path: &str) -> bool {
        self.modified.contains(&paths::to_archive_path(path))
    }

    /// Where the authoritative copy of `path` currently lives
    pub fn source_path(&self, path: &str) -> PathBuf {
        if self.is_modified(path) {
            paths::join_archive_path(&self.modified_root, path)
        } else {
            paths::join_archive_path(&self.original_root, path)
        }
    }

    /// Overlay location of `path`; every write goes here
    pub fn overlay_path(&self, path: &str) -> PathBuf {
        paths::join_archive_path(&self.modified_root, path)
    }

    /// Run `plugin` over one asset.
    ///
    /// Returns `Ok(true)` when the overlay was written, `Ok(false)` when the
    /// plugin reported no change. On error nothing is written and the
    /// modified set is untouched.
    pub fn patch_file(&mut self, path: &str, plugin: &dyn PatchPlugin) -> Result<bool, PatchError> {
        let path = paths::to_archive_path(path);
        let already_modified = self.modified.contains(&path);
        let source = self.source_path(&path);

        if !source.is_file() {
            return Err(PatchError::NotFound(source));
        }

        let text = encoding::read_text(&source).map_err(|cause| PatchError::Read {
            path: path.clone(),
            cause,
        })?;

        // A panicking transform only costs this one asset
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| plugin.patch_file(&text)))
            .map_err(|_| PatchError::Plugin {
                plugin: plugin.name().to_string(),
                path: path.clone(),
            })?;

        let Some(patched) = result else {
            self.stats.unchanged += 1;
            return Ok(false);
        };

        let destination = self.overlay_path(&path);
        paths::ensure_parent_dirs(&destination)
            .with_context(|| format!("Failed to create directory for {}", destination.display()))
            .and_then(|_| encoding::write_text(&destination, &patched))
            .map_err(|cause| PatchError::Write {
                path: path.clone(),
                cause,
            })?;

        debug!("{} wrote {} (first change: {})", plugin.name(), path, !already_modified);
        self.stats.writes += 1;
        if !already_modified {
            self.modified.insert(path);
        }
        Ok(true)
    }
}
