//! Patch configuration
//!
//! Defines the on-disk layout of a patching session and the extract list
//! that decides which archive paths are staged for patching.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default file name of the extract list, looked up inside the work dir.
pub const EXTRACT_LIST_FILE: &str = "paths_to_extract.json";

/// Layout of a patching session, all rooted at one work directory
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Directory everything below lives in
    pub work_dir: PathBuf,

    /// Original cache: vanilla assets extracted from the archive
    pub extract_cache: PathBuf,

    /// Modified overlay: only assets changed during the current run
    pub modified_cache: PathBuf,

    /// Diff container built from the overlay (kept after a patch run)
    pub diff_path: PathBuf,

    /// Temporary container used when restoring vanilla assets
    pub restore_path: PathBuf,

    /// JSON list of archive paths to extract
    pub extract_list: PathBuf,

    /// Append-only error log
    pub error_log: PathBuf,
}

impl PatchConfig {
    /// Derive the session layout from a work directory
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            extract_cache: work_dir.join("extractedassets"),
            modified_cache: work_dir.join("modifiedassets"),
            diff_path: work_dir.join("patch.zip"),
            restore_path: work_dir.join("restore.zip"),
            extract_list: work_dir.join(EXTRACT_LIST_FILE),
            error_log: work_dir.join("error_log.txt"),
            work_dir,
        }
    }

    /// Layout next to the running executable
    pub fn beside_executable() -> anyhow::Result<Self> {
        let exe = std::env::current_exe().context("Could not locate the running executable")?;
        let dir = exe
            .parent()
            .context("Executable has no parent directory")?
            .to_path_buf();
        Ok(Self::new(dir))
    }

    /// Override the extract list location
    pub fn with_extract_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.extract_list = path.into();
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid file format. Please select a .ggpk or .bin file.")]
    InvalidArchiveFormat(PathBuf),

    #[error("GGPK file not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("Archive mount directory not found: {0}")]
    MountNotFound(PathBuf),

    #[error("Failed to read extract list {path}: {source}")]
    ExtractListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse extract list {path}: {source}")]
    ExtractListInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Extract list document: `{ "paths": ["shaders/a.hlsl", ...] }`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractList {
    #[serde(default)]
    pub paths: Vec<String>,
}

impl ExtractList {
    /// Load the extract list.
    ///
    /// A missing file, whitespace-only content or a missing `paths` key all
    /// mean "nothing to extract" and yield an empty list. Only unreadable
    /// files and malformed JSON are errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("Extract list not found: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ExtractListUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ConfigError::ExtractListInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse extract list JSON; blank input is an empty list
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let list: Option<Self> = serde_json::from_str(content)?;
        Ok(list.unwrap_or_default())
    }

    /// Non-empty paths, in configured order
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str).filter(|p| !p.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}
