//! Loose-file archive index
//!
//! Serves an archive from an unpacked mirror of its tree on disk. Lookups
//! are case-insensitive like the bundle index; extraction copies files out
//! in parallel; replace overwrites only entries that already exist.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{extracted_relative_path, ArchiveIndex, DiffEntry, IndexNode};
use crate::config::ConfigError;
use crate::paths;

/// Archive index backed by a directory tree
#[derive(Debug, Clone)]
pub struct LooseIndex {
    root: PathBuf,
}

impl LooseIndex {
    /// Open the unpacked tree at `root`
    pub fn open(root: &Path) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::MountNotFound(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Files below `dir`, as (absolute path, archive path) pairs
    fn files_under(&self, dir: &Path) -> Vec<(PathBuf, String)> {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = paths::relative_archive_path(&self.root, e.path())?;
                Some((e.into_path(), rel))
            })
            .collect()
    }
}

impl ArchiveIndex for LooseIndex {
    fn resolve(&self, path: &str) -> Option<IndexNode> {
        if paths::normalize_for_lookup(path).is_empty() || paths::has_parent_component(path) {
            return None;
        }

        let found = paths::resolve_case_insensitive(&self.root, path)?;
        let rel = paths::relative_archive_path(&self.root, &found)?;
        if found.is_dir() {
            Some(IndexNode::directory(rel))
        } else {
            Some(IndexNode::file(rel))
        }
    }

    fn extract_parallel(&self, node: &IndexNode, dest_dir: &Path) -> Result<usize> {
        let source = paths::join_archive_path(&self.root, &node.path);
        let files = if source.is_dir() {
            self.files_under(&source)
        } else {
            vec![(source, node.path.clone())]
        };

        debug!("Copying {} files for {}", files.len(), node.path);

        let written: Vec<u64> = files
            .into_par_iter()
            .map(|(from, rel)| {
                let out = paths::join_archive_path(dest_dir, &extracted_relative_path(node, &rel));
                paths::ensure_parent_dirs(&out)
                    .with_context(|| format!("Failed to create directory for {}", out.display()))?;
                std::fs::copy(&from, &out)
                    .with_context(|| format!("Failed to copy {} to {}", from.display(), out.display()))
            })
            .collect::<Result<_>>()?;

        info!("Extracted {} files from {} to {}", written.len(), node.path, dest_dir.display());
        Ok(written.len())
    }

    fn replace(&mut self, entries: &[DiffEntry]) -> Result<usize> {
        let mut replaced = 0;
        for entry in entries {
            match paths::resolve_case_insensitive(&self.root, &entry.path) {
                Some(target) if target.is_file() => {
                    std::fs::write(&target, &entry.data)
                        .with_context(|| format!("Failed to replace {}", target.display()))?;
                    replaced += 1;
                }
                _ => debug!("No index entry for {}, skipping", entry.path),
            }
        }
        info!("Replaced {}/{} entries in {}", replaced, entries.len(), self.root.display());
        Ok(replaced)
    }
}
