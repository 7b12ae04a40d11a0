//! In-memory archive index
//!
//! Entries live in an ordered map keyed by normalized path. Extraction
//! writes files out in parallel with rayon.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::{extracted_relative_path, ArchiveIndex, DiffEntry, IndexNode};
use crate::paths;

#[derive(Debug, Clone)]
struct MemoryEntry {
    /// Original casing
    path: String,
    data: Vec<u8>,
}

/// Archive index held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    entries: BTreeMap<String, MemoryEntry>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, bytes)` pairs
    pub fn from_entries<P, D>(entries: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: Into<String>,
        D: Into<Vec<u8>>,
    {
        let mut index = Self::new();
        for (path, data) in entries {
            index.insert(path, data);
        }
        index
    }

    /// Add or overwrite an entry
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = paths::to_archive_path(&path.into()).trim_matches('/').to_string();
        self.entries.insert(
            paths::normalize_for_lookup(&path),
            MemoryEntry {
                path,
                data: data.into(),
            },
        );
    }

    /// Current content of an entry
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .get(&paths::normalize_for_lookup(path))
            .map(|e| e.data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries below a directory key (normalized, no trailing slash)
    fn under<'a>(&'a self, dir_key: &str) -> impl Iterator<Item = &'a MemoryEntry> + 'a {
        let prefix = format!("{}/", dir_key);
        self.entries
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(_, e)| e)
    }
}

impl ArchiveIndex for MemoryIndex {
    fn resolve(&self, path: &str) -> Option<IndexNode> {
        let key = paths::normalize_for_lookup(path);
        if key.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.get(&key) {
            return Some(IndexNode::file(entry.path.clone()));
        }

        // Directory: reuse the stored casing of the first child
        let depth = key.split('/').count();
        self.under(&key).next().map(|child| {
            let dir: Vec<&str> = child.path.split('/').take(depth).collect();
            IndexNode::directory(dir.join("/"))
        })
    }

    fn extract_parallel(&self, node: &IndexNode, dest_dir: &Path) -> Result<usize> {
        let key = paths::normalize_for_lookup(&node.path);
        let selected: Vec<&MemoryEntry> = match self.entries.get(&key) {
            Some(entry) => vec![entry],
            None => self.under(&key).collect(),
        };

        debug!("Extracting {} entries for {}", selected.len(), node.path);

        let written: Vec<()> = selected
            .into_par_iter()
            .map(|entry| {
                let out = paths::join_archive_path(dest_dir, &extracted_relative_path(node, &entry.path));
                paths::ensure_parent_dirs(&out)
                    .with_context(|| format!("Failed to create directory for {}", out.display()))?;
                std::fs::write(&out, &entry.data)
                    .with_context(|| format!("Failed to write {}", out.display()))
            })
            .collect::<Result<_>>()?;

        info!("Extracted {} files from {} to {}", written.len(), node.path, dest_dir.display());
        Ok(written.len())
    }

    fn replace(&mut self, entries: &[DiffEntry]) -> Result<usize> {
        let mut replaced = 0;
        for diff in entries {
            match self.entries.get_mut(&paths::normalize_for_lookup(&diff.path)) {
                Some(entry) => {
                    entry.data = diff.data.clone();
                    replaced += 1;
                }
                None => debug!("No index entry for {}, skipping", diff.path),
            }
        }
        info!("Replaced {}/{} entries", replaced, entries.len());
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> MemoryIndex {
        MemoryIndex::from_entries([
            ("Shaders/fog.hlsl", b"fog".to_vec()),
            ("Shaders/post/bloom.hlsl", b"bloom".to_vec()),
            ("ui/b.txt", b"b".to_vec()),
            ("uix/c.txt", b"c".to_vec()),
        ])
    }

    #[test]
    fn test_resolve_file_and_directory() {
        let index = sample();
        assert_eq!(index.resolve("shaders\\FOG.hlsl"), Some(IndexNode::file("Shaders/fog.hlsl")));
        assert_eq!(index.resolve("shaders"), Some(IndexNode::directory("Shaders")));
        assert_eq!(index.resolve("shaders/post"), Some(IndexNode::directory("Shaders/post")));
        assert_eq!(index.resolve("shad"), None);
        assert_eq!(index.resolve(""), None);
    }

    #[test]
    fn test_extract_directory_keeps_name() {
        let dir = tempdir().unwrap();
        let index = sample();
        let node = index.resolve("ui").unwrap();

        let count = index.extract_parallel(&node, dir.path()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(std::fs::read(dir.path().join("ui/b.txt")).unwrap(), b"b");
        // Sibling with a shared prefix is not part of the subtree
        assert!(!dir.path().join("uix").exists());
    }

    #[test]
    fn test_extract_nested_directory() {
        let dir = tempdir().unwrap();
        let index = sample();
        let node = index.resolve("shaders").unwrap();
        let dest = dir.path().join("cache");

        let count = index.extract_parallel(&node, &dest).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("Shaders/post/bloom.hlsl").exists());
    }

    #[test]
    fn test_replace_counts_only_known_entries() {
        let mut index = sample();
        let replaced = index
            .replace(&[
                DiffEntry { path: "shaders/fog.hlsl".into(), data: b"nofog".to_vec() },
                DiffEntry { path: "missing/x.txt".into(), data: b"x".to_vec() },
            ])
            .unwrap();
        assert_eq!(replaced, 1);
        assert_eq!(index.get("Shaders/fog.hlsl"), Some(&b"nofog"[..]));
        assert_eq!(index.len(), 4);
    }
}
