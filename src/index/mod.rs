//! Archive index abstraction
//!
//! The pipeline never touches the archive's binary format. It talks to an
//! [`ArchiveIndex`]: resolve a path to a node, extract a node's subtree to
//! disk, and bulk-replace entries from a diff. Both archive kinds (a full
//! `.ggpk` package and a standalone `.bin` bundle index) are driven through
//! the same trait, so everything downstream of [`open_index`] is identical.
//!
//! Two backends ship with the crate:
//! - [`MemoryIndex`] keeps entries in memory (embedding hosts, tests)
//! - [`LooseIndex`] works on an unpacked on-disk mirror of the archive

mod loose;
mod memory;

pub use loose::LooseIndex;
pub use memory::MemoryIndex;

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::config::ConfigError;

/// Archive kind, chosen by file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Full game package (`Content.ggpk`)
    Ggpk,
    /// Standalone bundle index (`Bundles2/_.index.bin`)
    BundleIndex,
}

impl ArchiveKind {
    /// Detect the archive kind from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "ggpk" => {
                debug!("Detected GGPK by extension: {}", path.display());
                Some(Self::Ggpk)
            }
            "bin" => {
                debug!("Detected bundle index by extension: {}", path.display());
                Some(Self::BundleIndex)
            }
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ggpk => "GGPK",
            Self::BundleIndex => "bundle index",
        }
    }
}

/// Whether a resolved node is a single entry or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// A resolved entry inside the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    /// Path as stored in the index (original casing, forward slashes)
    pub path: String,
    pub kind: NodeKind,
}

impl IndexNode {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::File,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Directory,
        }
    }
}

/// One entry of a diff container: archive path plus replacement bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub data: Vec<u8>,
}

/// Path lookup, parallel extraction and bulk replace over a packed archive
pub trait ArchiveIndex: Send + Sync {
    /// Resolve a path (case-insensitive, either separator) to a node
    fn resolve(&self, path: &str) -> Option<IndexNode>;

    /// Extract `node` into `dest_dir`, keeping the node's own name as the
    /// first component. Returns the number of files written.
    fn extract_parallel(&self, node: &IndexNode, dest_dir: &Path) -> Result<usize>;

    /// Replace existing entries with the diff's content. Entries with no
    /// counterpart in the index are skipped. Returns the number replaced.
    fn replace(&mut self, entries: &[DiffEntry]) -> Result<usize>;
}

/// Open the index for `archive_path`, served from the unpacked tree at `mount`.
///
/// The archive kind is validated before anything else is touched, so an
/// unsupported file is rejected without doing any work.
pub fn open_index(archive_path: &Path, mount: &Path) -> Result<(ArchiveKind, Box<dyn ArchiveIndex>), ConfigError> {
    let kind = ArchiveKind::from_path(archive_path)
        .ok_or_else(|| ConfigError::InvalidArchiveFormat(archive_path.to_path_buf()))?;

    if !archive_path.exists() {
        return Err(ConfigError::ArchiveNotFound(archive_path.to_path_buf()));
    }

    let index = LooseIndex::open(mount)?;
    debug!("Opened {} {} via {}", kind.name(), archive_path.display(), mount.display());
    Ok((kind, Box::new(index)))
}

/// Relative output path of `entry_path` when `node` is extracted
pub(crate) fn extracted_relative_path(node: &IndexNode, entry_path: &str) -> String {
    match crate::paths::parent_path(&node.path) {
        Some(parent) if !parent.is_empty() => entry_path[parent.len() + 1..].to_string(),
        _ => entry_path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_kind_from_path() {
        assert_eq!(ArchiveKind::from_path(Path::new("C:/Games/Content.ggpk")), Some(ArchiveKind::Ggpk));
        assert_eq!(ArchiveKind::from_path(Path::new("Bundles2/_.index.bin")), Some(ArchiveKind::BundleIndex));
        assert_eq!(ArchiveKind::from_path(Path::new("Content.GGPK")), Some(ArchiveKind::Ggpk));
        assert_eq!(ArchiveKind::from_path(Path::new("patch.zip")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_open_index_rejects_extension_first() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("Content.zip");
        std::fs::write(&bogus, b"").unwrap();

        let err = open_index(&bogus, dir.path()).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidArchiveFormat(_)));
    }

    #[test]
    fn test_open_index_missing_archive() {
        let dir = tempdir().unwrap();
        let err = open_index(&dir.path().join("Content.ggpk"), dir.path()).err().unwrap();
        assert!(matches!(err, ConfigError::ArchiveNotFound(_)));
    }

    #[test]
    fn test_open_index_both_kinds() {
        let dir = tempdir().unwrap();
        let mount = dir.path().join("mount");
        std::fs::create_dir_all(mount.join("shaders")).unwrap();
        std::fs::write(mount.join("shaders/fog.hlsl"), b"fog").unwrap();

        for name in ["Content.ggpk", "_.index.bin"] {
            let archive = dir.path().join(name);
            std::fs::write(&archive, b"").unwrap();
            let (_, index) = open_index(&archive, &mount).unwrap();
            assert_eq!(index.resolve("Shaders/Fog.hlsl"), Some(IndexNode::file("shaders/fog.hlsl")));
        }
    }

    #[test]
    fn test_extracted_relative_path() {
        let node = IndexNode::directory("art/ui");
        assert_eq!(extracted_relative_path(&node, "art/ui/hud/a.txt"), "ui/hud/a.txt");
        let root = IndexNode::directory("ui");
        assert_eq!(extracted_relative_path(&root, "ui/b.txt"), "ui/b.txt");
        let file = IndexNode::file("shaders/a.hlsl");
        assert_eq!(extracted_relative_path(&file, "shaders/a.hlsl"), "a.hlsl");
    }
}
