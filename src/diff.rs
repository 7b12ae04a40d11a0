//! Diff containers
//!
//! The overlay (or, when restoring, the whole original cache) is packed
//! into a zip whose entry names are archive paths, and the entries are
//! handed to the index's bulk replace. Containers from a patch run are
//! kept for inspection; restore containers are deleted after commit.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::index::{ArchiveIndex, DiffEntry};
use crate::paths;

/// What happens to the container after commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Keep,
    Delete,
}

/// Whether `root` holds any files at all
pub fn has_files(root: &Path) -> bool {
    root.is_dir()
        && WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file())
}

/// Remove a container left behind by an earlier run
pub fn discard(zip_path: &Path) -> Result<()> {
    if zip_path.exists() {
        std::fs::remove_file(zip_path)
            .with_context(|| format!("Failed to remove stale container: {}", zip_path.display()))?;
        debug!("Removed stale container {}", zip_path.display());
    }
    Ok(())
}

/// Pack every file below `root` into a zip at `zip_path`.
///
/// Entry names are relative to `root` with forward slashes, in sorted
/// order. A stale container at `zip_path` is replaced. Returns the number
/// of entries written.
pub fn build_diff(root: &Path, zip_path: &Path) -> Result<usize> {
    discard(zip_path)?;
    paths::ensure_parent_dirs(zip_path)?;

    let file = File::create(zip_path)
        .with_context(|| format!("Failed to create container: {}", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = paths::relative_archive_path(root, entry.path()) else {
            continue;
        };

        let data = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to container", name))?;
        zip.write_all(&data)?;
        count += 1;
    }

    zip.finish().context("Failed to finish container")?;
    debug!("Packed {} files from {} into {}", count, root.display(), zip_path.display());
    Ok(count)
}

/// Read every file entry of a container
pub fn read_diff(zip_path: &Path) -> Result<Vec<DiffEntry>> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open container: {}", zip_path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read container: {}", zip_path.display()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let path = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("Failed to read {} from container", path))?;
        entries.push(DiffEntry { path, data });
    }
    Ok(entries)
}

/// Pack `root` and commit it to `index`.
///
/// An empty `root` commits nothing and builds no container. The returned
/// count is what the index actually replaced, which can be lower than the
/// number of packed files.
pub fn commit(index: &mut dyn ArchiveIndex, root: &Path, zip_path: &Path, retention: Retention) -> Result<usize> {
    if !has_files(root) {
        debug!("Nothing to commit under {}", root.display());
        return Ok(0);
    }

    let packed = build_diff(root, zip_path)?;
    let entries = read_diff(zip_path)?;
    let replaced = index.replace(&entries)?;
    info!("Committed {}/{} entries from {}", replaced, packed, zip_path.display());

    if retention == Retention::Delete && zip_path.exists() {
        std::fs::remove_file(zip_path)
            .with_context(|| format!("Failed to delete container: {}", zip_path.display()))?;
    }

    Ok(replaced)
}
