//! Vanilla asset extraction
//!
//! Stages the configured archive paths into the original cache. The cache
//! is wiped first, so every run is a full re-extraction of the configured
//! set rather than an incremental update.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{ExtractList, PatchConfig};
use crate::console::{report_failure, Console};
use crate::index::ArchiveIndex;
use crate::paths;

/// Extract every path on the extract list into the original cache.
///
/// Never fails: configuration problems and per-path errors are reported
/// and the count of what did get extracted is returned.
pub fn extract_assets(index: &dyn ArchiveIndex, config: &PatchConfig, console: &Console) -> usize {
    // Leave an existing cache alone when there is no list at all
    if !config.extract_list.exists() {
        warn!("Extract paths file not found: {}", config.extract_list.display());
        console.emit(format!("Extract paths file not found: {}", config.extract_list.display()));
        return 0;
    }

    let list = match ExtractList::load(&config.extract_list) {
        Ok(list) => list,
        Err(e) => {
            let err = anyhow::Error::new(e);
            report_failure("Error parsing extract paths JSON", &err);
            console.emit(format!("Error reading extract list: {}", err));
            return 0;
        }
    };

    match extract_list(index, &list, &config.extract_cache, console) {
        Ok(count) => count,
        Err(e) => {
            report_failure("Error in ExtractFiles", &e);
            console.emit(format!("Error extracting assets: {:#}", e));
            0
        }
    }
}

/// Extract the entries of `list` below `cache_root`, wiping it first.
pub fn extract_list(
    index: &dyn ArchiveIndex,
    list: &ExtractList,
    cache_root: &Path,
    console: &Console,
) -> Result<usize> {
    if cache_root.exists() {
        std::fs::remove_dir_all(cache_root)
            .with_context(|| format!("Failed to clear cache: {}", cache_root.display()))?;
    }

    if list.is_empty() {
        warn!("No paths found in extract configuration");
        console.emit("No paths found in extract configuration.");
        return Ok(0);
    }

    let mut total = 0;
    for path in list.entries() {
        match extract_one(index, path, cache_root) {
            Ok(Some(count)) => {
                debug!("Extracted {} entries for {}", count, path);
                total += count;
            }
            Ok(None) => {
                warn!("Node not found in index: {}", path);
                console.emit(format!("Node not found in index: {}", path));
            }
            Err(e) => {
                report_failure(&format!("Error extracting path: {}", path), &e);
                console.emit(format!("Error extracting {}: {:#}", path, e));
            }
        }
    }

    Ok(total)
}

/// Extract a single configured path. `None` when the index has no such node.
fn extract_one(index: &dyn ArchiveIndex, path: &str, cache_root: &Path) -> Result<Option<usize>> {
    if paths::has_parent_component(path) {
        bail!("Path leaves the archive root: {}", path);
    }

    let Some(node) = index.resolve(path) else {
        return Ok(None);
    };

    let archive_path = paths::to_archive_path(path);
    let dest = match paths::parent_path(archive_path.trim_matches('/')) {
        Some(parent) => paths::join_archive_path(cache_root, parent),
        None => cache_root.to_path_buf(),
    };
    std::fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    index.extract_parallel(&node, &dest).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use tempfile::tempdir;

    fn index() -> MemoryIndex {
        MemoryIndex::from_entries([
            ("shaders/a.hlsl", b"X".to_vec()),
            ("ui/b.txt", b"b".to_vec()),
            ("ui/hud/c.txt", b"c".to_vec()),
        ])
    }

    fn list(paths: &[&str]) -> ExtractList {
        ExtractList {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_extract_files_and_directories() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("extractedassets");
        let count = extract_list(&index(), &list(&["shaders/a.hlsl", "ui"]), &cache, &Console::silent()).unwrap();

        assert_eq!(count, 3);
        assert!(cache.join("shaders/a.hlsl").is_file());
        assert!(cache.join("ui/hud/c.txt").is_file());
    }

    #[test]
    fn test_unresolved_path_is_skipped() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("extractedassets");
        let (console, lines) = Console::recording();
        let count = extract_list(&index(), &list(&["missing/x.txt", "ui/b.txt"]), &cache, &console).unwrap();

        assert_eq!(count, 1);
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("missing/x.txt")));
    }

    fn listing(root: &Path) -> Vec<(String, Vec<u8>)> {
        walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = paths::relative_archive_path(root, e.path()).unwrap();
                (rel, std::fs::read(e.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_cache_is_wiped_between_runs() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("extractedassets");
        std::fs::create_dir_all(cache.join("stale")).unwrap();
        std::fs::write(cache.join("stale/old.txt"), b"old").unwrap();

        let paths = list(&["shaders/a.hlsl", "ui"]);
        let first = extract_list(&index(), &paths, &cache, &Console::silent()).unwrap();
        let first_files = listing(&cache);
        let second = extract_list(&index(), &paths, &cache, &Console::silent()).unwrap();
        let second_files = listing(&cache);

        assert_eq!(first, second);
        assert_eq!(first_files, second_files);
        let names: Vec<&str> = first_files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["shaders/a.hlsl", "ui/b.txt", "ui/hud/c.txt"]);
        assert!(!cache.join("stale").exists());
    }

    #[test]
    fn test_parent_components_are_rejected() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("work/extractedassets");
        let index = MemoryIndex::from_entries([
            ("shaders/../../outside/x.txt", b"x".to_vec()),
            ("ui/b.txt", b"b".to_vec()),
        ]);
        let (console, lines) = Console::recording();
        let count = extract_list(&index, &list(&["shaders/../../outside/x.txt", "ui/b.txt"]), &cache, &console).unwrap();

        assert_eq!(count, 1);
        assert!(!dir.path().join("work/outside").exists());
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("leaves the archive root")));
    }

    #[test]
    fn test_missing_extract_list_is_zero_work() {
        let dir = tempdir().unwrap();
        let config = PatchConfig::new(dir.path());
        std::fs::create_dir_all(config.extract_cache.join("ui")).unwrap();
        std::fs::write(config.extract_cache.join("ui/b.txt"), b"kept").unwrap();

        assert_eq!(extract_assets(&index(), &config, &Console::silent()), 0);
        assert!(config.extract_cache.join("ui/b.txt").exists());
    }

    #[test]
    fn test_invalid_extract_list_is_zero_work() {
        let dir = tempdir().unwrap();
        let config = PatchConfig::new(dir.path());
        std::fs::write(&config.extract_list, "{ nope").unwrap();
        assert_eq!(extract_assets(&index(), &config, &Console::silent()), 0);
    }

    #[test]
    fn test_extract_assets_reads_config() {
        let dir = tempdir().unwrap();
        let config = PatchConfig::new(dir.path());
        std::fs::write(&config.extract_list, r#"{"paths":["shaders/a.hlsl","ui/b.txt"]}"#).unwrap();

        assert_eq!(extract_assets(&index(), &config, &Console::silent()), 2);
        assert!(config.extract_cache.join("ui/b.txt").exists());
    }
}
