//! Archive path handling
//!
//! Archive paths are forward-slash delimited and double as relative
//! filesystem paths under the asset caches. The bundle index treats them
//! case-insensitively and tolerates Windows separators, so lookups go
//! through [`normalize_for_lookup`].

use std::path::{Path, PathBuf};

/// Convert Windows path separators to forward slashes
/// `Art\Textures\fog.dds` -> `Art/Textures/fog.dds`
pub fn to_archive_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalize a path for lookups and comparisons (lowercase, forward slashes, trimmed)
pub fn normalize_for_lookup(path: &str) -> String {
    path.to_lowercase()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

/// Find a file case-insensitively within a directory
///
/// Given a base directory and a relative path like `Shaders\Fog.hlsl`,
/// finds the actual entry even if the real path is `shaders/FOG.hlsl`
pub fn resolve_case_insensitive(base: &Path, relative: &str) -> Option<PathBuf> {
    let components: Vec<&str> = relative
        .split(['\\', '/'])
        .filter(|s| !s.is_empty())
        .collect();

    if components.is_empty() {
        return Some(base.to_path_buf());
    }

    let mut current = base.to_path_buf();

    for component in components {
        // Exact hit first, avoids a directory scan on the common path
        let direct = current.join(component);
        if direct.exists() {
            current = direct;
            continue;
        }

        let target_lower = component.to_lowercase();
        let found = std::fs::read_dir(&current).ok()?.find_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name();
            if name.to_string_lossy().to_lowercase() == target_lower {
                Some(entry.path())
            } else {
                None
            }
        });

        current = found?;
    }

    Some(current)
}

/// Whether any component of `path` is `..`
pub fn has_parent_component(path: &str) -> bool {
    path.split(['\\', '/']).any(|c| c == "..")
}

/// Get the parent directory of a path (handles both / and \)
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(['\\', '/']).map(|idx| &path[..idx])
}

/// Create parent directories for a path if they don't exist
pub fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Join a cache root with an archive path
pub fn join_archive_path(base: &Path, relative: &str) -> PathBuf {
    base.join(to_archive_path(relative).trim_start_matches('/'))
}

/// Express a file below `root` as an archive path (forward slashes)
pub fn relative_archive_path(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Remove a directory tree if present and recreate it empty
pub fn recreate_dir(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_archive_path() {
        assert_eq!(to_archive_path("Art\\Textures\\fog.dds"), "Art/Textures/fog.dds");
        assert_eq!(to_archive_path("shaders/fog.hlsl"), "shaders/fog.hlsl");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_for_lookup("Metadata\\Characters\\Character.ot"), "metadata/characters/character.ot");
        assert_eq!(normalize_for_lookup("/Shaders/"), "shaders");
    }

    #[test]
    fn test_has_parent_component() {
        assert!(has_parent_component("shaders/../../x"));
        assert!(has_parent_component("..\\x"));
        assert!(!has_parent_component("shaders/..fog/a.hlsl"));
        assert!(!has_parent_component("shaders/a.hlsl"));
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("shaders/post/fog.hlsl"), Some("shaders/post"));
        assert_eq!(parent_path("fog.hlsl"), None);
    }

    #[test]
    fn test_relative_archive_path() {
        let root = Path::new("/cache/modifiedassets");
        let file = root.join("shaders").join("fog.hlsl");
        assert_eq!(relative_archive_path(root, &file).as_deref(), Some("shaders/fog.hlsl"));
        assert_eq!(relative_archive_path(root, root), None);
        assert_eq!(relative_archive_path(root, Path::new("/elsewhere/a")), None);
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Shaders/Post")).unwrap();
        std::fs::write(dir.path().join("Shaders/Post/Fog.hlsl"), b"x").unwrap();

        let found = resolve_case_insensitive(dir.path(), "shaders\\post\\FOG.HLSL").unwrap();
        assert_eq!(found, dir.path().join("Shaders/Post/Fog.hlsl"));
        assert!(resolve_case_insensitive(dir.path(), "shaders/missing.hlsl").is_none());
    }

    #[test]
    fn test_join_archive_path() {
        let joined = join_archive_path(Path::new("/cache"), "/ui\\b.txt");
        assert_eq!(joined, PathBuf::from("/cache/ui/b.txt"));
    }
}
