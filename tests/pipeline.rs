//! End-to-end runs through the public API against an unpacked archive mount

use ggpatch::{open_index, Console, PatchConfig, Patcher, SettingsFile};
use std::path::Path;
use tempfile::tempdir;

const FOG_SHADER: &str = "float4 main() {\n    float fog_amount = depth * k;\n}\n";

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn stage(root: &Path) -> (std::path::PathBuf, std::path::PathBuf, PatchConfig) {
    let mount = root.join("mount");
    write(&mount, "Shaders/fog.hlsl", FOG_SHADER.as_bytes());
    write(&mount, "ui/b.txt", b"untouched");

    let archive = root.join("Content.ggpk");
    std::fs::write(&archive, b"").unwrap();

    let config = PatchConfig::new(root.join("work"));
    write(&config.work_dir, "paths_to_extract.json", br#"{"paths":["shaders","ui/b.txt"]}"#);
    (archive, mount, config)
}

#[test]
fn patch_then_restore_through_mount() {
    let dir = tempdir().unwrap();
    let (archive, mount, config) = stage(dir.path());
    let diff_path = config.diff_path.clone();
    let settings = SettingsFile::new(dir.path().join("settings.json"))
        .with_overrides(vec!["removeFog=true".to_string()])
        .unwrap();

    let (_, mut index) = open_index(&archive, &mount).unwrap();
    let (console, lines) = Console::recording();
    let mut patcher = Patcher::new(&mut *index, config, console);

    assert_eq!(patcher.extract(), 2);
    assert_eq!(patcher.patch(&settings), 1);
    assert!(diff_path.exists());
    assert!(lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.starts_with("RemoveFog patched in ")));

    let patched = std::fs::read_to_string(mount.join("Shaders/fog.hlsl")).unwrap();
    assert!(patched.contains("float fog_amount = 0.0;"));
    assert_eq!(std::fs::read(mount.join("ui/b.txt")).unwrap(), b"untouched");

    assert_eq!(patcher.restore(), 2);
    assert_eq!(std::fs::read_to_string(mount.join("Shaders/fog.hlsl")).unwrap(), FOG_SHADER);
}

#[test]
fn disabled_settings_leave_archive_alone() {
    let dir = tempdir().unwrap();
    let (archive, mount, config) = stage(dir.path());
    let settings = SettingsFile::new(dir.path().join("missing.json"));

    let (_, mut index) = open_index(&archive, &mount).unwrap();
    let mut patcher = Patcher::new(&mut *index, config, Console::silent());
    patcher.extract();

    assert_eq!(patcher.patch(&settings), 0);
    assert_eq!(std::fs::read_to_string(mount.join("Shaders/fog.hlsl")).unwrap(), FOG_SHADER);
}

#[test]
fn unsupported_archive_is_rejected_before_work() {
    let dir = tempdir().unwrap();
    let (_, mount, _) = stage(dir.path());
    let bogus = dir.path().join("Content.zip");
    std::fs::write(&bogus, b"").unwrap();

    let err = open_index(&bogus, &mount).err().unwrap();
    assert_eq!(err.to_string(), "Invalid file format. Please select a .ggpk or .bin file.");
}
