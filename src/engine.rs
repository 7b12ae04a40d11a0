//! Patch engine
//!
//! Applies each enabled plugin, in order, to its explicit file list and to
//! every file under its directories whose name matches one of its patterns.
//! Failures are isolated: a bad asset is logged and skipped, a bad plugin
//! does not stop the others.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wildmatch::WildMatchPattern;

use crate::cache::{PatchContext, PatchError};
use crate::console::{report_failure, Console};
use crate::paths;
use crate::plugins::{split_patterns, PatchPlugin};

/// Case-insensitive file name pattern (`*`, `?`)
pub type FilePattern = WildMatchPattern<'*', '?'>;

/// Outcome of one plugin
#[derive(Debug, Clone)]
pub struct PluginReport {
    pub name: &'static str,
    /// Assets this plugin wrote
    pub written: usize,
    /// Assets skipped because of an error
    pub failed: usize,
    pub elapsed: Duration,
}

/// Run every plugin against the cache in `ctx`
pub fn run_plugins(ctx: &mut PatchContext, plugins: &[Box<dyn PatchPlugin>], console: &Console) -> Vec<PluginReport> {
    plugins
        .iter()
        .map(|plugin| {
            let report = apply_plugin(ctx, plugin.as_ref(), console);
            console.emit(format!("{} patched in {}ms.", report.name, report.elapsed.as_millis()));
            report
        })
        .collect()
}

/// Apply one plugin to its files, then to its directory globs
pub fn apply_plugin(ctx: &mut PatchContext, plugin: &dyn PatchPlugin, console: &Console) -> PluginReport {
    let started = Instant::now();
    let mut report = PluginReport {
        name: plugin.name(),
        written: 0,
        failed: 0,
        elapsed: Duration::ZERO,
    };

    for file in plugin.files_to_patch() {
        match paths::resolve_case_insensitive(ctx.original_root(), &file)
            .filter(|p| p.is_file())
            .and_then(|p| paths::relative_archive_path(ctx.original_root(), &p))
        {
            Some(rel) => patch_one(ctx, &rel, plugin, console, &mut report),
            None => {
                let missing = paths::join_archive_path(ctx.original_root(), &file);
                warn!("File not found: {}", missing.display());
                console.emit(format!("File not found: {}", missing.display()));
            }
        }
    }

    let extension = plugin.extension().to_string();
    for directory in plugin.directories_to_patch() {
        for pattern in split_patterns(&extension) {
            for rel in matching_files(ctx, &directory, pattern, console) {
                patch_one(ctx, &rel, plugin, console, &mut report);
            }
        }
    }

    report.elapsed = started.elapsed();
    info!(
        "Plugin {} wrote {} assets ({} failed) in {:?}",
        report.name, report.written, report.failed, report.elapsed
    );
    report
}

/// Files under `original_root/<directory>` whose name matches `pattern`,
/// as archive paths in a stable order
pub fn matching_files(ctx: &PatchContext, directory: &str, pattern: &str, console: &Console) -> Vec<String> {
    let Some(search_root) = paths::resolve_case_insensitive(ctx.original_root(), directory).filter(|p| p.is_dir())
    else {
        let missing = paths::join_archive_path(ctx.original_root(), directory);
        warn!("Directory not found: {}", missing.display());
        console.emit(format!("Directory not found: {}", missing.display()));
        return Vec::new();
    };

    let matcher = FilePattern::new_case_insensitive(pattern);
    let files: Vec<String> = WalkDir::new(&search_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| matcher.matches(&e.file_name().to_string_lossy()))
        .filter_map(|e| paths::relative_archive_path(ctx.original_root(), e.path()))
        .collect();

    debug!("{} files match {} under {}", files.len(), pattern, directory);
    files
}

fn patch_one(ctx: &mut PatchContext, rel: &str, plugin: &dyn PatchPlugin, console: &Console, report: &mut PluginReport) {
    match ctx.patch_file(rel, plugin) {
        Ok(true) => report.written += 1,
        Ok(false) => {}
        Err(e) => {
            report.failed += 1;
            ctx.stats.failed += 1;
            if let PatchError::NotFound(ref path) = e {
                console.emit(format!("File not found: {}", path.display()));
            } else {
                console.emit(format!("Error modifying file {}: {}", rel, e));
            }
            report_failure(&format!("Error in ModifyFile: {}", rel), &anyhow::Error::new(e));
        }
    }
}
