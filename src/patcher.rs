//! Patch run orchestrator
//!
//! Coordinates a full run against one open index:
//! 1. Registry: instantiate plugins, snapshot settings, keep enabled ones
//! 2. Cache: check the original cache, reset the overlay
//! 3. Engine: apply plugins, timing each
//! 4. Commit: pack the overlay and bulk-replace it into the index
//!
//! Every entry point returns a plain count and never propagates errors;
//! anything unexpected is logged and reported as zero.

use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::cache::PatchContext;
use crate::config::PatchConfig;
use crate::console::{report_failure, Console};
use crate::diff::{self, Retention};
use crate::engine;
use crate::extract;
use crate::index::ArchiveIndex;
use crate::plugins::{self, PluginConstructor};
use crate::settings::SettingsProvider;

/// Pipeline bound to one archive index. Only one run may be in flight per
/// index; `&mut self` on every entry point enforces that.
pub struct Patcher<'a> {
    index: &'a mut dyn ArchiveIndex,
    config: PatchConfig,
    console: Console,
    plugins: &'static [PluginConstructor],
}

impl<'a> Patcher<'a> {
    pub fn new(index: &'a mut dyn ArchiveIndex, config: PatchConfig, console: Console) -> Self {
        Self {
            index,
            config,
            console,
            plugins: plugins::PLUGINS,
        }
    }

    /// Use a different plugin table
    pub fn with_plugins(mut self, table: &'static [PluginConstructor]) -> Self {
        self.plugins = table;
        self
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Extract the configured vanilla assets into the original cache
    pub fn extract(&mut self) -> usize {
        extract::extract_assets(&*self.index, &self.config, &self.console)
    }

    /// Run every enabled plugin and commit the result. Returns the number
    /// of index entries replaced.
    pub fn patch(&mut self, settings: &dyn SettingsProvider) -> usize {
        match self.try_patch(settings) {
            Ok(count) => count,
            Err(e) => {
                report_failure("Error in Patch", &e);
                self.console.emit(format!("Error applying patches: {:#}", e));
                0
            }
        }
    }

    fn try_patch(&mut self, settings: &dyn SettingsProvider) -> Result<usize> {
        let discovered = plugins::discover_from(self.plugins, &self.console);
        if discovered.is_empty() {
            self.console.emit("No patch types found.");
            return Ok(0);
        }

        let snapshot = settings.snapshot();
        let enabled = plugins::select(discovered, &snapshot);
        if enabled.is_empty() {
            self.console.emit("No patches enabled.");
            return Ok(0);
        }

        if !self.config.extract_cache.is_dir() {
            self.console.emit(format!(
                "Cache directory not found: {}",
                self.config.extract_cache.display()
            ));
            return Ok(0);
        }

        let started = Instant::now();
        let mut ctx = PatchContext::from_config(&self.config)?;
        let reports = engine::run_plugins(&mut ctx, &enabled, &self.console);
        info!(
            "Applied {} plugins to {} assets in {:?} ({} writes, {} unchanged, {} failed)",
            reports.len(),
            ctx.modified().len(),
            started.elapsed(),
            ctx.stats.writes,
            ctx.stats.unchanged,
            ctx.stats.failed
        );

        diff::discard(&self.config.diff_path)?;
        if !diff::has_files(ctx.modified_root()) {
            self.console.emit("No modified assets to apply.");
            return Ok(0);
        }

        diff::commit(&mut *self.index, ctx.modified_root(), &self.config.diff_path, Retention::Keep)
    }

    /// Re-commit the whole original cache, undoing earlier patches.
    /// Returns the number of index entries restored.
    pub fn restore(&mut self) -> usize {
        restore_extracted_assets(&mut *self.index, &self.config, &self.console)
    }
}

/// Commit the original cache back into `index` through a temporary
/// container that is deleted afterwards.
pub fn restore_extracted_assets(index: &mut dyn ArchiveIndex, config: &PatchConfig, console: &Console) -> usize {
    if !config.extract_cache.is_dir() {
        console.emit(format!("Cache directory not found: {}", config.extract_cache.display()));
        return 0;
    }

    match diff::commit(index, &config.extract_cache, &config.restore_path, Retention::Delete) {
        Ok(count) => count,
        Err(e) => {
            report_failure("Error in RestoreExtractedAssets", &e);
            console.emit(format!("Error restoring assets: {:#}", e));
            0
        }
    }
}
