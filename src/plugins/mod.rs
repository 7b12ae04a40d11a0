//! Patch plugins
//!
//! A plugin names the assets it wants (explicit files, and directories
//! filtered by `|`-separated wildcard patterns) and transforms their text.
//! The set of plugins is fixed at compile time in [`PLUGINS`]; discovery
//! instantiates every entry and selection keeps the ones the current
//! settings enable.

mod camera_zoom;
mod particles;
mod remove_fog;
mod screen_shake;
mod shadows;

pub use camera_zoom::CameraZoom;
pub use particles::ReduceParticles;
pub use remove_fog::RemoveFog;
pub use screen_shake::ScreenShake;
pub use shadows::DisableShadows;

use anyhow::Result;
use tracing::debug;

use crate::console::{report_failure, Console};
use crate::settings::SettingsSnapshot;

/// A text transform over a set of archive assets
pub trait PatchPlugin: Send + Sync {
    /// Display name, also the enumeration key
    fn name(&self) -> &'static str;

    /// Whether this plugin runs for `settings`. Numeric values the
    /// transform depends on are captured here.
    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool;

    /// Archive paths patched individually
    fn files_to_patch(&self) -> Vec<String> {
        Vec::new()
    }

    /// Archive directories searched recursively for [`extension`](Self::extension) matches
    fn directories_to_patch(&self) -> Vec<String> {
        Vec::new()
    }

    /// `|`-joined file name patterns, e.g. `*.hlsl|*.ffx`
    fn extension(&self) -> &str {
        ""
    }

    /// Transform the asset text. `None` means "no change": nothing is
    /// written and the asset does not enter the diff.
    fn patch_file(&self, text: &str) -> Option<String>;
}

/// Fallible plugin constructor
pub type PluginFactory = fn() -> Result<Box<dyn PatchPlugin>>;

/// Registration table entry
#[derive(Clone, Copy)]
pub struct PluginConstructor {
    pub name: &'static str,
    pub create: PluginFactory,
}

impl std::fmt::Debug for PluginConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConstructor").field("name", &self.name).finish()
    }
}

/// Every built-in plugin
pub static PLUGINS: &[PluginConstructor] = &[
    PluginConstructor { name: "CameraZoom", create: CameraZoom::create },
    PluginConstructor { name: "DisableShadows", create: DisableShadows::create },
    PluginConstructor { name: "ReduceParticles", create: ReduceParticles::create },
    PluginConstructor { name: "RemoveFog", create: RemoveFog::create },
    PluginConstructor { name: "ScreenShake", create: ScreenShake::create },
];

/// Instantiate every built-in plugin
pub fn discover(console: &Console) -> Vec<Box<dyn PatchPlugin>> {
    discover_from(PLUGINS, console)
}

/// Instantiate every plugin in `table`, in lexical order of name.
///
/// A constructor that fails is logged and left out.
pub fn discover_from(table: &[PluginConstructor], console: &Console) -> Vec<Box<dyn PatchPlugin>> {
    let mut ordered: Vec<&PluginConstructor> = table.iter().collect();
    ordered.sort_by_key(|c| c.name);

    let mut plugins = Vec::with_capacity(ordered.len());
    for constructor in ordered {
        match (constructor.create)() {
            Ok(plugin) => plugins.push(plugin),
            Err(e) => {
                report_failure(&format!("Error creating patch instance: {}", constructor.name), &e);
                console.emit(format!("Error creating patch {}: {:#}", constructor.name, e));
            }
        }
    }
    plugins
}

/// Keep the plugins enabled by `settings`, preserving order
pub fn select(plugins: Vec<Box<dyn PatchPlugin>>, settings: &SettingsSnapshot) -> Vec<Box<dyn PatchPlugin>> {
    plugins
        .into_iter()
        .filter_map(|mut plugin| {
            let enabled = plugin.should_patch(settings);
            debug!("Plugin {} enabled={}", plugin.name(), enabled);
            enabled.then_some(plugin)
        })
        .collect()
}

/// Name and enabled state of every built-in plugin
pub fn describe(settings: &SettingsSnapshot, console: &Console) -> Vec<(&'static str, bool)> {
    discover(console)
        .into_iter()
        .map(|mut plugin| {
            let enabled = plugin.should_patch(settings);
            (plugin.name(), enabled)
        })
        .collect()
}

/// Split a `|`-joined pattern list, dropping empty pieces
pub fn split_patterns(extension: &str) -> impl Iterator<Item = &str> {
    extension.split('|').map(str::trim).filter(|p| !p.is_empty())
}

/// Shared helper: `Some(new)` only when the transform changed something
pub(crate) fn changed(original: &str, patched: String) -> Option<String> {
    if patched == original {
        None
    } else {
        Some(patched)
    }
}
