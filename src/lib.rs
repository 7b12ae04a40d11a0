//! ggpatch - archive asset patcher
//!
//! Extracts a configured set of assets from a packed game archive, runs the
//! enabled text patches over them, and commits the changed files back into
//! the archive index as one bulk replace.

pub mod cache;
pub mod config;
pub mod console;
pub mod diff;
pub mod encoding;
pub mod engine;
pub mod extract;
pub mod index;
pub mod patcher;
pub mod paths;
pub mod plugins;
pub mod settings;

pub use config::PatchConfig;
pub use console::Console;
pub use index::{open_index, ArchiveIndex, ArchiveKind, LooseIndex, MemoryIndex};
pub use patcher::Patcher;
pub use settings::{SettingsFile, SettingsProvider, SettingsSnapshot};
