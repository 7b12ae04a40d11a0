//! ggpatch - archive asset patcher

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ggpatch::{open_index, plugins, Console, PatchConfig, Patcher, SettingsFile, SettingsProvider};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ggpatch")]
#[command(version)]
#[command(about = "Patch game archive assets: extract, transform, commit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the asset caches, containers and error log
    /// (defaults to the executable's directory)
    #[arg(short, long, global = true)]
    work_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ArchiveArgs {
    /// Path to Content.ggpk or _.index.bin
    archive: PathBuf,

    /// Unpacked tree serving the archive's contents
    #[arg(short, long)]
    mount: PathBuf,
}

#[derive(Args)]
struct SettingsArgs {
    /// Settings JSON ({"booleans": {..}, "numerics": {..}})
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Override a setting: name=true|false|<number>
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the vanilla assets named in paths_to_extract.json
    Extract {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Extract list to use instead of <work-dir>/paths_to_extract.json
        #[arg(long)]
        paths: Option<PathBuf>,
    },

    /// Apply enabled patches and commit them into the archive
    Patch {
        #[command(flatten)]
        archive: ArchiveArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Commit the extracted vanilla assets back, undoing patches
    Restore {
        #[command(flatten)]
        archive: ArchiveArgs,
    },

    /// List built-in patches and whether current settings enable them
    Plugins {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Write the effective settings (file plus --set overrides) back to the settings file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging(config: &PatchConfig, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.work_dir)?;

    let file_name = config
        .error_log
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "error_log.txt".into());
    let appender = tracing_appender::rolling::never(&config.work_dir, file_name);
    let (error_writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = EnvFilter::from_default_env()
        .add_directive(if verbose { "ggpatch=debug".parse()? } else { "ggpatch=warn".parse()? });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(console_filter))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR),
        )
        .init();

    Ok(guard)
}

fn settings_provider(args: SettingsArgs) -> Result<SettingsFile> {
    let file = match args.settings {
        Some(path) => SettingsFile::new(path),
        None => SettingsFile::default_location()?,
    };
    file.with_overrides(args.overrides)
}

/// Run `f` against the opened index, or report why it could not be opened
fn with_patcher(
    args: &ArchiveArgs,
    config: PatchConfig,
    console: &Console,
    f: impl FnOnce(&mut Patcher) -> usize,
) -> Option<usize> {
    match open_index(&args.archive, &args.mount) {
        Ok((kind, mut index)) => {
            tracing::debug!("Using {} backend", kind.name());
            let mut patcher = Patcher::new(&mut *index, config, console.clone());
            Some(f(&mut patcher))
        }
        Err(e) => {
            console.emit(e.to_string());
            None
        }
    }
}

fn print_plugins(settings: &dyn SettingsProvider, console: &Console) {
    let snapshot = settings.snapshot();
    for (name, enabled) in plugins::describe(&snapshot, console) {
        println!("{:<16} {}", name, if enabled { "enabled" } else { "disabled" });
    }
}

fn work_dir_config(work_dir: Option<&Path>) -> Result<PatchConfig> {
    match work_dir {
        Some(dir) => Ok(PatchConfig::new(dir)),
        None => PatchConfig::beside_executable(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = work_dir_config(cli.work_dir.as_deref())?;
    let _guard = init_logging(&config, cli.verbose)?;
    let console = Console::stdout();

    match cli.command {
        Commands::Extract { archive, paths } => {
            let config = match paths {
                Some(list) => config.with_extract_list(list),
                None => config,
            };
            console.emit("Starting asset extraction...");
            if let Some(count) = with_patcher(&archive, config, &console, |p| p.extract()) {
                console.emit(format!("{} assets extracted successfully.", count));
            }
        }

        Commands::Patch { archive, settings } => {
            let provider = settings_provider(settings)?;
            console.emit("Patching GGPK...");
            let started = Instant::now();
            if let Some(count) = with_patcher(&archive, config, &console, |p| p.patch(&provider)) {
                console.emit(format!("{} assets patched successfully.", count));
                console.emit(format!("GGPK patched in {}ms.", started.elapsed().as_millis()));
            }
        }

        Commands::Restore { archive } => {
            console.emit("Starting asset restoration...");
            if let Some(count) = with_patcher(&archive, config, &console, |p| p.restore()) {
                console.emit(format!("{} assets restored successfully.", count));
            }
        }

        Commands::Plugins { settings, save } => {
            let provider = settings_provider(settings)?;
            if save {
                provider.save(&provider.snapshot())?;
                console.emit(format!("Settings saved to {}", provider.path().display()));
            }
            print_plugins(&provider, &console);
        }
    }

    Ok(())
}
