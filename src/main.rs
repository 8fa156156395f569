//! IconPack - alternate icon artwork installer for Steam games
//!
//! Headless entry point.
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/iconpack.<date>
//! 2. Load YAML configuration from `IconPack Data/`
//!    - `IconPack Catalog.yaml` → pack name, styles, game mapping
//!    - `IconPack Settings.yaml` (+ `ICONPACK_*` env) → style, roots, selection,
//!      and `debug_mode`, which raises the log level
//! 3. Build the [`Session`] (install root falls back to the platform default,
//!    asset root to the executable's directory)
//! 4. Create tokio runtime and run the batch in the background
//! 5. Print outcomes as they stream in; Ctrl-C stops before the next game
//! 6. Log metrics and shut the runtime down with a 5s timeout
//!
//! # Usage
//!
//! ```text
//! iconpack                  apply the configured style
//! iconpack extract <dir>    copy the bundled icons/ tree into <dir>
//! ```

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use iconpack::services::{available_games, default_root, extract};
use iconpack::{
    APP_NAME, BatchEvent, BatchRunner, ConfigManager, IconApplier, Session, UserSettings, VERSION,
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    // Installed before configuration so load warnings reach the log; the
    // level follows `debug_mode` once settings are known.
    let logging = iconpack::logging::setup_logging_with_console(
        Utf8Path::new("logs"),
        "iconpack",
        false,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new("IconPack Data")?;
    let settings = config_manager.load_settings()?;
    if settings.debug_mode {
        logging.set_debug_mode(true)?;
        tracing::debug!("Debug logging enabled");
    }

    let asset_root = resolve_asset_root(&settings)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => run_apply(&config_manager, &settings, asset_root),
        [command, dest] if command == "extract" => {
            let result = extract(&asset_root, Utf8Path::new(dest));
            println!("{}", result.message);
            if !result.success {
                bail!("{}", result.message);
            }
            Ok(())
        }
        _ => bail!("Usage: {} [extract <destination>]", APP_NAME),
    }
}

fn run_apply(
    config_manager: &ConfigManager,
    settings: &UserSettings,
    asset_root: Utf8PathBuf,
) -> Result<()> {
    let catalog = Arc::new(config_manager.load_catalog()?);

    let install_root = match settings.install_root.clone().or_else(default_root) {
        Some(root) => root,
        None => bail!("No Steam install root configured and no platform default is known"),
    };

    let session = Session::new(settings.style, install_root, asset_root);
    let (style_name, _) = catalog.style_info(session.style_index);
    tracing::info!(
        "{}: style {} ({}), install root {}",
        catalog.name,
        session.style_index,
        style_name,
        session.install_root
    );

    let ids: Vec<u32> = if settings.selected_games.is_empty() {
        available_games(&catalog, session.style_index, &session.install_root)
            .into_iter()
            .map(|game| game.id)
            .collect()
    } else {
        settings.selected_games.clone()
    };

    if ids.is_empty() {
        tracing::warn!("No installed games found under {}", session.install_root);
        println!("No games to apply.");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("iconpack-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let runner = BatchRunner::new(Arc::new(IconApplier::new(Arc::clone(&catalog))));
    let mut handle = runner.spawn(runtime.handle(), session, ids);

    runtime.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        loop {
            tokio::select! {
                event = handle.recv() => match event {
                    Some(event) => print_event(&event),
                    None => break,
                },
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    println!("Stopping after the current game...");
                    handle.cancel();
                }
            }
        }
    });

    let summary = runtime.block_on(handle.wait())?;
    runner.metrics().log_summary();

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    if summary.failed > 0 && summary.succeeded == 0 {
        bail!("All {} operation(s) failed", summary.failed);
    }
    Ok(())
}

fn print_event(event: &BatchEvent) {
    match event {
        BatchEvent::Started { total } => println!("Applying icons to {} game(s)", total),
        BatchEvent::GameStarted { index, total, game } => {
            println!("[{}/{}] {}", index, total, game)
        }
        BatchEvent::Outcome(outcome) => println!("  {}", outcome),
        BatchEvent::Finished(summary) => println!(
            "Done: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        ),
        BatchEvent::Cancelled(summary) => println!(
            "Cancelled after {} game(s): {} succeeded, {} failed",
            summary.games_processed, summary.succeeded, summary.failed
        ),
    }
}

/// Configured asset root, else the directory holding the executable.
fn resolve_asset_root(settings: &UserSettings) -> Result<Utf8PathBuf> {
    if let Some(root) = &settings.asset_root {
        return Ok(root.clone());
    }

    let exe = std::env::current_exe().context("Failed to locate the executable")?;
    let dir = exe
        .parent()
        .context("Executable has no parent directory")?
        .to_path_buf();
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|p| anyhow::anyhow!("Executable directory is not valid UTF-8: {}", p.display()))
}
