//! Energy Drink
//!
//! A floating overlay icon that keeps the display awake while it is on screen.
//! Drag it around, fling it to an edge, or drop it on the close zone to stop.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod business;
mod data;
mod error;
mod motion;
mod ui;

use business::{AlwaysGranted, OverlayLauncher, OverlayPermission, QuickTile, RunningState};
use data::{AppConfig, SettingsStore, TimeoutOption};

/// Energy Drink - keep the screen awake with a floating overlay
#[derive(Parser, Debug)]
#[command(name = "energy-drink")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (defaults to config.toml next to the executable)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the overlay (default)
    Run,
    /// Inspect or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        /// Icon opacity in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        opacity: Option<u8>,
        /// Auto-stop after: off, 5m, 15m, 30m, 1h or 2h
        #[arg(long)]
        timeout: Option<TimeoutOption>,
        /// Stop the overlay when the screen turns off
        #[arg(long, value_name = "BOOL")]
        stop_on_screen_off: Option<bool>,
        /// Image to use instead of the default icon
        #[arg(long, value_name = "PATH")]
        icon: Option<PathBuf>,
    },
    /// Go back to the default icon
    ClearIcon,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging();

    let config_path = args.config.unwrap_or_else(AppConfig::config_path);
    let settings = SettingsStore::open(&config_path)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!("Starting Energy Drink v{}", env!("CARGO_PKG_VERSION"));
            run(settings).await
        }
        Command::Settings(command) => apply_settings_command(&settings, &config_path, command),
    }
}

async fn run(settings: SettingsStore) -> Result<()> {
    let running = RunningState::new();
    let permission: Arc<dyn OverlayPermission> = Arc::new(AlwaysGranted);
    let launcher = Arc::new(OverlayLauncher::new(
        settings.clone(),
        running.clone(),
        permission.clone(),
    ));
    let tile = QuickTile::new(running, permission);

    run_platform(settings, launcher, tile).await
}

#[cfg(target_os = "windows")]
async fn run_platform(
    settings: SettingsStore,
    launcher: Arc<OverlayLauncher>,
    tile: QuickTile,
) -> Result<()> {
    match launcher.start(ui::WindowsSurface::spawn) {
        Ok(outcome) => tracing::info!("Overlay start: {:?}", outcome),
        Err(e) => tracing::error!("Failed to start overlay: {:#}", e),
    }

    ui::run_app(settings, launcher.clone(), tile).await?;

    if let Some(result) = launcher.join().await {
        match result {
            Ok(reason) => tracing::info!("Overlay ended: {:?}", reason),
            Err(e) => tracing::error!("Overlay ended with error: {:#}", e),
        }
    }
    Ok(())
}

/// Display size assumed when there is no window system to ask
#[cfg(not(target_os = "windows"))]
const HEADLESS_SCREEN: motion::Size = motion::Size::new(1080, 2000);

#[cfg(not(target_os = "windows"))]
async fn run_platform(
    _settings: SettingsStore,
    launcher: Arc<OverlayLauncher>,
    tile: QuickTile,
) -> Result<()> {
    let outcome = launcher.start(|_events| Ok(ui::HeadlessSurface::new(HEADLESS_SCREEN)))?;
    if outcome != business::StartOutcome::Started {
        tracing::warn!("Overlay not started: {:?}", outcome);
        return Ok(());
    }

    tokio::spawn(async move {
        tile.watch(|state| tracing::info!("Tile: {}", state)).await;
    });

    let stopper = launcher.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping overlay");
            stopper.stop();
        }
    });

    match launcher.join().await {
        Some(Ok(reason)) => tracing::info!("Overlay ended: {:?}", reason),
        Some(Err(e)) => return Err(e),
        None => {}
    }
    Ok(())
}

fn apply_settings_command(
    settings: &SettingsStore,
    config_path: &std::path::Path,
    command: SettingsCommand,
) -> Result<()> {
    match command {
        SettingsCommand::Show => {}
        SettingsCommand::Set {
            opacity,
            timeout,
            stop_on_screen_off,
            icon,
        } => {
            if let Some(opacity) = opacity {
                settings.set_opacity(opacity)?;
            }
            if let Some(timeout) = timeout {
                settings.set_timeout(timeout)?;
            }
            if let Some(enabled) = stop_on_screen_off {
                settings.set_stop_on_screen_off(enabled)?;
            }
            if let Some(path) = icon {
                if !path.is_file() {
                    tracing::warn!("{:?} is not a file, the default icon will be used", path);
                }
                settings.set_custom_icon(Some(path))?;
            }
        }
        SettingsCommand::ClearIcon => {
            settings.set_custom_icon(None)?;
        }
    }

    print_settings(settings, config_path);
    Ok(())
}

fn print_settings(settings: &SettingsStore, config_path: &std::path::Path) {
    let config = settings.current();
    let position = settings.position_store().load();

    println!("config:             {}", config_path.display());
    println!("opacity:            {}%", config.overlay.opacity);
    println!(
        "timeout:            {} ({})",
        config.overlay.timeout,
        config.overlay.timeout.key()
    );
    println!("stop on screen off: {}", config.overlay.stop_on_screen_off);
    match &config.overlay.custom_icon {
        Some(path) => println!("icon:               {}", path.display()),
        None => println!("icon:               default"),
    }
    println!("position:           ({}, {})", position.x, position.y);
}
