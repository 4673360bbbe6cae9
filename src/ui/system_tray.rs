//! System Tray
//!
//! The tray icon plays the quick tile on the desktop: its menu starts and stops
//! the overlay and its tooltip shows the tile state. Tile changes reach the
//! tray thread as posted messages.

use anyhow::Result;
use std::sync::Arc;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem},
    TrayIcon, TrayIconBuilder,
};

use super::icon::default_icon;
use super::overlay_window::WindowsSurface;
use crate::business::{OverlayLauncher, QuickTile, TileAction, TileState};
use crate::data::SettingsStore;

const TRAY_ICON_SIZE: u32 = 32;
/// Posted to the tray thread when the tile state changes (WM_APP + 1)
const WM_TILE_CHANGED: u32 = 0x8001;

/// Run the tray until the user quits
pub async fn run_app(
    settings: SettingsStore,
    launcher: Arc<OverlayLauncher>,
    tile: QuickTile,
) -> Result<()> {
    let icon = load_icon()?;
    let menu = Menu::new();

    let toggle_item = MenuItem::new("Start overlay", true, None);
    let separator1 = PredefinedMenuItem::separator();
    let screen_off_item = CheckMenuItem::new(
        "Stop when the screen turns off",
        true,
        settings.current().overlay.stop_on_screen_off,
        None,
    );
    let separator2 = PredefinedMenuItem::separator();
    let quit_item = MenuItem::new("Quit", true, None);

    let toggle_id = toggle_item.id().clone();
    let screen_off_id = screen_off_item.id().clone();
    let quit_id = quit_item.id().clone();

    menu.append(&toggle_item)?;
    menu.append(&separator1)?;
    menu.append(&screen_off_item)?;
    menu.append(&separator2)?;
    menu.append(&quit_item)?;

    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(tile.state().label())
        .with_icon(icon)
        .build()?;

    tracing::info!("System tray initialized");

    apply_tile_state(&tray, &toggle_item, tile.state());
    let menu_rx = MenuEvent::receiver();

    // Tray icons need a Win32 message loop on the thread that created them
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG,
    };

    let thread_id = unsafe { GetCurrentThreadId() };
    let watcher = tile.clone();
    let tile_task = tokio::spawn(async move {
        watcher
            .watch(move |state| unsafe {
                let code = WPARAM(tile_state_code(state));
                if let Err(e) = PostThreadMessageW(thread_id, WM_TILE_CHANGED, code, LPARAM(0)) {
                    tracing::warn!("Failed to notify tray of tile change: {}", e);
                }
            })
            .await;
    });

    unsafe {
        let mut msg = MSG::default();

        'running: while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if msg.message == WM_TILE_CHANGED {
                if let Some(state) = tile_state_from_code(msg.wParam.0) {
                    apply_tile_state(&tray, &toggle_item, state);
                }
            } else {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            while let Ok(event) = menu_rx.try_recv() {
                if event.id == toggle_id {
                    toggle_overlay(&launcher, &tile);
                } else if event.id == screen_off_id {
                    let enabled = screen_off_item.is_checked();
                    if let Err(e) = settings.set_stop_on_screen_off(enabled) {
                        tracing::error!("Failed to save setting: {}", e);
                    }
                } else if event.id == quit_id {
                    tracing::info!("Quit from menu");
                    launcher.stop();
                    break 'running;
                }
            }
        }
    }

    tile_task.abort();

    tracing::info!("Application exiting");
    Ok(())
}

fn toggle_overlay(launcher: &OverlayLauncher, tile: &QuickTile) {
    match tile.on_click() {
        TileAction::Start => match launcher.start(WindowsSurface::spawn) {
            Ok(outcome) => tracing::info!("Start from tray: {:?}", outcome),
            Err(e) => tracing::error!("Failed to start overlay: {:#}", e),
        },
        TileAction::Stop => {
            launcher.stop();
        }
        TileAction::Nothing => tracing::debug!("Tile unavailable, click ignored"),
    }
}

fn tile_state_code(state: TileState) -> usize {
    match state {
        TileState::Active => 0,
        TileState::Inactive => 1,
        TileState::Unavailable => 2,
    }
}

fn tile_state_from_code(code: usize) -> Option<TileState> {
    match code {
        0 => Some(TileState::Active),
        1 => Some(TileState::Inactive),
        2 => Some(TileState::Unavailable),
        _ => None,
    }
}

fn apply_tile_state(tray: &TrayIcon, toggle: &MenuItem, state: TileState) {
    toggle.set_text(match state {
        TileState::Active => "Stop overlay",
        TileState::Inactive | TileState::Unavailable => "Start overlay",
    });
    toggle.set_enabled(state != TileState::Unavailable);
    if let Err(e) = tray.set_tooltip(Some(state.label())) {
        tracing::warn!("Failed to update tray tooltip: {}", e);
    }
}

/// The tray shows a small rendition of the default overlay icon
fn load_icon() -> Result<tray_icon::Icon> {
    let image = default_icon(TRAY_ICON_SIZE);
    let icon = tray_icon::Icon::from_rgba(image.into_raw(), TRAY_ICON_SIZE, TRAY_ICON_SIZE)?;
    Ok(icon)
}
