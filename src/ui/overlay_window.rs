//! Overlay Windows
//!
//! Two topmost layered popups: the icon and the close zone. Each overlay
//! session owns a UI thread running their message loop. Drags are tracked by
//! polling the cursor on a timer while the left button is held, and every
//! sample goes to the overlay service as a touch event.

use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicIsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::Instant;

use windows::core::w;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Power::{
    SetThreadExecutionState, ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED,
};
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::*;

use super::icon::OverlayIcon;
use super::surface::OverlaySurface;
use crate::business::{EventSender, OverlayEvent};
use crate::motion::{Position, ScreenBounds, Size, TouchEvent, TouchPhase};

const WM_DESTROY: u32 = 0x0002;
const WM_PAINT: u32 = 0x000F;
const WM_CANCELMODE: u32 = 0x001F;
const WM_DISPLAYCHANGE: u32 = 0x007E;
const WM_TIMER: u32 = 0x0113;
const WM_LBUTTONDOWN: u32 = 0x0201;
const WM_LBUTTONUP: u32 = 0x0202;
const WM_POWERBROADCAST: u32 = 0x0218;
const PBT_APMSUSPEND: usize = 0x0004;
const VK_LBUTTON: i32 = 0x01;

const TRACK_TIMER_ID: usize = 1;
const TRACK_INTERVAL_MS: u32 = 16;

/// Magenta never appears in the default icon; pixels of this color are see-through
const COLOR_KEY: u32 = 0x00FF00FF;
const CLOSE_ZONE_ALPHA: u8 = 200;

struct Bitmap {
    bgra: Vec<u8>,
    width: i32,
    height: i32,
}

static ICON_BITMAP: Mutex<Option<Bitmap>> = Mutex::new(None);
static ZONE_HWND: AtomicIsize = AtomicIsize::new(0);
static TRACKING: AtomicBool = AtomicBool::new(false);
static LAST_X: AtomicI32 = AtomicI32::new(0);
static LAST_Y: AtomicI32 = AtomicI32::new(0);
static EPOCH: OnceLock<Instant> = OnceLock::new();

thread_local! {
    static EVENT_SENDER: RefCell<Option<EventSender>> = const { RefCell::new(None) };
}

/// Overlay surface backed by Win32 windows
pub struct WindowsSurface {
    icon: isize,
    zone: isize,
    thread: Option<JoinHandle<()>>,
}

impl WindowsSurface {
    /// Create the windows on a fresh UI thread. Input from them goes to `events`.
    pub fn spawn(events: EventSender) -> Result<Self> {
        let (ready_tx, ready_rx) = channel();
        let thread = std::thread::Builder::new()
            .name("overlay-ui".into())
            .spawn(move || unsafe { run_ui_thread(events, ready_tx) })?;

        let (icon, zone) = ready_rx
            .recv()
            .map_err(|_| anyhow!("overlay window thread exited during startup"))??;
        tracing::info!("Overlay windows created");

        Ok(Self {
            icon,
            zone,
            thread: Some(thread),
        })
    }
}

impl OverlaySurface for WindowsSurface {
    fn screen_size(&self) -> Size {
        unsafe { Size::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn show(&mut self, icon: &OverlayIcon, position: Position) -> Result<()> {
        let bitmap = Bitmap {
            bgra: icon.to_bgra_keyed(COLOR_KEY),
            width: icon.width() as i32,
            height: icon.height() as i32,
        };
        let (width, height) = (bitmap.width, bitmap.height);
        *ICON_BITMAP
            .lock()
            .map_err(|_| anyhow!("icon bitmap lock poisoned"))? = Some(bitmap);

        let hwnd = HWND(self.icon);
        unsafe {
            SetLayeredWindowAttributes(
                hwnd,
                COLORREF(COLOR_KEY),
                icon.window_alpha(),
                LWA_COLORKEY | LWA_ALPHA,
            )?;
            SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                position.x,
                position.y,
                width,
                height,
                SWP_NOACTIVATE | SWP_SHOWWINDOW,
            )?;
            let _ = InvalidateRect(hwnd, None, TRUE);
        }
        Ok(())
    }

    fn apply_position(&mut self, position: Position) {
        unsafe {
            if let Err(e) = SetWindowPos(
                HWND(self.icon),
                HWND_TOPMOST,
                position.x,
                position.y,
                0,
                0,
                SWP_NOSIZE | SWP_NOACTIVATE,
            ) {
                tracing::debug!("SetWindowPos failed: {:?}", e);
            }
        }
    }

    fn set_close_zone_visible(&mut self, visible: bool) {
        let hwnd = HWND(self.zone);
        unsafe {
            if visible {
                // The display may have changed since the last reveal
                let zone = ScreenBounds::new(self.screen_size()).close_zone();
                if let Err(e) = SetWindowPos(
                    hwnd,
                    HWND_TOPMOST,
                    zone.left,
                    zone.top,
                    zone.right - zone.left,
                    zone.bottom - zone.top,
                    SWP_NOACTIVATE | SWP_SHOWWINDOW,
                ) {
                    tracing::debug!("Failed to show close zone: {:?}", e);
                }
            } else {
                let _ = ShowWindow(hwnd, SW_HIDE);
            }
        }
    }

    fn teardown(&mut self) {
        unsafe {
            let _ = PostMessageW(HWND(self.icon), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Overlay window thread panicked");
            }
        }
        if let Ok(mut bitmap) = ICON_BITMAP.lock() {
            *bitmap = None;
        }
        tracing::info!("Overlay windows closed");
    }
}

unsafe fn run_ui_thread(events: EventSender, ready: Sender<Result<(isize, isize)>>) {
    EVENT_SENDER.with(|s| *s.borrow_mut() = Some(events));

    match create_windows() {
        Ok(handles) => {
            let _ = ready.send(Ok(handles));
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    }

    // Keep the display on for as long as this thread runs the overlay
    let _ = SetThreadExecutionState(ES_CONTINUOUS | ES_DISPLAY_REQUIRED | ES_SYSTEM_REQUIRED);

    let mut msg = MSG::default();
    while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
        let _ = TranslateMessage(&msg);
        DispatchMessageW(&msg);
    }

    let _ = SetThreadExecutionState(ES_CONTINUOUS);
    TRACKING.store(false, Ordering::SeqCst);
    EVENT_SENDER.with(|s| *s.borrow_mut() = None);
}

unsafe fn create_windows() -> Result<(isize, isize)> {
    let inst = GetModuleHandleW(None)?;
    let cursor = LoadCursorW(None, IDC_HAND)
        .unwrap_or_else(|_| LoadCursorW(None, IDC_ARROW).unwrap_or_default());

    let icon_class = w!("EnergyDrinkOverlay");
    let zone_class = w!("EnergyDrinkCloseZone");
    for (class, proc) in [
        (icon_class, icon_proc as WindowProc),
        (zone_class, zone_proc as WindowProc),
    ] {
        let wc = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(proc),
            hInstance: inst.into(),
            hCursor: cursor,
            lpszClassName: class,
            ..Default::default()
        };
        // Fails harmlessly when a previous session already registered the class
        RegisterClassExW(&wc);
    }

    let ex_style = WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE;
    let icon = CreateWindowExW(
        ex_style,
        icon_class,
        w!("Energy Drink"),
        WS_POPUP,
        0,
        0,
        1,
        1,
        HWND::default(),
        HMENU::default(),
        inst,
        None,
    );
    if icon.0 == 0 {
        return Err(anyhow!("CreateWindowExW failed for the overlay icon"));
    }

    let zone = CreateWindowExW(
        ex_style | WS_EX_TRANSPARENT,
        zone_class,
        w!("Energy Drink close"),
        WS_POPUP,
        0,
        0,
        1,
        1,
        HWND::default(),
        HMENU::default(),
        inst,
        None,
    );
    if zone.0 == 0 {
        let _ = DestroyWindow(icon);
        return Err(anyhow!("CreateWindowExW failed for the close zone"));
    }
    SetLayeredWindowAttributes(
        zone,
        COLORREF(COLOR_KEY),
        CLOSE_ZONE_ALPHA,
        LWA_COLORKEY | LWA_ALPHA,
    )?;
    ZONE_HWND.store(zone.0, Ordering::SeqCst);

    Ok((icon.0, zone.0))
}

type WindowProc = unsafe extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT;

fn now_ms() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

fn send(event: OverlayEvent) {
    EVENT_SENDER.with(|s| {
        if let Some(tx) = s.borrow().as_ref() {
            let _ = tx.send(event);
        }
    });
}

unsafe fn send_touch(phase: TouchPhase, pt: POINT) {
    LAST_X.store(pt.x, Ordering::SeqCst);
    LAST_Y.store(pt.y, Ordering::SeqCst);
    send(OverlayEvent::Touch(TouchEvent::new(
        phase,
        pt.x as f64,
        pt.y as f64,
        now_ms(),
    )));
}

unsafe fn cursor() -> POINT {
    let mut pt = POINT::default();
    let _ = GetCursorPos(&mut pt);
    pt
}

unsafe fn end_drag(hwnd: HWND, phase: TouchPhase) {
    if TRACKING.swap(false, Ordering::SeqCst) {
        let _ = KillTimer(hwnd, TRACK_TIMER_ID);
        send_touch(phase, cursor());
    }
}

unsafe extern "system" fn icon_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);
            if let Ok(guard) = ICON_BITMAP.lock() {
                if let Some(bitmap) = guard.as_ref() {
                    paint_bitmap(hdc, bitmap);
                }
            }
            EndPaint(hwnd, &ps);
            LRESULT(0)
        }
        WM_LBUTTONDOWN => {
            TRACKING.store(true, Ordering::SeqCst);
            send_touch(TouchPhase::Down, cursor());
            let _ = SetTimer(hwnd, TRACK_TIMER_ID, TRACK_INTERVAL_MS, None);
            LRESULT(0)
        }
        WM_TIMER => {
            if wparam.0 == TRACK_TIMER_ID && TRACKING.load(Ordering::SeqCst) {
                let key_state = GetAsyncKeyState(VK_LBUTTON);
                if (key_state & 0x8000u16 as i16) == 0 {
                    end_drag(hwnd, TouchPhase::Up);
                } else {
                    let pt = cursor();
                    if pt.x != LAST_X.load(Ordering::SeqCst) || pt.y != LAST_Y.load(Ordering::SeqCst)
                    {
                        send_touch(TouchPhase::Move, pt);
                    }
                }
            }
            LRESULT(0)
        }
        WM_LBUTTONUP => {
            end_drag(hwnd, TouchPhase::Up);
            LRESULT(0)
        }
        WM_CANCELMODE => {
            end_drag(hwnd, TouchPhase::Cancel);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        WM_DISPLAYCHANGE => {
            let width = (lparam.0 & 0xFFFF) as i32;
            let height = ((lparam.0 >> 16) & 0xFFFF) as i32;
            tracing::info!("Display changed to {}x{}", width, height);
            send(OverlayEvent::ScreenBoundsChanged(Size::new(width, height)));
            LRESULT(0)
        }
        WM_POWERBROADCAST => {
            if wparam.0 == PBT_APMSUSPEND {
                tracing::info!("System suspending");
                send(OverlayEvent::ScreenOff);
            }
            LRESULT(1)
        }
        WM_DESTROY => {
            let _ = KillTimer(hwnd, TRACK_TIMER_ID);
            let zone = ZONE_HWND.swap(0, Ordering::SeqCst);
            if zone != 0 {
                let _ = DestroyWindow(HWND(zone));
            }
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe fn paint_bitmap(hdc: HDC, bitmap: &Bitmap) {
    let info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: bitmap.width,
            // Negative height: rows are stored top-down
            biHeight: -bitmap.height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: 0, // BI_RGB
            ..Default::default()
        },
        ..Default::default()
    };
    StretchDIBits(
        hdc,
        0,
        0,
        bitmap.width,
        bitmap.height,
        0,
        0,
        bitmap.width,
        bitmap.height,
        Some(bitmap.bgra.as_ptr() as *const _),
        &info,
        DIB_RGB_COLORS,
        SRCCOPY,
    );
}

unsafe extern "system" fn zone_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);

            let mut rect = RECT::default();
            let _ = GetClientRect(hwnd, &mut rect);

            let bg = CreateSolidBrush(COLORREF(COLOR_KEY));
            FillRect(hdc, &rect, bg);
            let _ = DeleteObject(bg);

            // Dark pill with a white cross in the middle
            let pill = CreateSolidBrush(COLORREF(0x303030));
            let no_pen = CreatePen(PS_NULL, 0, COLORREF(0));
            let ob = SelectObject(hdc, pill);
            let op = SelectObject(hdc, no_pen);
            let radius = rect.bottom - rect.top;
            let _ = RoundRect(hdc, rect.left, rect.top, rect.right, rect.bottom, radius, radius);
            SelectObject(hdc, ob);
            SelectObject(hdc, op);
            let _ = DeleteObject(pill);
            let _ = DeleteObject(no_pen);

            let cx = (rect.left + rect.right) / 2;
            let cy = (rect.top + rect.bottom) / 2;
            let arm = (rect.bottom - rect.top) / 5;
            let cross = CreatePen(PS_SOLID, 6, COLORREF(0xFFFFFF));
            let op = SelectObject(hdc, cross);
            let _ = MoveToEx(hdc, cx - arm, cy - arm, None);
            let _ = LineTo(hdc, cx + arm, cy + arm);
            let _ = MoveToEx(hdc, cx + arm, cy - arm, None);
            let _ = LineTo(hdc, cx - arm, cy + arm);
            SelectObject(hdc, op);
            let _ = DeleteObject(cross);

            EndPaint(hwnd, &ps);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
