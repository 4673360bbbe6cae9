//! Overlay Service
//!
//! Runs one overlay session: owns the motion controller, consumes the
//! surface's input events, drives frame steps through the scheduler and
//! stops on dismiss, timeout, screen-off or request.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::running_state::RunningState;
use super::scheduler::{schedule, ScheduledTask};
use crate::data::{PositionStore, SettingsStore};
use crate::motion::{MotionController, MotionHost, Position, Size, TouchEvent, TouchPhase};
use crate::ui::{OverlayIcon, OverlaySurface};

/// Input to a running overlay
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Touch(TouchEvent),
    ScreenBoundsChanged(Size),
    ScreenOff,
    Stop(StopReason),
    /// Frame tick scheduled by the service itself
    Frame { generation: u64 },
}

/// Why an overlay session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Icon dropped on the close zone
    Dismissed,
    TimedOut,
    ScreenOff,
    /// Tile, tray, launcher or signal
    Requested,
    /// Every event sender went away
    InputClosed,
}

pub type EventSender = mpsc::UnboundedSender<OverlayEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<OverlayEvent>;
type WeakEventSender = mpsc::WeakUnboundedSender<OverlayEvent>;

/// Overlay session bound to one surface
pub struct OverlayService<S: OverlaySurface> {
    surface: S,
    settings: SettingsStore,
    running: RunningState,
    /// Self-addressed events must not keep the stream open
    events_tx: WeakEventSender,
    events_rx: EventReceiver,
}

impl<S: OverlaySurface> OverlayService<S> {
    pub fn new(
        surface: S,
        settings: SettingsStore,
        running: RunningState,
        events_tx: EventSender,
        events_rx: EventReceiver,
    ) -> Self {
        Self {
            surface,
            settings,
            running,
            events_tx: events_tx.downgrade(),
            events_rx,
        }
    }

    /// Run until the overlay stops
    pub async fn run(self) -> Result<StopReason> {
        let session = Uuid::new_v4();
        let span = tracing::info_span!("overlay", session = %session);
        self.run_session().instrument(span).await
    }

    async fn run_session(mut self) -> Result<StopReason> {
        let _running = self.running.enter();
        let config = self.settings.current();
        let positions = self.settings.position_store();
        let live_settings = self.settings.subscribe();

        let icon = OverlayIcon::load(
            config.overlay.custom_icon.as_deref(),
            config.overlay.icon_size as u32,
            config.overlay.opacity,
        );
        let frame_delay = config.motion.frame_delay();
        let mut controller = MotionController::new(
            config.motion,
            self.surface.screen_size(),
            icon.size(),
            positions.load(),
        );
        if let Err(e) = self.surface.show(&icon, controller.position()) {
            // A surface may have created windows before failing
            self.surface.teardown();
            return Err(e);
        }
        tracing::info!(
            "Overlay started at ({}, {})",
            controller.position().x,
            controller.position().y
        );

        let _timeout = config.overlay.timeout.duration().map(|after| {
            tracing::info!("Overlay will stop after {}", config.overlay.timeout);
            let tx = self.events_tx.clone();
            schedule(after, move || {
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(OverlayEvent::Stop(StopReason::TimedOut));
                }
            })
        });

        let clock = Instant::now();
        let mut frames = FrameTicker::new(self.events_tx.clone());

        let reason = loop {
            let Some(event) = self.events_rx.recv().await else {
                break StopReason::InputClosed;
            };
            let mut host = HostBridge {
                surface: &mut self.surface,
                positions: &positions,
                dismissed: false,
            };

            match event {
                OverlayEvent::Touch(touch) => {
                    if touch.phase == TouchPhase::Down {
                        frames.cancel();
                    }
                    controller.handle_touch(&mut host, touch);
                    if host.dismissed {
                        break StopReason::Dismissed;
                    }
                    if controller.is_animating() && !frames.is_pending() {
                        frames.request(Duration::ZERO);
                    }
                }
                OverlayEvent::Frame { generation } => {
                    if !frames.accept(generation) {
                        tracing::trace!("Dropping stale frame {}", generation);
                        continue;
                    }
                    let now_ms = clock.elapsed().as_millis() as u64;
                    controller.step(&mut host, now_ms);
                    if controller.is_animating() {
                        frames.request(frame_delay);
                    }
                }
                OverlayEvent::ScreenBoundsChanged(size) => {
                    controller.on_screen_bounds_changed(&mut host, size);
                    if controller.is_animating() && !frames.is_pending() {
                        frames.request(Duration::ZERO);
                    }
                }
                OverlayEvent::ScreenOff => {
                    if live_settings.borrow().overlay.stop_on_screen_off {
                        break StopReason::ScreenOff;
                    }
                    tracing::debug!("Screen off ignored, stop-on-screen-off is disabled");
                }
                OverlayEvent::Stop(reason) => break reason,
            }
        };

        frames.cancel();
        self.surface.teardown();
        tracing::info!("Overlay stopped: {:?}", reason);
        Ok(reason)
    }
}

/// Routes controller side effects to the surface and the position store
struct HostBridge<'a, S: OverlaySurface> {
    surface: &'a mut S,
    positions: &'a PositionStore,
    dismissed: bool,
}

impl<S: OverlaySurface> MotionHost for HostBridge<'_, S> {
    fn apply_position(&mut self, position: Position) {
        self.surface.apply_position(position);
    }

    fn set_close_zone_visible(&mut self, visible: bool) {
        self.surface.set_close_zone_visible(visible);
    }

    fn persist_position(&mut self, position: Position) {
        self.positions.persist(position);
    }

    fn request_dismiss(&mut self) {
        self.dismissed = true;
    }
}

/// Schedules frame ticks back into the event stream.
///
/// Each request bumps the generation; a tick that was already queued when its
/// task got cancelled carries an old generation and is ignored.
struct FrameTicker {
    tx: WeakEventSender,
    generation: u64,
    pending: Option<ScheduledTask>,
}

impl FrameTicker {
    fn new(tx: WeakEventSender) -> Self {
        Self {
            tx,
            generation: 0,
            pending: None,
        }
    }

    fn request(&mut self, delay: Duration) {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        self.pending = Some(schedule(delay, move || {
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(OverlayEvent::Frame { generation });
            }
        }));
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a delivered tick is the live one
    fn accept(&mut self, generation: u64) -> bool {
        if generation == self.generation && self.pending.is_some() {
            self.pending = None;
            true
        } else {
            false
        }
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeoutOption;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct SurfaceLog {
        shown_at: Option<Position>,
        applied: Vec<Position>,
        close_zone: Vec<bool>,
        torn_down: bool,
    }

    struct RecordingSurface {
        screen: Size,
        log: Arc<Mutex<SurfaceLog>>,
        fail_show: bool,
    }

    impl OverlaySurface for RecordingSurface {
        fn screen_size(&self) -> Size {
            self.screen
        }
        fn show(&mut self, _icon: &OverlayIcon, position: Position) -> Result<()> {
            if self.fail_show {
                anyhow::bail!("window creation failed");
            }
            self.log.lock().unwrap().shown_at = Some(position);
            Ok(())
        }
        fn apply_position(&mut self, position: Position) {
            self.log.lock().unwrap().applied.push(position);
        }
        fn set_close_zone_visible(&mut self, visible: bool) {
            self.log.lock().unwrap().close_zone.push(visible);
        }
        fn teardown(&mut self) {
            self.log.lock().unwrap().torn_down = true;
        }
    }

    struct Fixture {
        _dir: TempDir,
        settings: SettingsStore,
        running: RunningState,
        log: Arc<Mutex<SurfaceLog>>,
        tx: EventSender,
        handle: tokio::task::JoinHandle<Result<StopReason>>,
    }

    fn start(saved: Position, configure: impl FnOnce(&SettingsStore)) -> Fixture {
        let dir = TempDir::new().unwrap();
        let settings = SettingsStore::open(&dir.path().join("config.toml")).unwrap();
        configure(&settings);
        settings.position_store().persist(saved);

        let running = RunningState::new();
        let log = Arc::new(Mutex::new(SurfaceLog::default()));
        let surface = RecordingSurface {
            screen: Size::new(1080, 2000),
            log: log.clone(),
            fail_show: false,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let service = OverlayService::new(surface, settings.clone(), running.clone(), tx.clone(), rx);
        let handle = tokio::spawn(service.run());
        Fixture {
            _dir: dir,
            settings,
            running,
            log,
            tx,
            handle,
        }
    }

    fn touch(tx: &EventSender, phase: TouchPhase, x: f64, y: f64, t: u64) {
        tx.send(OverlayEvent::Touch(TouchEvent::new(phase, x, y, t)))
            .unwrap();
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_shows_clamped_saved_position_and_stop_clears_running() {
        let fx = start(Position::new(4000, 100), |_| {});
        settle().await;

        assert!(fx.running.is_running());
        assert_eq!(fx.log.lock().unwrap().shown_at, Some(Position::new(880, 100)));

        fx.tx.send(OverlayEvent::Stop(StopReason::Requested)).unwrap();
        let reason = fx.handle.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::Requested);
        assert!(!fx.running.is_running());
        assert!(fx.log.lock().unwrap().torn_down);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_show_still_tears_down() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsStore::open(&dir.path().join("config.toml")).unwrap();
        let running = RunningState::new();
        let log = Arc::new(Mutex::new(SurfaceLog::default()));
        let surface = RecordingSurface {
            screen: Size::new(1080, 2000),
            log: log.clone(),
            fail_show: true,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let service = OverlayService::new(surface, settings, running.clone(), tx, rx);

        assert!(service.run().await.is_err());
        assert!(!running.is_running());
        let log = log.lock().unwrap();
        assert!(log.torn_down);
        assert_eq!(log.shown_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_drag_snaps_and_persists() {
        let fx = start(Position::new(400, 400), |_| {});
        settle().await;

        touch(&fx.tx, TouchPhase::Down, 410.0, 410.0, 0);
        touch(&fx.tx, TouchPhase::Move, 660.0, 1010.0, 1000);
        touch(&fx.tx, TouchPhase::Move, 910.0, 1710.0, 2000);
        touch(&fx.tx, TouchPhase::Up, 910.0, 1710.0, 3000);
        settle().await;

        assert_eq!(
            fx.settings.position_store().load(),
            Position::new(880, 1700)
        );
        assert_eq!(
            fx.log.lock().unwrap().applied.last(),
            Some(&Position::new(880, 1700))
        );
        assert!(fx.running.is_running());
        fx.tx.send(OverlayEvent::Stop(StopReason::Requested)).unwrap();
        fx.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_on_close_zone_stops_overlay() {
        let fx = start(Position::new(500, 1000), |_| {});
        settle().await;

        touch(&fx.tx, TouchPhase::Down, 510.0, 1010.0, 0);
        touch(&fx.tx, TouchPhase::Move, 510.0, 1910.0, 1000);
        touch(&fx.tx, TouchPhase::Up, 510.0, 1910.0, 2000);

        let reason = fx.handle.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::Dismissed);
        assert!(!fx.running.is_running());
        let log = fx.log.lock().unwrap();
        assert_eq!(log.close_zone, vec![true]);
        assert!(log.torn_down);
        // no snap ran, so nothing new was persisted
        assert_eq!(fx.settings.position_store().load(), Position::new(500, 1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_timeout_stops_overlay() {
        let fx = start(Position::new(0, 0), |s| {
            s.set_timeout(TimeoutOption::FiveMinutes).unwrap();
        });

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(fx.running.is_running());

        let reason = fx.handle.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::TimedOut);
        assert!(!fx.running.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_screen_off_follows_live_setting() {
        let fx = start(Position::new(0, 0), |_| {});
        settle().await;

        fx.tx.send(OverlayEvent::ScreenOff).unwrap();
        settle().await;
        assert!(fx.running.is_running());

        fx.settings.set_stop_on_screen_off(true).unwrap();
        fx.tx.send(OverlayEvent::ScreenOff).unwrap();
        let reason = fx.handle.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::ScreenOff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_down_freezes_running_snap() {
        let fx = start(Position::new(500, 300), |_| {});
        settle().await;

        touch(&fx.tx, TouchPhase::Down, 0.0, 0.0, 0);
        touch(&fx.tx, TouchPhase::Up, 0.0, 0.0, 1000);
        // let the snap run for a few frames, then grab the icon again
        tokio::time::sleep(Duration::from_millis(40)).await;
        touch(&fx.tx, TouchPhase::Down, 0.0, 0.0, 1100);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let frozen = fx.log.lock().unwrap().applied.len();
        assert!(frozen > 0);

        settle().await;
        let log = fx.log.lock().unwrap();
        assert_eq!(log.applied.len(), frozen);
        let x = log.applied.last().unwrap().x;
        assert!(x > 0 && x < 500, "snap should be mid-way, got {x}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_reclamps() {
        let fx = start(Position::new(880, 1700), |_| {});
        settle().await;

        fx.tx
            .send(OverlayEvent::ScreenBoundsChanged(Size::new(2000, 1080)))
            .unwrap();
        settle().await;
        assert_eq!(fx.settings.position_store().load(), Position::new(880, 880));

        fx.tx.send(OverlayEvent::Stop(StopReason::Requested)).unwrap();
        fx.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_stops_overlay() {
        let fx = start(Position::new(0, 0), |_| {});
        settle().await;
        let Fixture {
            tx, handle, running, ..
        } = fx;
        drop(tx);

        let reason = handle.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::InputClosed);
        assert!(!running.is_running());
    }

    #[test]
    fn test_frame_ticker_generations() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let (tx, _rx) = mpsc::unbounded_channel();
            let mut ticker = FrameTicker::new(tx.downgrade());

            ticker.request(Duration::ZERO);
            let live = ticker.generation;
            ticker.cancel();
            assert!(!ticker.accept(live));

            ticker.request(Duration::ZERO);
            assert!(ticker.accept(ticker.generation));
            assert!(!ticker.accept(ticker.generation));
        });
    }
}
