//! Overlay Launcher
//!
//! Single start/stop entry point shared by the tray, the tile and the CLI.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::overlay_service::{EventSender, OverlayEvent, OverlayService, StopReason};
use super::running_state::RunningState;
use super::tile::OverlayPermission;
use crate::data::SettingsStore;
use crate::ui::OverlaySurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    PermissionDenied,
}

struct Session {
    tx: EventSender,
    handle: Option<JoinHandle<Result<StopReason>>>,
}

impl Session {
    fn is_live(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub struct OverlayLauncher {
    settings: SettingsStore,
    running: RunningState,
    permission: Arc<dyn OverlayPermission>,
    runtime: Handle,
    session: Mutex<Option<Session>>,
}

impl OverlayLauncher {
    /// Must be created inside a tokio runtime; later calls may come from any thread.
    pub fn new(
        settings: SettingsStore,
        running: RunningState,
        permission: Arc<dyn OverlayPermission>,
    ) -> Self {
        Self {
            settings,
            running,
            permission,
            runtime: Handle::current(),
            session: Mutex::new(None),
        }
    }

    /// Start an overlay on the surface built by `make_surface`.
    ///
    /// The surface gets a sender for the input events it produces.
    pub fn start<S, F>(&self, make_surface: F) -> Result<StartOutcome>
    where
        S: OverlaySurface,
        F: FnOnce(EventSender) -> Result<S>,
    {
        if !self.permission.is_granted() {
            tracing::warn!("Overlay permission not granted, not starting");
            return Ok(StartOutcome::PermissionDenied);
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("launcher state poisoned"))?;
        if self.running.is_running() || session.as_ref().is_some_and(Session::is_live) {
            tracing::debug!("Overlay already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let surface = make_surface(tx.clone())?;
        let service = OverlayService::new(
            surface,
            self.settings.clone(),
            self.running.clone(),
            tx.clone(),
            rx,
        );

        let handle = self.runtime.spawn(async move {
            let result = service.run().await;
            if let Err(e) = &result {
                tracing::error!("Overlay failed: {:#}", e);
            }
            result
        });

        *session = Some(Session {
            tx,
            handle: Some(handle),
        });
        tracing::info!("Overlay launched");
        Ok(StartOutcome::Started)
    }

    /// Ask the running overlay to stop. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        let Ok(mut session) = self.session.lock() else {
            return false;
        };
        match session.as_ref() {
            Some(current) if current.is_live() => current
                .tx
                .send(OverlayEvent::Stop(StopReason::Requested))
                .is_ok(),
            _ => {
                *session = None;
                false
            }
        }
    }

    /// Wait for the current overlay to end.
    ///
    /// Returns `None` when no overlay was started or another caller is already waiting.
    pub async fn join(&self) -> Option<Result<StopReason>> {
        let handle = self
            .session
            .lock()
            .ok()
            .and_then(|mut session| session.as_mut().and_then(|s| s.handle.take()))?;

        match handle.await {
            Ok(result) => Some(result),
            Err(e) => Some(Err(anyhow::anyhow!("overlay task failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::tile::AlwaysGranted;
    use crate::motion::Size;
    use crate::ui::HeadlessSurface;
    use tempfile::TempDir;

    struct Denied;

    impl OverlayPermission for Denied {
        fn is_granted(&self) -> bool {
            false
        }
    }

    fn launcher(dir: &TempDir, permission: Arc<dyn OverlayPermission>) -> OverlayLauncher {
        launcher_with_state(dir, permission, RunningState::new())
    }

    fn launcher_with_state(
        dir: &TempDir,
        permission: Arc<dyn OverlayPermission>,
        running: RunningState,
    ) -> OverlayLauncher {
        let settings = SettingsStore::open(&dir.path().join("config.toml")).unwrap();
        OverlayLauncher::new(settings, running, permission)
    }

    fn headless(_tx: EventSender) -> Result<HeadlessSurface> {
        Ok(HeadlessSurface::new(Size::new(1080, 2000)))
    }

    #[tokio::test]
    async fn test_start_stop_join() {
        let dir = TempDir::new().unwrap();
        let running = RunningState::new();
        let launcher = launcher_with_state(&dir, Arc::new(AlwaysGranted), running.clone());

        assert_eq!(launcher.start(headless).unwrap(), StartOutcome::Started);
        assert_eq!(launcher.start(headless).unwrap(), StartOutcome::AlreadyRunning);

        assert!(launcher.stop());
        let reason = launcher.join().await.unwrap().unwrap();
        assert_eq!(reason, StopReason::Requested);
        assert!(!running.is_running());

        // A finished session does not block the next start
        assert!(!launcher.stop());
        assert_eq!(launcher.start(headless).unwrap(), StartOutcome::Started);
        assert!(launcher.stop());
        launcher.join().await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let dir = TempDir::new().unwrap();
        let launcher = launcher(&dir, Arc::new(Denied));

        assert_eq!(launcher.start(headless).unwrap(), StartOutcome::PermissionDenied);
        assert!(launcher.join().await.is_none());
        assert!(!launcher.stop());
    }

    #[tokio::test]
    async fn test_surface_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let launcher = launcher(&dir, Arc::new(AlwaysGranted));

        let result = launcher.start(|_| -> Result<HeadlessSurface> {
            Err(anyhow::anyhow!("no display"))
        });
        assert!(result.is_err());
        assert!(!launcher.stop());
    }
}
