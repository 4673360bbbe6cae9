//! Cancellable delayed tasks
//!
//! `schedule(delay, action)` runs `action` once after `delay` on the tokio
//! runtime. Cancelling the returned handle before it fires guarantees the
//! action never runs; cancelling afterwards is a no-op.

use futures_util::future::{abortable, AbortHandle};
use std::time::Duration;

/// Handle to a pending delayed action. Dropping the handle cancels it.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: AbortHandle,
}

impl ScheduledTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `action` after `delay` unless the returned task is cancelled first.
pub fn schedule<F>(delay: Duration, action: F) -> ScheduledTask
where
    F: FnOnce() + Send + 'static,
{
    let (sleep, handle) = abortable(tokio::time::sleep(delay));
    let live = handle.clone();
    tokio::spawn(async move {
        // Liveness is checked again after waking: an abort racing the timer wins.
        if sleep.await.is_ok() && !live.is_aborted() {
            action();
        }
    });
    ScheduledTask { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let action = move || {
            h.fetch_add(1, Ordering::SeqCst);
        };
        (hits, action)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (hits, action) = counter();
        let task = schedule(Duration::from_millis(16), action);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        drop(task);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire_prevents_action() {
        let (hits, action) = counter();
        let task = schedule(Duration::from_millis(16), action);
        task.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_is_noop() {
        let (hits, action) = counter();
        let task = schedule(Duration::from_millis(5), action);
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.cancel();
        task.cancel();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (hits, action) = counter();
        drop(schedule(Duration::from_millis(5), action));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
