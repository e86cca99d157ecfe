//! Capture scheduling
//!
//! While a mode is active, a spawned loop fires a capture-and-submit step on
//! that mode's period. Disarming cancels the loop synchronously; any step
//! already awaiting the service is aborted with it, and a response that
//! slipped through is discarded by the controller's generation check.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drives periodic capture ticks for the active mode
#[derive(Debug, Default)]
pub struct CaptureScheduler {
    cancel: Option<CancellationToken>,
}

impl CaptureScheduler {
    /// Scheduler with nothing armed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tick loop is currently armed
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    /// Arm the scheduler: run `tick()` every `period` until disarmed
    ///
    /// Re-arming disarms the previous loop first.
    pub fn arm<F, Fut>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.disarm();

        let token = CancellationToken::new();
        let loop_token = token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the immediate first tick; capture starts one period in
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tokio::select! {
                            () = tick() => {}
                            () = loop_token.cancelled() => break,
                        }
                    }
                    () = loop_token.cancelled() => break,
                }
            }
            tracing::debug!("capture loop stopped");
        });

        self.cancel = Some(token);
    }

    /// Stop the tick loop immediately; idempotent
    pub fn disarm(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
            tracing::debug!("capture scheduler disarmed");
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_on_period_until_disarmed() {
        let count = Arc::new(AtomicU32::new(0));
        let mut scheduler = CaptureScheduler::new();

        let tick_count = Arc::clone(&count);
        scheduler.arm(Duration::from_millis(200), move || {
            let tick_count = Arc::clone(&tick_count);
            async move {
                tick_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let before = count.load(Ordering::SeqCst);
        assert_eq!(before, 5);

        scheduler.disarm();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_previous_loop() {
        let count = Arc::new(AtomicU32::new(0));
        let mut scheduler = CaptureScheduler::new();

        for _ in 0..2 {
            let tick_count = Arc::clone(&count);
            scheduler.arm(Duration::from_millis(100), move || {
                let tick_count = Arc::clone(&tick_count);
                async move {
                    tick_count.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(550)).await;
        // Only the second loop is ticking
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }
}
