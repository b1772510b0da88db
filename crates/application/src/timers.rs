//! Periodic session timers.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owns the cancellation token shared by the timers of one activation.
///
/// Each `start()` creates a fresh token, so `stop()` followed by `start()`
/// works for suspend and resume.
pub(crate) struct TimerHandle {
    cancel_token: Mutex<CancellationToken>,
}

impl TimerHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel_token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Cancel any previous timers and return a token for the new set.
    pub(crate) fn start(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let child = token.child_token();

        let mut current = self.cancel_token.lock().expect("timer mutex poisoned");
        current.cancel();
        *current = token;
        child
    }

    pub(crate) fn stop(&self) {
        self.cancel_token
            .lock()
            .expect("timer mutex poisoned")
            .cancel();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Ok(token) = self.cancel_token.lock() {
            token.cancel();
        }
    }
}

/// Run `tick` every `period`, first at `first_tick`, until `token` is
/// cancelled or `tick` returns `None`.
pub(crate) fn spawn_periodic<F, Fut>(
    name: &'static str,
    token: CancellationToken,
    first_tick: Instant,
    period: Duration,
    mut tick: F,
) where
    F: FnMut() -> Option<Fut> + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(timer = name, period_ms = period.as_millis() as u64, "timer started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            match tick() {
                Some(work) => work.await,
                None => break,
            }
        }

        tracing::debug!(timer = name, "timer stopped");
    });
}
