use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::trace;

/// Shortest period the timer accepts.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Fixed-period scheduler that never runs two ticks at once.
///
/// A tick that comes due while the previous one is still running is
/// dropped, not queued. The first tick fires immediately on `start`.
pub struct TickScheduler {
    period: Duration,
    in_flight: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TickScheduler {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            in_flight: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    /// Begin ticking. Has no effect once stopped or when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() || self.is_stopped() {
            return;
        }
        let period = self.period;
        let in_flight = Arc::clone(&self.in_flight);
        let stopped = Arc::clone(&self.stopped);
        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                if in_flight.swap(true, Ordering::AcqRel) {
                    trace!("Previous tick still in flight, skipping");
                    continue;
                }
                let guard = InFlightGuard(Arc::clone(&in_flight));
                let work = tick();
                tokio::spawn(async move {
                    let _in_flight = guard;
                    work.await;
                });
            }
        }));
    }

    /// Cancel the timer. A tick already running is left to finish.
    /// Idempotent, and safe before `start`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a timer task exists and has not been cancelled.
    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
