use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::metrics::record_latency;
use crate::payload::{CPU_KEY_POLLING, ResultPage, apply_status, status_from_value};
use crate::state::{ClientState, SharedClient, with_client, with_client_in};
use crate::transport::{FetchOutcome, TaskApi, elapsed_ms};

use super::hooks::{EnginePhase, PollingHooks, StopContext, TickPhase, notify, phase_of};
use super::tick::TickScheduler;

/// Timer-driven client: each tick fetches status, then results.
pub struct PollingEngine {
    inner: Arc<PollingInner>,
}

struct PollingInner {
    task_id: String,
    api: Arc<dyn TaskApi>,
    client: SharedClient,
    /// Client generation this engine was built for.
    generation: u64,
    hooks: PollingHooks,
    scheduler: TickScheduler,
    started_at: OnceLock<Instant>,
    stopped: AtomicBool,
}

impl PollingEngine {
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        api: Arc<dyn TaskApi>,
        client: SharedClient,
        period: Duration,
        hooks: PollingHooks,
    ) -> Self {
        let generation = with_client(&client, |state| state.generation);
        Self {
            inner: Arc::new(PollingInner {
                task_id: task_id.into(),
                api,
                client,
                generation,
                hooks,
                scheduler: TickScheduler::new(period),
                started_at: OnceLock::new(),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Start ticking; the first tick runs immediately. Must be called from
    /// within a tokio runtime. Ignored after `stop` or a second time.
    pub fn start(&self) {
        if self.inner.stopped.load(Ordering::Acquire) || self.inner.started_at.get().is_some() {
            return;
        }
        self.inner.started_at.get_or_init(Instant::now);
        debug!("Polling client {} started", self.client_id());
        let weak: Weak<PollingInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(move || {
            let inner = weak.upgrade();
            async move {
                if let Some(inner) = inner {
                    inner.tick().await;
                }
            }
        });
    }

    /// Cancel the timer. A tick already in flight finishes normally.
    /// Idempotent, and safe before `start` or after completion.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!("Polling client {} stopped", self.client_id());
        }
        self.inner.scheduler.stop();
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        let completed = with_client(&self.inner.client, |state| state.completed);
        phase_of(
            self.inner.started_at.get().is_some(),
            self.inner.stopped.load(Ordering::Acquire),
            completed,
        )
    }

    /// Whether the tick timer is still alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.inner.scheduler.has_timer() && !self.inner.scheduler.is_stopped()
    }

    fn client_id(&self) -> usize {
        with_client(&self.inner.client, |state| state.id)
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        self.inner.scheduler.stop();
    }
}

impl PollingInner {
    fn elapsed(&self) -> u64 {
        self.started_at.get().map_or(0, |start| elapsed_ms(*start))
    }

    /// One status fetch, then one result fetch. Writes land only while the
    /// client is still in this engine's generation; a tick that outlives
    /// its run drops what it fetched.
    async fn tick(&self) {
        let active = self.with_own_client(|state| !state.completed);
        if active != Some(true) {
            return;
        }

        let status = self.api.get_status(&self.task_id).await;
        let Some(finished) = self.with_own_client(|state| {
            record_fetch(state, &status);
            if let Some(data) = status.ok_data() {
                apply_status(state, &status_from_value(data, CPU_KEY_POLLING));
                let progressed = match self.hooks.status_progressed.as_ref() {
                    Some(probe) => probe(data, state),
                    None => state.progress > 0.0,
                };
                if progressed {
                    state.metrics.mark_first_update(self.elapsed());
                }
            }
            let done = self.should_stop(&StopContext {
                phase: TickPhase::Status,
                status: &status,
                result: None,
                state,
            });
            if done {
                state.latch_completed(self.elapsed());
            }
            done
        }) else {
            return;
        };
        if finished {
            self.finish();
            return;
        }

        let Some(cursor) = self.with_own_client(|state| state.last_cursor) else {
            return;
        };
        let result = self.api.get_result(&self.task_id, cursor).await;
        let Some(finished) = self.with_own_client(|state| {
            record_fetch(state, &result);
            if let Some(data) = result.ok_data() {
                let page = ResultPage::from_value(data);
                if let Some(cpu) = page.server_cpu_ms {
                    state.metrics.server_cpu_ms = cpu;
                }
                let fresh = self
                    .hooks
                    .on_result
                    .as_ref()
                    .is_some_and(|on_result| on_result(&page, state));
                if let Some(last_id) = page.last_id {
                    state.advance_cursor(last_id);
                }
                if fresh {
                    state.metrics.mark_first_update(self.elapsed());
                }
            }
            let done = self.should_stop(&StopContext {
                phase: TickPhase::Result,
                status: &status,
                result: Some(&result),
                state,
            });
            if done {
                state.latch_completed(self.elapsed());
            }
            done
        }) else {
            return;
        };
        if finished {
            self.finish();
            return;
        }
        notify(self.hooks.on_update.as_ref());
    }

    fn with_own_client<R>(&self, apply: impl FnOnce(&mut ClientState) -> R) -> Option<R> {
        with_client_in(&self.client, self.generation, apply)
    }

    fn should_stop(&self, context: &StopContext<'_>) -> bool {
        self.hooks
            .should_stop
            .as_ref()
            .is_some_and(|should_stop| should_stop(context))
    }

    fn finish(&self) {
        debug!("Polling client for task {} reached a terminal state", self.task_id);
        self.scheduler.stop();
        notify(self.hooks.on_update.as_ref());
    }
}

fn record_fetch(state: &mut ClientState, outcome: &FetchOutcome) {
    state.metrics.record_transfer(outcome.byte_length);
    record_latency(&mut state.metrics, outcome.elapsed_ms);
}
