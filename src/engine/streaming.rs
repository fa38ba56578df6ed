use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::metrics::record_latency;
use crate::payload::{SocketEvent, apply_status, decode_envelope, server_latency_ms};
use crate::state::{SharedClient, with_client, with_client_in};
use crate::transport::{SocketConnector, SocketHandle, SocketHandlers, elapsed_ms};

use super::hooks::{EnginePhase, StreamingHooks, notify, phase_of};

/// Socket-driven client: every inbound message is one update.
pub struct StreamingEngine {
    inner: Arc<StreamingInner>,
    connector: Arc<dyn SocketConnector>,
    socket: Mutex<Option<SocketHandle>>,
}

struct StreamingInner {
    task_id: String,
    client: SharedClient,
    generation: u64,
    hooks: StreamingHooks,
    started_at: OnceLock<Instant>,
    stopped: AtomicBool,
}

impl StreamingEngine {
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        connector: Arc<dyn SocketConnector>,
        client: SharedClient,
        hooks: StreamingHooks,
    ) -> Self {
        let generation = with_client(&client, |state| state.generation);
        Self {
            inner: Arc::new(StreamingInner {
                task_id: task_id.into(),
                client,
                generation,
                hooks,
                started_at: OnceLock::new(),
                stopped: AtomicBool::new(false),
            }),
            connector,
            socket: Mutex::new(None),
        }
    }

    /// Open the socket. Ignored after `stop` or a second time.
    pub fn start(&self) {
        if self.inner.stopped.load(Ordering::Acquire) || self.inner.started_at.get().is_some() {
            return;
        }
        self.inner.started_at.get_or_init(Instant::now);

        let id = with_client(&self.inner.client, |state| state.id);
        let receiver = Arc::clone(&self.inner);
        let handlers = SocketHandlers {
            on_message: Some(Arc::new(move |raw: &str| receiver.handle_message(raw))),
            on_open: Some(Arc::new(move || debug!("Streaming client {} connected", id))),
            on_error: Some(Arc::new(move |message: &str| {
                warn!("Streaming client {} socket error: {}", id, message);
            })),
            on_close: Some(Arc::new(move || debug!("Streaming client {} socket closed", id))),
        };
        let handle = self.connector.connect(&self.inner.task_id, handlers);
        *self.socket.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Release the socket; later messages are ignored. Idempotent, and safe
    /// before `start` or after completion.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!("Streaming engine for task {} stopped", self.inner.task_id);
        }
        let socket = self
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut socket) = socket {
            socket.close();
        }
    }

    /// Process one raw socket message as if it had just arrived.
    pub fn handle_message(&self, raw: &str) {
        self.inner.handle_message(raw);
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

    /// Whether a socket handle is currently held.
    #[must_use]
    pub fn has_socket(&self) -> bool {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for StreamingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl StreamingInner {
    fn handle_message(&self, raw: &str) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let elapsed = self.started_at.get().map_or(0, |start| elapsed_ms(*start));
        let handled = with_client_in(&self.client, self.generation, |state| {
            state
                .metrics
                .record_transfer(u64::try_from(raw.len()).unwrap_or(u64::MAX));
            state.metrics.mark_first_update(elapsed);
            if state.completed {
                return true;
            }
            let Some(event) = decode_envelope(raw) else {
                trace!("Dropping malformed socket payload for task {}", self.task_id);
                return false;
            };
            match event {
                SocketEvent::Status(Some(update)) => {
                    apply_status(state, &update);
                    if let Some(sent_ts) = update.server_sent_ts {
                        let now_ms = chrono::Utc::now().timestamp_millis();
                        record_latency(&mut state.metrics, Some(server_latency_ms(sent_ts, now_ms)));
                    }
                }
                SocketEvent::Status(None) => {}
                SocketEvent::ResultChunk(chunk) => {
                    if let Some(on_result_chunk) = self.hooks.on_result_chunk.as_ref() {
                        on_result_chunk(&chunk, state);
                    }
                    if chunk.is_last && state.latch_completed(elapsed) {
                        debug!("Streaming client {} received the last chunk", state.id);
                    }
                }
                SocketEvent::FullResult(payload) => {
                    if let Some(on_result) = self.hooks.on_result.as_ref() {
                        on_result(&payload, state);
                    }
                    if state.latch_completed(elapsed) {
                        debug!("Streaming client {} received the full result", state.id);
                    }
                }
                SocketEvent::Unknown(kind) => {
                    trace!("Ignoring socket message type {:?}", kind);
                }
            }
            true
        });
        if handled == Some(true) {
            notify(self.hooks.on_update.as_ref());
        }
    }
}
