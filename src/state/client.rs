use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::metrics::ClientMetrics;

/// Remote task lifecycle as seen by one client. Mirrors the task, not the
/// health of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Parse a server-side state name. Anything non-terminal (including
    /// `QUEUED` and unknown names) counts as running.
    #[must_use]
    pub fn from_server(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            "CANCELLED" | "CANCELED" => TaskStatus::Cancelled,
            "IDLE" => TaskStatus::Idle,
            _ => TaskStatus::Running,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Idle => "IDLE",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientState {
    /// 1-based identity within its mode.
    pub id: usize,
    pub status: TaskStatus,
    /// Fraction in `[0.0, 1.0]`.
    pub progress: f64,
    pub result: String,
    /// Last server-reported progress metrics (ETA, units sent...), display only.
    pub status_metrics: Option<serde_json::Value>,
    /// Terminal latch. Set once per run, never unset until [`ClientState::reset`].
    pub completed: bool,
    /// Exclusive cursor of the last incremental result item seen.
    pub last_cursor: Option<u64>,
    pub metrics: ClientMetrics,
    /// Run generation; bumped by every reset so work from an earlier run
    /// can tell it no longer owns this client.
    #[serde(skip)]
    pub generation: u64,
}

impl ClientState {
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            status: TaskStatus::Idle,
            progress: 0.0,
            result: String::new(),
            status_metrics: None,
            completed: false,
            last_cursor: None,
            metrics: ClientMetrics::default(),
            generation: 0,
        }
    }

    /// Clear everything but the id and move to the next generation.
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::new(self.id);
        self.generation = generation;
    }

    /// Latch completion and freeze the total time.
    ///
    /// Returns `false` (and changes nothing) when already completed.
    pub fn latch_completed(&mut self, elapsed_ms: u64) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.metrics.total_ms = Some(elapsed_ms);
        true
    }

    /// Move the cursor forward; older or equal values are ignored.
    pub fn advance_cursor(&mut self, cursor: u64) {
        match self.last_cursor {
            Some(current) if current >= cursor => {}
            Some(_) | None => self.last_cursor = Some(cursor),
        }
    }

    /// Append an entry to the result buffer, newline separated.
    pub fn append_line(&mut self, entry: &str) {
        if entry.is_empty() {
            return;
        }
        if !self.result.is_empty() {
            self.result.push('\n');
        }
        self.result.push_str(entry);
    }
}

pub type SharedClient = Arc<Mutex<ClientState>>;

#[must_use]
pub fn shared_client(id: usize) -> SharedClient {
    Arc::new(Mutex::new(ClientState::new(id)))
}

/// Run `apply` with exclusive access to a client.
///
/// The lock is never held across an await point; a poisoned lock is
/// recovered because the state stays structurally valid.
pub fn with_client<R>(client: &SharedClient, apply: impl FnOnce(&mut ClientState) -> R) -> R {
    let mut guard = client.lock().unwrap_or_else(PoisonError::into_inner);
    apply(&mut guard)
}

/// Like [`with_client`], but only while the client is still in
/// `generation`. Returns `None` once a reset has moved it on.
pub fn with_client_in<R>(
    client: &SharedClient,
    generation: u64,
    apply: impl FnOnce(&mut ClientState) -> R,
) -> Option<R> {
    let mut guard = client.lock().unwrap_or_else(PoisonError::into_inner);
    (guard.generation == generation).then(|| apply(&mut guard))
}
