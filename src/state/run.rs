use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::metrics::{self, Summary};

use super::client::{ClientState, SharedClient, shared_client, with_client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Streaming,
    Polling,
}

impl DeliveryMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Streaming => "streaming",
            DeliveryMode::Polling => "polling",
        }
    }

    /// Label of the message/request counter for this mode.
    #[must_use]
    pub const fn counter_label(self) -> &'static str {
        match self {
            DeliveryMode::Streaming => "WS messages",
            DeliveryMode::Polling => "HTTP requests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Done,
    Error,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Starting => "starting",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
        }
    }
}

/// Clients of one delivery mode.
#[derive(Debug)]
pub struct ModeState {
    pub mode: DeliveryMode,
    pub clients: Vec<SharedClient>,
}

impl ModeState {
    #[must_use]
    pub fn new(mode: DeliveryMode, count: usize) -> Self {
        let clients = (1..=count).map(shared_client).collect();
        Self { mode, clients }
    }

    pub fn reset(&self) {
        for client in &self.clients {
            with_client(client, ClientState::reset);
        }
    }

    /// Copies of every client, in id order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientState> {
        self.clients
            .iter()
            .map(|client| with_client(client, |state| state.clone()))
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        let snapshot = self.snapshot();
        metrics::aggregate(snapshot.iter().map(|state| &state.metrics))
    }

    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.clients
            .iter()
            .all(|client| with_client(client, |state| state.completed))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    pub task_id: Option<String>,
    pub status: RunStatus,
    pub error: Option<String>,
}

/// Process-wide state of one comparative run, passed explicitly to the
/// controller and engines.
#[derive(Debug)]
pub struct RunState {
    meta: Mutex<RunMeta>,
    pub streaming: ModeState,
    pub polling: ModeState,
}

impl RunState {
    #[must_use]
    pub fn new(clients_per_mode: usize) -> Self {
        Self {
            meta: Mutex::new(RunMeta::default()),
            streaming: ModeState::new(DeliveryMode::Streaming, clients_per_mode),
            polling: ModeState::new(DeliveryMode::Polling, clients_per_mode),
        }
    }

    /// Clear every client of both modes and the run metadata.
    pub fn reset(&self) {
        self.update_meta(|meta| *meta = RunMeta::default());
        self.streaming.reset();
        self.polling.reset();
    }

    #[must_use]
    pub fn meta(&self) -> RunMeta {
        self.meta
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.meta
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    pub fn set_status(&self, status: RunStatus) {
        self.update_meta(|meta| meta.status = status);
    }

    pub fn set_task_id(&self, task_id: &str) {
        self.update_meta(|meta| meta.task_id = Some(task_id.to_owned()));
    }

    /// Mark the run failed with a user-visible message.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update_meta(|meta| {
            meta.status = RunStatus::Error;
            meta.error = Some(message);
        });
    }

    /// Flip `running` to `done` once every client of both modes completed.
    pub fn refresh_status(&self) -> RunStatus {
        let all_done = self.streaming.all_completed() && self.polling.all_completed();
        let mut meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        if all_done && meta.status == RunStatus::Running {
            meta.status = RunStatus::Done;
        }
        meta.status
    }

    fn update_meta(&self, apply: impl FnOnce(&mut RunMeta)) {
        let mut meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut meta);
    }
}
