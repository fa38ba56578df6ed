//! Lifecycle of one comparative run: create the task, start one engine
//! per client and mode, stop them all together.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::engine::{PollingEngine, StreamingEngine, UpdateNotifier};
use crate::error::{RunError, StartPhase};
use crate::profile::TaskParameters;
use crate::state::{RunState, RunStatus};
use crate::transport::{FetchOutcome, SocketConnector, TaskApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub task: TaskParameters,
    pub poll_interval: Duration,
}

pub struct RunController {
    api: Arc<dyn TaskApi>,
    connector: Arc<dyn SocketConnector>,
    streaming: Vec<StreamingEngine>,
    polling: Vec<PollingEngine>,
}

impl RunController {
    #[must_use]
    pub fn new(api: Arc<dyn TaskApi>, connector: Arc<dyn SocketConnector>) -> Self {
        Self {
            api,
            connector,
            streaming: Vec::new(),
            polling: Vec::new(),
        }
    }

    /// Start a run against `state`.
    ///
    /// Any previous run is stopped and every client reset first. One task
    /// definition is created for both modes; only when both creation calls
    /// succeed are the engines built and started. Returns the task id.
    ///
    /// # Errors
    ///
    /// Returns the setup failure, which is also recorded in `state` with
    /// status `error`. No engine is started in that case.
    pub async fn run(
        &mut self,
        parameters: &RunParameters,
        state: &RunState,
        on_update: Option<UpdateNotifier>,
    ) -> Result<String, RunError> {
        self.stop();
        self.streaming.clear();
        self.polling.clear();
        state.reset();
        state.set_status(RunStatus::Starting);
        notify(on_update.as_ref());

        let task_id = match self.create_tasks(&parameters.task).await {
            Ok(task_id) => task_id,
            Err(err) => {
                warn!("Run setup failed: {}", err);
                state.fail(err.to_string());
                notify(on_update.as_ref());
                return Err(err);
            }
        };
        state.set_task_id(&task_id);
        state.set_status(RunStatus::Running);
        info!(
            "Task {} ({}) running with {} clients per mode",
            task_id,
            parameters.task.kind(),
            state.streaming.clients.len()
        );

        let kind = parameters.task.kind();
        self.streaming = state
            .streaming
            .clients
            .iter()
            .map(|client| {
                StreamingEngine::new(
                    task_id.clone(),
                    Arc::clone(&self.connector),
                    Arc::clone(client),
                    kind.streaming_hooks(on_update.clone()),
                )
            })
            .collect();
        self.polling = state
            .polling
            .clients
            .iter()
            .map(|client| {
                PollingEngine::new(
                    task_id.clone(),
                    Arc::clone(&self.api),
                    Arc::clone(client),
                    parameters.poll_interval,
                    kind.polling_hooks(on_update.clone()),
                )
            })
            .collect();
        for engine in &self.streaming {
            engine.start();
        }
        for engine in &self.polling {
            engine.start();
        }
        notify(on_update.as_ref());
        Ok(task_id)
    }

    /// Stop every engine of both modes. Safe at any time, repeatedly.
    pub fn stop(&self) {
        for engine in &self.streaming {
            engine.stop();
        }
        for engine in &self.polling {
            engine.stop();
        }
    }

    /// Number of streaming and polling engines of the current run.
    #[must_use]
    pub fn engine_counts(&self) -> (usize, usize) {
        (self.streaming.len(), self.polling.len())
    }

    async fn create_tasks(&self, task: &TaskParameters) -> Result<String, RunError> {
        let created = self.api.start_task(&task.start_body()).await;
        ensure_started(&created, StartPhase::Task)?;
        let task_id = created
            .data
            .as_ref()
            .and_then(|data| data.get("id"))
            .and_then(task_id_text)
            .ok_or(RunError::MissingTaskId)?;

        let polling = self
            .api
            .start_polling_task(&task.polling_body(&task_id))
            .await;
        ensure_started(&polling, StartPhase::PollingTask)?;
        Ok(task_id)
    }
}

fn task_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(_) | Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            None
        }
    }
}

fn ensure_started(outcome: &FetchOutcome, phase: StartPhase) -> Result<(), RunError> {
    if outcome.ok {
        return Ok(());
    }
    match outcome.transport_error.as_ref() {
        Some(message) if outcome.status_code == 0 => Err(RunError::StartUnreachable {
            phase,
            message: message.clone(),
        }),
        Some(_) | None => Err(RunError::StartFailed {
            phase,
            status: outcome.status_code,
        }),
    }
}

fn notify(on_update: Option<&UpdateNotifier>) {
    if let Some(on_update) = on_update {
        on_update();
    }
}
