use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde_json::{Value, json};
use tokio::time::timeout;

use super::execute::{RunEnd, supervise};
use super::plan::{RunPlan, build_plan};
use crate::args::PushpollArgs;
use crate::controller::RunController;
use crate::error::{AppError, AppResult, RunError, StartPhase, TransportError};
use crate::profile::TaskParameters;
use crate::shutdown::shutdown_channel;
use crate::state::{RunState, RunStatus};
use crate::test_support::{TEST_TIMEOUT, run_async_test};
use crate::transport::{FetchOutcome, SocketConnector, SocketHandle, SocketHandlers, TaskApi};

fn plan_from(argv: &[&str]) -> AppResult<RunPlan> {
    let args = PushpollArgs::try_parse_from(argv)?;
    build_plan(&args)
}

fn outcome(ok: bool, status_code: u16, data: Value) -> FetchOutcome {
    FetchOutcome {
        ok,
        status_code,
        data: Some(data),
        byte_length: 24,
        elapsed_ms: Some(2),
        transport_error: None,
    }
}

/// Creates tasks and reports a fixed status forever.
struct FixedStatusApi {
    start_status: u16,
    state: &'static str,
}

#[async_trait]
impl TaskApi for FixedStatusApi {
    async fn start_task(&self, _body: &Value) -> FetchOutcome {
        let ok = self.start_status == 200;
        outcome(ok, self.start_status, json!({"id": "run-1"}))
    }

    async fn start_polling_task(&self, _body: &Value) -> FetchOutcome {
        outcome(true, 200, json!({}))
    }

    async fn get_status(&self, _task_id: &str) -> FetchOutcome {
        outcome(
            true,
            200,
            json!({"state": self.state, "progress": {"percentage": 0.4, "current": 2}}),
        )
    }

    async fn get_result(&self, _task_id: &str, _cursor: Option<u64>) -> FetchOutcome {
        outcome(true, 200, json!({"partial_result": "3.1", "done": false}))
    }
}

/// Sends `messages` on connect, then stays silent.
struct ScriptedSocket {
    messages: Vec<&'static str>,
}

impl SocketConnector for ScriptedSocket {
    fn connect(&self, _task_id: &str, handlers: SocketHandlers) -> SocketHandle {
        if let Some(on_message) = handlers.on_message.as_ref() {
            for message in &self.messages {
                on_message(message);
            }
        }
        SocketHandle::detached()
    }
}

fn scripted_controller(start_status: u16, state: &'static str, messages: Vec<&'static str>) -> RunController {
    RunController::new(
        Arc::new(FixedStatusApi {
            start_status,
            state,
        }),
        Arc::new(ScriptedSocket { messages }),
    )
}

fn quick_plan(max_duration: Option<Duration>) -> AppResult<RunPlan> {
    let mut plan = plan_from(&["pushpoll", "--clients", "2", "--poll-interval", "5ms"])?;
    plan.render_interval = Duration::from_millis(10);
    plan.max_duration = max_duration;
    Ok(plan)
}

#[test]
fn build_plan_derives_socket_base() -> AppResult<()> {
    let plan = plan_from(&["pushpoll", "--base-url", "https://demo.example:8443/api"])?;
    if plan.socket_base.as_str() != "wss://demo.example:8443/" {
        return Err(AppError::validation(format!(
            "Unexpected socket base: {}",
            plan.socket_base
        )));
    }
    if plan.parameters.poll_interval != Duration::from_millis(150) {
        return Err(AppError::validation("Expected the compute-pi poll default"));
    }

    let plan = plan_from(&[
        "pushpoll",
        "--ws-base-url",
        "ws://127.0.0.1:9001",
        "--kind",
        "document-analysis",
        "--document-url",
        "https://example.com/books/moby.txt",
        "--keywords",
        "whale",
    ])?;
    if plan.socket_base.as_str() != "ws://127.0.0.1:9001/" {
        return Err(AppError::validation("Explicit socket base ignored"));
    }
    match &plan.parameters.task {
        TaskParameters::DocumentAnalysis { document_path, .. }
            if document_path.as_deref() == Some("/data/books/moby.txt") => {}
        TaskParameters::DocumentAnalysis { .. } | TaskParameters::ComputePi { .. } => {
            return Err(AppError::validation(format!(
                "Unexpected task: {:?}",
                plan.parameters.task
            )));
        }
    }
    Ok(())
}

#[test]
fn build_plan_rejects_unusable_base_url() -> AppResult<()> {
    match plan_from(&["pushpoll", "--base-url", "ftp://host/api"]) {
        Err(AppError::Transport(TransportError::UnsupportedScheme { scheme })) if scheme == "ftp" => {}
        Err(err) => return Err(AppError::validation(format!("Unexpected error: {}", err))),
        Ok(_) => return Err(AppError::validation("Expected scheme error")),
    }
    if plan_from(&["pushpoll", "--base-url", "not a url"]).is_ok() {
        return Err(AppError::validation("Expected URL error"));
    }
    Ok(())
}

#[test]
fn supervise_finishes_when_every_client_completes() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(None)?;
        let state = RunState::new(plan.clients);
        let mut controller = scripted_controller(
            200,
            "COMPLETED",
            vec![r#"{"type":"task.result_chunk","payload":{"data":"3.14","is_last":true}}"#],
        );
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let end = timeout(
            TEST_TIMEOUT,
            supervise(&mut controller, &plan, &state, shutdown_rx),
        )
        .await
        .map_err(|err| AppError::validation(format!("Run did not finish: {}", err)))??;
        controller.stop();

        if end != RunEnd::Finished || state.status() != RunStatus::Done {
            return Err(AppError::validation(format!("Unexpected end: {:?}", end)));
        }
        Ok(())
    })
}

#[test]
fn supervise_stops_at_the_deadline() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(Some(Duration::from_millis(60)))?;
        let state = RunState::new(plan.clients);
        let mut controller = scripted_controller(200, "RUNNING", Vec::new());
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let end = timeout(
            TEST_TIMEOUT,
            supervise(&mut controller, &plan, &state, shutdown_rx),
        )
        .await
        .map_err(|err| AppError::validation(format!("Deadline did not fire: {}", err)))??;
        controller.stop();

        if end != RunEnd::DeadlineExceeded {
            return Err(AppError::validation(format!("Unexpected end: {:?}", end)));
        }
        let meta = state.meta();
        if meta.status != RunStatus::Error || meta.error.as_deref() != Some("deadline exceeded") {
            return Err(AppError::validation("Deadline not recorded"));
        }
        Ok(())
    })
}

#[test]
fn supervise_stops_on_shutdown() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(None)?;
        let state = RunState::new(plan.clients);
        let mut controller = scripted_controller(200, "RUNNING", Vec::new());
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(shutdown_tx.send(()));
        });
        let end = timeout(
            TEST_TIMEOUT,
            supervise(&mut controller, &plan, &state, shutdown_rx),
        )
        .await
        .map_err(|err| AppError::validation(format!("Shutdown was ignored: {}", err)))??;
        controller.stop();
        sender.await?;

        if end != RunEnd::Cancelled || state.meta().error.as_deref() != Some("cancelled") {
            return Err(AppError::validation(format!("Unexpected end: {:?}", end)));
        }
        Ok(())
    })
}

#[test]
fn supervise_reports_setup_failures() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(None)?;
        let state = RunState::new(plan.clients);
        let mut controller = scripted_controller(500, "RUNNING", Vec::new());
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let outcome = supervise(&mut controller, &plan, &state, shutdown_rx).await;
        if !matches!(
            outcome,
            Err(RunError::StartFailed {
                phase: StartPhase::Task,
                status: 500,
            })
        ) {
            return Err(AppError::validation(format!("Unexpected outcome: {:?}", outcome)));
        }
        if state.status() != RunStatus::Error {
            return Err(AppError::validation("Expected error status"));
        }
        Ok(())
    })
}

/// Task creation that never answers.
struct HangingApi;

#[async_trait]
impl TaskApi for HangingApi {
    async fn start_task(&self, _body: &Value) -> FetchOutcome {
        std::future::pending::<FetchOutcome>().await
    }

    async fn start_polling_task(&self, _body: &Value) -> FetchOutcome {
        std::future::pending::<FetchOutcome>().await
    }

    async fn get_status(&self, _task_id: &str) -> FetchOutcome {
        outcome(true, 200, json!({"state": "RUNNING"}))
    }

    async fn get_result(&self, _task_id: &str, _cursor: Option<u64>) -> FetchOutcome {
        outcome(true, 200, json!({}))
    }
}

fn hanging_controller() -> RunController {
    RunController::new(
        Arc::new(HangingApi),
        Arc::new(ScriptedSocket {
            messages: Vec::new(),
        }),
    )
}

#[test]
fn deadline_applies_while_task_creation_hangs() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(Some(Duration::from_millis(50)))?;
        let state = RunState::new(plan.clients);
        let mut controller = hanging_controller();
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let end = timeout(
            TEST_TIMEOUT,
            supervise(&mut controller, &plan, &state, shutdown_rx),
        )
        .await
        .map_err(|err| AppError::validation(format!("Hung creation ignored the deadline: {}", err)))??;

        if end != RunEnd::DeadlineExceeded || controller.engine_counts() != (0, 0) {
            return Err(AppError::validation(format!("Unexpected end: {:?}", end)));
        }
        let meta = state.meta();
        if meta.status != RunStatus::Error || meta.error.as_deref() != Some("deadline exceeded") {
            return Err(AppError::validation(format!("Unexpected run meta {:?}", meta)));
        }
        Ok(())
    })
}

#[test]
fn shutdown_applies_while_task_creation_hangs() -> AppResult<()> {
    run_async_test(async {
        let plan = quick_plan(None)?;
        let state = RunState::new(plan.clients);
        let mut controller = hanging_controller();
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(shutdown_tx.send(()));
        });
        let end = timeout(
            TEST_TIMEOUT,
            supervise(&mut controller, &plan, &state, shutdown_rx),
        )
        .await
        .map_err(|err| AppError::validation(format!("Hung creation ignored shutdown: {}", err)))??;
        sender.await?;

        if end != RunEnd::Cancelled || state.meta().error.as_deref() != Some("cancelled") {
            return Err(AppError::validation(format!("Unexpected end: {:?}", end)));
        }
        Ok(())
    })
}
