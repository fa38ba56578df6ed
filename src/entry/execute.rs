use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::args::OutputFormat;
use crate::controller::RunController;
use crate::engine::UpdateNotifier;
use crate::error::{AppError, AppResult, RunError};
use crate::report::{ComparisonReport, progress_line};
use crate::shutdown::{ShutdownReceiver, setup_signal_shutdown_handler, shutdown_channel};
use crate::state::{RunState, RunStatus};
use crate::transport::{ErrorCallback, HttpTaskApi, HttpTransport, WsConnector};

use super::plan::RunPlan;

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunEnd {
    Finished,
    Cancelled,
    DeadlineExceeded,
}

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    let on_error: ErrorCallback = Arc::new(|url: &Url, message: &str| {
        warn!("Request to {} failed: {}", url, message);
    });
    let transport = HttpTransport::new()
        .map_err(AppError::transport)?
        .with_error_callback(on_error);
    let api = HttpTaskApi::new(transport, &plan.base_url, &plan.kind().routes())?;
    let connector = WsConnector::new(plan.socket_base.clone(), plan.keepalive);
    let mut controller = RunController::new(Arc::new(api), Arc::new(connector));
    let state = RunState::new(plan.clients);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let end = supervise(&mut controller, &plan, &state, shutdown_rx).await;
    controller.stop();
    drop(shutdown_tx.send(()));
    drop(signal_handle.await);

    print_report(&plan, &state)?;
    match end {
        Ok(RunEnd::Finished) => Ok(()),
        Ok(RunEnd::Cancelled) => Err(AppError::run(RunError::Cancelled)),
        Ok(RunEnd::DeadlineExceeded) => Err(AppError::run(RunError::DeadlineExceeded)),
        Err(err) => Err(AppError::run(err)),
    }
}

/// Start the run and wait until every client completed or the run is cut
/// short. Shutdown and `max_duration` are honoured during task creation too.
pub(crate) async fn supervise(
    controller: &mut RunController,
    plan: &RunPlan,
    state: &RunState,
    mut shutdown_rx: ShutdownReceiver,
) -> Result<RunEnd, RunError> {
    let wake = Arc::new(Notify::new());
    let notifier: UpdateNotifier = {
        let wake = Arc::clone(&wake);
        Arc::new(move || wake.notify_one())
    };

    let deadline = plan
        .max_duration
        .and_then(|max_duration| Instant::now().checked_add(max_duration));

    let task_id = tokio::select! {
        started = controller.run(&plan.parameters, state, Some(notifier)) => started?,
        _ = shutdown_rx.recv() => return Ok(cancel(state)),
        () = sleep_until_deadline(deadline) => return Ok(expire(state)),
    };
    debug!("Supervising task {}", task_id);

    let mut render = tokio::time::interval(plan.render_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = render.tick() => {
                info!("{}", progress_line(state));
            }
            () = wake.notified() => {}
            _ = shutdown_rx.recv() => return Ok(cancel(state)),
            () = sleep_until_deadline(deadline) => return Ok(expire(state)),
        }

        if state.refresh_status() == RunStatus::Done {
            info!("{}", progress_line(state));
            return Ok(RunEnd::Finished);
        }
    }
}

fn cancel(state: &RunState) -> RunEnd {
    warn!("Interrupted; stopping all clients");
    state.fail(RunError::Cancelled.to_string());
    RunEnd::Cancelled
}

fn expire(state: &RunState) -> RunEnd {
    warn!("Run exceeded its maximum duration; stopping all clients");
    state.fail(RunError::DeadlineExceeded.to_string());
    RunEnd::DeadlineExceeded
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn print_report(plan: &RunPlan, state: &RunState) -> AppResult<()> {
    let report = ComparisonReport::from_state(plan.kind(), state);
    match plan.output {
        OutputFormat::Text => {
            for line in report.lines(plan.per_client) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
