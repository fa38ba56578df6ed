use std::sync::Arc;

use serde_json::Value;

use crate::engine::{PollingHooks, StopContext, StreamingHooks, TickPhase, UpdateNotifier};
use crate::payload::{ChunkData, ResultChunk, ResultPage};
use crate::state::ClientState;
use crate::transport::TaskRoutes;

pub(super) const ROUTES: TaskRoutes = TaskRoutes {
    start: &["calculate_pi"],
    start_polling: &["naive", "calculate_pi"],
    status: &["naive", "check_progress"],
    result: &["naive", "task_result"],
};

pub(super) fn streaming_hooks(on_update: Option<UpdateNotifier>) -> StreamingHooks {
    StreamingHooks {
        on_result_chunk: Some(Arc::new(append_digits)),
        on_result: Some(Arc::new(replace_with_full_result)),
        on_update,
    }
}

pub(super) fn polling_hooks(on_update: Option<UpdateNotifier>) -> PollingHooks {
    PollingHooks {
        status_progressed: Some(Arc::new(digits_flowing)),
        on_result: Some(Arc::new(replace_partial_result)),
        should_stop: Some(Arc::new(should_stop)),
        on_update,
    }
}

/// Digit chunks are strings, or arrays of strings, concatenated verbatim.
fn append_digits(chunk: &ResultChunk, state: &mut ClientState) {
    match &chunk.data {
        ChunkData::Text(text) => state.result.push_str(text),
        ChunkData::Items(items) => {
            for item in items {
                match item {
                    Value::String(text) => state.result.push_str(text),
                    Value::Null => {}
                    Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                        state.result.push_str(&item.to_string());
                    }
                }
            }
        }
        ChunkData::Empty => {}
    }
}

fn replace_with_full_result(payload: &Value, state: &mut ClientState) {
    if let Some(text) = payload.get("result").and_then(Value::as_str) {
        text.clone_into(&mut state.result);
    }
}

/// The task only counts as started once it is running and has produced
/// at least one unit.
fn digits_flowing(status: &Value, _state: &ClientState) -> bool {
    let running = status.get("state").and_then(Value::as_str) == Some("RUNNING");
    let current = status
        .get("progress")
        .and_then(|progress| progress.get("current"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    running && current > 0.0
}

/// The result endpoint returns the whole digit string so far.
fn replace_partial_result(page: &ResultPage, state: &mut ClientState) -> bool {
    let Some(text) = page.partial_result.as_deref() else {
        return false;
    };
    let fresh = !text.is_empty() && text != state.result;
    text.clone_into(&mut state.result);
    fresh
}

fn should_stop(context: &StopContext<'_>) -> bool {
    match context.phase {
        TickPhase::Status => context.status.is_not_found() || context.state.status.is_terminal(),
        TickPhase::Result => context.result.is_some_and(|result| {
            result.is_not_found()
                || result
                    .ok_data()
                    .is_some_and(|data| ResultPage::from_value(data).done)
        }),
    }
}
