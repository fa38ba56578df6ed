use std::sync::Arc;

use serde_json::Value;

use crate::payload::{ResultChunk, ResultPage};
use crate::state::ClientState;
use crate::transport::FetchOutcome;

/// Called after every state mutation so the renderer may redraw.
pub type UpdateNotifier = Arc<dyn Fn() + Send + Sync>;
/// Appends one streamed result chunk to the client.
pub type ChunkApplier = Arc<dyn Fn(&ResultChunk, &mut ClientState) + Send + Sync>;
/// Handles a non-chunked full result payload.
pub type FullResultApplier = Arc<dyn Fn(&Value, &mut ClientState) + Send + Sync>;
/// Decides whether an applied status payload counts as the first update.
pub type StatusProbe = Arc<dyn Fn(&Value, &ClientState) -> bool + Send + Sync>;
/// Applies one result page; returns `true` when it carried new content.
pub type ResultApplier = Arc<dyn Fn(&ResultPage, &mut ClientState) -> bool + Send + Sync>;
/// Decides whether a polling client is done after a fetch.
pub type StopPredicate = Arc<dyn Fn(&StopContext<'_>) -> bool + Send + Sync>;

/// Optional hook points of a streaming engine.
///
/// * `on_result_chunk`: missing means chunks are counted but not kept.
/// * `on_result`: missing means a full result only latches completion.
/// * `on_update`: missing means nobody is told about mutations.
#[derive(Clone, Default)]
pub struct StreamingHooks {
    pub on_result_chunk: Option<ChunkApplier>,
    pub on_result: Option<FullResultApplier>,
    pub on_update: Option<UpdateNotifier>,
}

/// Optional hook points of a polling engine.
///
/// * `status_progressed`: missing means "progress is above zero".
/// * `on_result`: missing means result bodies are fetched and measured,
///   never applied.
/// * `should_stop`: missing means only [`crate::engine::PollingEngine::stop`]
///   ends the loop.
/// * `on_update`: as for streaming.
#[derive(Clone, Default)]
pub struct PollingHooks {
    pub status_progressed: Option<StatusProbe>,
    pub on_result: Option<ResultApplier>,
    pub should_stop: Option<StopPredicate>,
    pub on_update: Option<UpdateNotifier>,
}

/// Which fetch of a polling tick just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Status,
    Result,
}

/// Everything a stop predicate may look at.
pub struct StopContext<'tick> {
    pub phase: TickPhase,
    pub status: &'tick FetchOutcome,
    /// Present only in the result phase.
    pub result: Option<&'tick FetchOutcome>,
    pub state: &'tick ClientState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    NotStarted,
    Active,
    Completed,
    Stopped,
}

pub(super) fn notify(on_update: Option<&UpdateNotifier>) {
    if let Some(on_update) = on_update {
        on_update();
    }
}

pub(super) fn phase_of(started: bool, stopped: bool, completed: bool) -> EnginePhase {
    if completed {
        EnginePhase::Completed
    } else if stopped {
        EnginePhase::Stopped
    } else if started {
        EnginePhase::Active
    } else {
        EnginePhase::NotStarted
    }
}
