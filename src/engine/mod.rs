//! Per-client state machines for both delivery modes.
//!
//! An engine mutates only the one client it was built for. It reports
//! every mutation through its `on_update` hook and owns its transport
//! handle (socket or tick timer) exclusively.
mod hooks;
mod polling;
mod streaming;
mod tick;


pub use hooks::{
    ChunkApplier, EnginePhase, FullResultApplier, PollingHooks, ResultApplier, StatusProbe,
    StopContext, StopPredicate, StreamingHooks, TickPhase, UpdateNotifier,
};
pub use polling::PollingEngine;
pub use streaming::StreamingEngine;
pub use tick::TickScheduler;
