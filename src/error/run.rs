use thiserror::Error;

/// Which creation call of a run failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    #[error("task")]
    Task,
    #[error("polling task")]
    PollingTask,
}

/// Setup failures that halt a run before any engine starts, and the two
/// ways a supervised run is cut short.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Failed to start {phase} ({status})")]
    StartFailed { phase: StartPhase, status: u16 },
    #[error("Failed to start {phase}: {message}")]
    StartUnreachable { phase: StartPhase, message: String },
    #[error("Task creation response did not carry an id.")]
    MissingTaskId,
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}
