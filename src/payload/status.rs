use serde_json::Value;

use crate::state::{ClientState, TaskStatus};

use super::value_as_ms;

/// Metadata key carrying server CPU time on the socket channel.
pub const CPU_KEY_STREAMING: &str = "server_cpu_ms_ws";
/// Metadata key carrying server CPU time on the polling endpoints.
pub const CPU_KEY_POLLING: &str = "server_cpu_ms_naive";

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub state: TaskStatus,
    /// Fraction in `[0.0, 1.0]`.
    pub progress: f64,
    /// Units completed so far (`progress.current`), zero when absent.
    pub current: u64,
    pub metrics: Option<Value>,
    pub server_cpu_ms: Option<u64>,
    /// Server send time in seconds since the Unix epoch.
    pub server_sent_ts: Option<f64>,
}

/// Map a status payload into a [`StatusUpdate`].
///
/// `cpu_key` selects which metadata field carries server CPU time for the
/// channel the payload arrived on.
#[must_use]
pub fn status_from_value(value: &Value, cpu_key: &str) -> StatusUpdate {
    let progress = value.get("progress");
    let metadata = value.get("metadata");
    let state = value
        .get("state")
        .and_then(Value::as_str)
        .map_or(TaskStatus::Running, TaskStatus::from_server);
    StatusUpdate {
        state,
        progress: normalize_percentage(
            progress
                .and_then(|progress| progress.get("percentage"))
                .and_then(Value::as_f64),
        ),
        current: progress
            .and_then(|progress| progress.get("current"))
            .and_then(value_as_ms)
            .unwrap_or(0),
        metrics: value.get("metrics").filter(|metrics| !metrics.is_null()).cloned(),
        server_cpu_ms: metadata
            .and_then(|metadata| metadata.get(cpu_key))
            .and_then(value_as_ms),
        server_sent_ts: metadata
            .and_then(|metadata| metadata.get("server_sent_ts"))
            .and_then(Value::as_f64)
            .filter(|ts| ts.is_finite() && *ts > 0.0),
    }
}

/// Canonicalize a progress value to a fraction.
///
/// Values above `1.0` are read as a 0-100 percentage. The result is always
/// clamped to `[0.0, 1.0]`; a missing value means no progress.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "percentage to fraction conversion")]
pub fn normalize_percentage(raw: Option<f64>) -> f64 {
    let Some(value) = raw.filter(|value| value.is_finite()) else {
        return 0.0;
    };
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    fraction.clamp(0.0, 1.0)
}

/// Wall-clock delivery latency of a message the server stamped at
/// `sent_ts_secs`. Clock skew that would make it negative yields zero.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "server timestamps are fractional seconds"
)]
pub fn server_latency_ms(sent_ts_secs: f64, now_ms: i64) -> u64 {
    let latency = now_ms as f64 - sent_ts_secs * 1000.0;
    if !latency.is_finite() || latency <= 0.0 {
        return 0;
    }
    latency.round() as u64
}

/// Fold a status update into a client: progress, lifecycle, display
/// metrics and server CPU time. Latency is left to the caller since only
/// the socket channel carries a send timestamp.
pub fn apply_status(state: &mut ClientState, update: &StatusUpdate) {
    state.progress = update.progress;
    state.status = update.state;
    state.status_metrics.clone_from(&update.metrics);
    if let Some(cpu) = update.server_cpu_ms {
        state.metrics.server_cpu_ms = cpu;
    }
}
