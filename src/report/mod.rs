//! Comparison report handed to the operator at the end of a run, plus the
//! one-line live progress summary.
mod format;


use serde::Serialize;

use crate::metrics::Summary;
use crate::profile::TaskKind;
use crate::state::{ClientState, DeliveryMode, ModeState, RunState, RunStatus};

pub use format::{
    MISSING, format_bytes, format_ms, format_optional_ms, format_optional_sec, format_sec,
};

#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub id: usize,
    pub status: &'static str,
    pub progress_percent: u64,
    pub completed: bool,
    pub result_length: usize,
    pub first_update_ms: Option<u64>,
    pub total_ms: Option<u64>,
}

impl ClientReport {
    fn from_state(state: &ClientState) -> Self {
        Self {
            id: state.id,
            status: state.status.as_str(),
            progress_percent: progress_percent(state.progress),
            completed: state.completed,
            result_length: state.result.chars().count(),
            first_update_ms: state.metrics.first_update_ms,
            total_ms: state.metrics.total_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeReport {
    pub mode: DeliveryMode,
    pub counter_label: &'static str,
    pub completed_clients: usize,
    pub summary: Summary,
    pub clients: Vec<ClientReport>,
}

impl ModeReport {
    #[must_use]
    pub fn from_mode(mode: &ModeState) -> Self {
        let snapshot = mode.snapshot();
        Self {
            mode: mode.mode,
            counter_label: mode.mode.counter_label(),
            completed_clients: snapshot.iter().filter(|client| client.completed).count(),
            summary: mode.summary(),
            clients: snapshot.iter().map(ClientReport::from_state).collect(),
        }
    }

    fn lines(&self, detailed: bool) -> Vec<String> {
        let summary = &self.summary;
        let mut lines = vec![
            format!(
                "{} ({}/{} clients completed)",
                self.mode.as_str(),
                self.completed_clients,
                self.clients.len()
            ),
            format!("  Server CPU ms: {}", format_ms(summary.server_cpu_ms)),
            format!(
                "  Cumulative delivery latency: {}",
                format_ms(summary.latency_total_ms)
            ),
            format!("  Avg latency: {}", format_optional_ms(summary.avg_latency_ms)),
            format!("  Total duration: {}", format_optional_sec(summary.total_ms)),
            format!(
                "  {}: {}",
                self.counter_label, summary.message_or_request_count
            ),
            format!("  Bytes received: {}", format_bytes(summary.bytes)),
            format!(
                "  First update: {}",
                format_optional_ms(summary.first_update_ms)
            ),
        ];
        if detailed {
            lines.extend(self.clients.iter().map(|client| {
                format!(
                    "    client {}: {} {}% first {} total {} ({} chars)",
                    client.id,
                    client.status,
                    client.progress_percent,
                    format_optional_ms(client.first_update_ms),
                    format_optional_sec(client.total_ms),
                    client.result_length
                )
            }));
        }
        lines
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub kind: TaskKind,
    pub task_id: Option<String>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub streaming: ModeReport,
    pub polling: ModeReport,
}

impl ComparisonReport {
    #[must_use]
    pub fn from_state(kind: TaskKind, state: &RunState) -> Self {
        let meta = state.meta();
        Self {
            kind,
            task_id: meta.task_id,
            status: meta.status,
            error: meta.error,
            streaming: ModeReport::from_mode(&state.streaming),
            polling: ModeReport::from_mode(&state.polling),
        }
    }

    /// Plain-text rendering, one entry per line. `detailed` adds a line per
    /// client.
    #[must_use]
    pub fn lines(&self, detailed: bool) -> Vec<String> {
        let mut lines = vec![format!(
            "{} run {}: {}",
            self.kind,
            self.task_id.as_deref().unwrap_or(MISSING),
            self.status.as_str().to_uppercase()
        )];
        if let Some(error) = self.error.as_ref() {
            lines.push(format!("Error: {}", error));
        }
        lines.extend(self.streaming.lines(detailed));
        lines.extend(self.polling.lines(detailed));
        lines
    }
}

/// Compact live status: completion and mean progress of each mode.
#[must_use]
pub fn progress_line(state: &RunState) -> String {
    let describe = |mode: &ModeState| {
        let snapshot = mode.snapshot();
        let completed = snapshot.iter().filter(|client| client.completed).count();
        let percent_total = snapshot
            .iter()
            .map(|client| progress_percent(client.progress))
            .fold(0_u64, u64::saturating_add);
        let mean = percent_total
            .checked_div(u64::try_from(snapshot.len()).unwrap_or(0))
            .unwrap_or(0);
        let summary = mode.summary();
        format!(
            "{} {}/{} done {}% {} {}",
            mode.mode.as_str(),
            completed,
            snapshot.len(),
            mean,
            summary.message_or_request_count,
            if mode.mode == DeliveryMode::Streaming {
                "msgs"
            } else {
                "reqs"
            }
        )
    };
    format!(
        "[{}] {} | {}",
        state.status().as_str(),
        describe(&state.streaming),
        describe(&state.polling)
    )
}

#[expect(
    clippy::float_arithmetic,
    reason = "progress fraction rendered as whole percent"
)]
fn progress_percent(progress: f64) -> u64 {
    (progress.clamp(0.0, 1.0) * 100.0).round() as u64
}
