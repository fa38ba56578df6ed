use serde::Serialize;

/// Counters owned by one simulated client. Every field is derived from what
/// the client observed; nothing here is authoritative elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientMetrics {
    /// Elapsed time from engine start to the first update, set at most once.
    pub first_update_ms: Option<u64>,
    /// Elapsed time from engine start to terminal detection, frozen once.
    pub total_ms: Option<u64>,
    /// Socket messages received (streaming) or HTTP requests issued (polling).
    pub message_or_request_count: u64,
    pub bytes: u64,
    pub latency_total_ms: u64,
    pub latency_count: u64,
    /// Last server-reported CPU cost for the task.
    pub server_cpu_ms: u64,
}

impl ClientMetrics {
    /// Count one message/request and the raw payload size it carried.
    pub fn record_transfer(&mut self, bytes: u64) {
        self.message_or_request_count = self.message_or_request_count.saturating_add(1);
        self.bytes = self.bytes.saturating_add(bytes);
    }

    /// Stamp the first update time unless it is already set.
    ///
    /// Returns `true` when this call stamped it.
    pub fn mark_first_update(&mut self, elapsed_ms: u64) -> bool {
        if self.first_update_ms.is_some() {
            return false;
        }
        self.first_update_ms = Some(elapsed_ms);
        true
    }

    #[must_use]
    pub fn avg_latency_ms(&self) -> Option<u64> {
        average(self.latency_total_ms, self.latency_count)
    }
}

/// Aggregate of every client of one delivery mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Earliest first update across clients (best case).
    pub first_update_ms: Option<u64>,
    /// Slowest client's total time; the mode is not done before it is.
    pub total_ms: Option<u64>,
    pub message_or_request_count: u64,
    pub bytes: u64,
    pub latency_total_ms: u64,
    pub latency_count: u64,
    pub server_cpu_ms: u64,
    /// `latency_total_ms / latency_count`, absent when nothing was measured.
    pub avg_latency_ms: Option<u64>,
}

pub(super) fn average(total: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }
    total.checked_div(count)
}
