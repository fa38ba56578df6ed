use super::types::{ClientMetrics, Summary, average};

/// Fold the metrics of several clients into one summary.
///
/// Only reads its input: minimum of first-update times, maximum of total
/// times and server CPU, sums for every counter.
pub fn aggregate<'metrics, I>(clients: I) -> Summary
where
    I: IntoIterator<Item = &'metrics ClientMetrics>,
{
    let mut summary = Summary::default();
    for metrics in clients {
        summary.first_update_ms = min_present(summary.first_update_ms, metrics.first_update_ms);
        summary.total_ms = max_present(summary.total_ms, metrics.total_ms);
        summary.message_or_request_count = summary
            .message_or_request_count
            .saturating_add(metrics.message_or_request_count);
        summary.bytes = summary.bytes.saturating_add(metrics.bytes);
        summary.latency_total_ms = summary
            .latency_total_ms
            .saturating_add(metrics.latency_total_ms);
        summary.latency_count = summary.latency_count.saturating_add(metrics.latency_count);
        summary.server_cpu_ms = summary.server_cpu_ms.max(metrics.server_cpu_ms);
    }
    summary.avg_latency_ms = average(summary.latency_total_ms, summary.latency_count);
    summary
}

/// Fold one measured round trip into the running latency accumulator.
///
/// Does nothing when no elapsed time was measured.
pub fn record_latency(metrics: &mut ClientMetrics, elapsed_ms: Option<u64>) {
    if let Some(elapsed_ms) = elapsed_ms {
        metrics.latency_total_ms = metrics.latency_total_ms.saturating_add(elapsed_ms);
        metrics.latency_count = metrics.latency_count.saturating_add(1);
    }
}

fn min_present(current: Option<u64>, candidate: Option<u64>) -> Option<u64> {
    match (current, candidate) {
        (Some(left), Some(right)) => Some(left.min(right)),
        (left, right) => left.or(right),
    }
}

fn max_present(current: Option<u64>, candidate: Option<u64>) -> Option<u64> {
    match (current, candidate) {
        (Some(left), Some(right)) => Some(left.max(right)),
        (left, right) => left.or(right),
    }
}
