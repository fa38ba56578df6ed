//! Total mapping functions from loosely-shaped server JSON into the
//! normalized progress/result model. Nothing here returns an error: missing
//! or mistyped fields fall back to defaults.
mod envelope;
mod result;
mod status;


pub use envelope::{ChunkData, ResultChunk, SocketEvent, decode_envelope};
pub use result::ResultPage;
pub use status::{
    CPU_KEY_POLLING, CPU_KEY_STREAMING, StatusUpdate, apply_status, normalize_percentage,
    server_latency_ms, status_from_value,
};

use serde_json::Value;

/// Read a millisecond-ish JSON number as whole milliseconds.
///
/// Negative and non-finite values clamp to zero.
pub(crate) fn value_as_ms(value: &Value) -> Option<u64> {
    if let Some(whole) = value.as_u64() {
        return Some(whole);
    }
    value.as_f64().map(round_ms)
}

fn round_ms(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.round() as u64
}
