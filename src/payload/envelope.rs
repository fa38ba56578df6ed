use serde_json::Value;

use super::status::{CPU_KEY_STREAMING, StatusUpdate, status_from_value};

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkData {
    Text(String),
    Items(Vec<Value>),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultChunk {
    pub data: ChunkData,
    pub is_last: bool,
}

impl ResultChunk {
    fn from_payload(payload: Option<&Value>) -> Self {
        let data = match payload.and_then(|payload| payload.get("data")) {
            Some(Value::String(text)) if !text.is_empty() => ChunkData::Text(text.clone()),
            Some(Value::Array(items)) if !items.is_empty() => ChunkData::Items(items.clone()),
            Some(_) | None => ChunkData::Empty,
        };
        let is_last = payload
            .and_then(|payload| payload.get("is_last"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self { data, is_last }
    }
}

/// One decoded socket message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// `task.status`; `None` when the envelope carried no status object.
    Status(Option<StatusUpdate>),
    /// `task.result_chunk`.
    ResultChunk(ResultChunk),
    /// `task.result`, carrying the raw payload.
    FullResult(Value),
    /// Any other envelope type.
    Unknown(String),
}

/// Decode a `{type, payload}` envelope. Returns `None` for non-JSON text.
#[must_use]
pub fn decode_envelope(raw: &str) -> Option<SocketEvent> {
    let message: Value = serde_json::from_str(raw).ok()?;
    let payload = message.get("payload");
    let kind = message.get("type").and_then(Value::as_str).unwrap_or("");
    let event = match kind {
        "task.status" => SocketEvent::Status(
            payload
                .and_then(|payload| payload.get("status"))
                .filter(|status| status.is_object())
                .map(|status| status_from_value(status, CPU_KEY_STREAMING)),
        ),
        "task.result_chunk" => SocketEvent::ResultChunk(ResultChunk::from_payload(payload)),
        "task.result" => SocketEvent::FullResult(payload.cloned().unwrap_or(Value::Null)),
        other => SocketEvent::Unknown(other.to_owned()),
    };
    Some(event)
}
