use serde_json::Value;

use super::status::CPU_KEY_POLLING;
use super::value_as_ms;

/// One response of a polling result endpoint.
///
/// Covers both shapes the endpoints use: incremental pages (`items` or
/// `snippets` plus a `last_id` cursor) and full snapshots (`partial_result`
/// plus a `done` flag).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Value>,
    pub last_id: Option<u64>,
    pub done: bool,
    pub partial_result: Option<String>,
    pub server_cpu_ms: Option<u64>,
}

impl ResultPage {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .get("items")
            .or_else(|| value.get("snippets"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let partial_result = match value.get("partial_result") {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self {
            items,
            last_id: value.get("last_id").and_then(Value::as_u64),
            done: value.get("done").and_then(Value::as_bool) == Some(true),
            partial_result,
            server_cpu_ms: value
                .get("metadata")
                .and_then(|metadata| metadata.get(CPU_KEY_POLLING))
                .and_then(value_as_ms),
        }
    }
}
