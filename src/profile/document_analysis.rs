use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::engine::{PollingHooks, StopContext, StreamingHooks, TickPhase, UpdateNotifier};
use crate::payload::{ChunkData, ResultChunk, ResultPage};
use crate::state::ClientState;
use crate::transport::TaskRoutes;

pub(super) const ROUTES: TaskRoutes = TaskRoutes {
    start: &["tasks", "document-analysis"],
    start_polling: &["naive", "document-analysis"],
    status: &["naive", "document-analysis", "status"],
    result: &["naive", "document-analysis", "snippets"],
};

const SERVER_BOOKS_DIR: &str = "/data/books";
const FALLBACK_DOCUMENT: &str = "document.txt";

pub(super) fn streaming_hooks(on_update: Option<UpdateNotifier>) -> StreamingHooks {
    StreamingHooks {
        on_result_chunk: Some(Arc::new(append_streamed_snippets)),
        on_result: None,
        on_update,
    }
}

pub(super) fn polling_hooks(on_update: Option<UpdateNotifier>) -> PollingHooks {
    PollingHooks {
        status_progressed: Some(Arc::new(analysis_active)),
        on_result: Some(Arc::new(append_polled_snippets)),
        should_stop: Some(Arc::new(should_stop)),
        on_update,
    }
}

/// Render one snippet as `[line L] keyword: snippet`.
///
/// Streamed items carry the line under `location.line`, polled ones
/// directly under `line`.
#[must_use]
pub fn format_snippet(item: &Value, streamed: bool) -> String {
    let line = if streamed {
        item.get("location").and_then(|location| location.get("line"))
    } else {
        item.get("line")
    };
    let line = match line {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_)) | None => {
            "?".to_owned()
        }
    };
    let keyword = item
        .get("keyword")
        .and_then(Value::as_str)
        .unwrap_or("keyword");
    let snippet = item.get("snippet").and_then(Value::as_str).unwrap_or("");
    format!("[line {}] {}: {}", line, keyword, snippet)
}

/// Server-side path for a document that is only known by URL: the URL's
/// file name under the server's books directory.
#[must_use]
pub fn resolve_document_path(document_path: Option<&str>, document_url: Option<&str>) -> Option<String> {
    if let Some(path) = document_path.filter(|path| !path.trim().is_empty()) {
        return Some(path.trim().to_owned());
    }
    let url = Url::parse(document_url?.trim()).ok()?;
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_DOCUMENT);
    Some(format!("{}/{}", SERVER_BOOKS_DIR, name))
}

fn append_items(items: &[Value], streamed: bool, state: &mut ClientState) -> bool {
    let mut appended = false;
    for item in items.iter().filter(|item| !item.is_null()) {
        state.append_line(&format_snippet(item, streamed));
        appended = true;
    }
    appended
}

fn append_streamed_snippets(chunk: &ResultChunk, state: &mut ClientState) {
    match &chunk.data {
        ChunkData::Items(items) => {
            append_items(items, true, state);
        }
        ChunkData::Text(_) | ChunkData::Empty => {}
    }
}

fn append_polled_snippets(page: &ResultPage, state: &mut ClientState) -> bool {
    append_items(&page.items, false, state)
}

/// Any progress or any reported metric counts as activity.
fn analysis_active(status: &Value, state: &ClientState) -> bool {
    let has_metrics = status
        .get("metrics")
        .is_some_and(|metrics| !metrics.is_null());
    state.progress > 0.0 || has_metrics
}

fn should_stop(context: &StopContext<'_>) -> bool {
    match context.phase {
        TickPhase::Status => context.status.is_not_found(),
        TickPhase::Result => {
            context.result.is_some_and(|result| result.is_not_found())
                || context.state.status.is_terminal()
        }
    }
}
