use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;

use super::http::{FetchOutcome, HttpTransport};
use super::with_segments;

/// Task lifecycle endpoints both delivery modes depend on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Create the task the socket channel reports on.
    async fn start_task(&self, body: &Value) -> FetchOutcome;
    /// Register the polling twin of an existing task.
    async fn start_polling_task(&self, body: &Value) -> FetchOutcome;
    async fn get_status(&self, task_id: &str) -> FetchOutcome;
    /// Fetch results, only those after `cursor` when one is given.
    async fn get_result(&self, task_id: &str, cursor: Option<u64>) -> FetchOutcome;
}

/// Path segments of each endpoint, relative to the API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRoutes {
    pub start: &'static [&'static str],
    pub start_polling: &'static [&'static str],
    pub status: &'static [&'static str],
    pub result: &'static [&'static str],
}

pub struct HttpTaskApi {
    transport: HttpTransport,
    start_url: Url,
    start_polling_url: Url,
    status_url: Url,
    result_url: Url,
}

impl HttpTaskApi {
    /// Resolve every route against `base` up front.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot carry a path.
    pub fn new(
        transport: HttpTransport,
        base: &Url,
        routes: &TaskRoutes,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            transport,
            start_url: with_segments(base, routes.start.iter().copied())?,
            start_polling_url: with_segments(base, routes.start_polling.iter().copied())?,
            status_url: with_segments(base, routes.status.iter().copied())?,
            result_url: with_segments(base, routes.result.iter().copied())?,
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn start_task(&self, body: &Value) -> FetchOutcome {
        self.transport.fetch_json(&self.start_url, Some(body)).await
    }

    async fn start_polling_task(&self, body: &Value) -> FetchOutcome {
        self.transport
            .fetch_json(&self.start_polling_url, Some(body))
            .await
    }

    async fn get_status(&self, task_id: &str) -> FetchOutcome {
        let mut url = self.status_url.clone();
        url.query_pairs_mut().append_pair("task_id", task_id);
        self.transport.fetch_json(&url, None).await
    }

    async fn get_result(&self, task_id: &str, cursor: Option<u64>) -> FetchOutcome {
        let mut url = self.result_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("task_id", task_id);
            if let Some(cursor) = cursor {
                query.append_pair("after", &cursor.to_string());
            }
        }
        self.transport.fetch_json(&url, None).await
    }
}
