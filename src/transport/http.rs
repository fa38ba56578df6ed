use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::TransportError;

use super::elapsed_ms;

/// Invoked with the URL and message of every request that failed below
/// the HTTP layer.
pub type ErrorCallback = Arc<dyn Fn(&Url, &str) + Send + Sync>;

/// Uniform result of one JSON request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// `true` only for a 2xx response.
    pub ok: bool,
    /// HTTP status, `0` when no response arrived.
    pub status_code: u16,
    /// Parsed body, `None` when empty or not JSON.
    pub data: Option<Value>,
    pub byte_length: u64,
    pub elapsed_ms: Option<u64>,
    pub transport_error: Option<String>,
}

impl FetchOutcome {
    #[must_use]
    pub fn transport_failure(message: impl Into<String>, elapsed_ms: Option<u64>) -> Self {
        Self {
            ok: false,
            status_code: 0,
            data: None,
            byte_length: 0,
            elapsed_ms,
            transport_error: Some(message.into()),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    /// The body of a successful response.
    #[must_use]
    pub fn ok_data(&self) -> Option<&Value> {
        if self.ok { self.data.as_ref() } else { None }
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    on_error: Option<ErrorCallback>,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|source| TransportError::BuildClientFailed { source })?;
        Ok(Self::from_client(client))
    }

    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self {
            client,
            on_error: None,
        }
    }

    #[must_use]
    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    /// `GET` the URL, or `POST` `body` as JSON when one is given.
    ///
    /// Never fails: network errors come back as `status_code == 0` with
    /// `transport_error` set, non-2xx responses as `ok == false` with the
    /// real status and whatever body parsed.
    pub async fn fetch_json(&self, url: &Url, body: Option<&Value>) -> FetchOutcome {
        let start = Instant::now();
        let request = match body {
            Some(body) => self.client.post(url.clone()).json(body),
            None => self.client.get(url.clone()),
        };
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return self.failed(url, &err.to_string(), start),
        };
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return self.failed(url, &err.to_string(), start),
        };
        let data = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };
        FetchOutcome {
            ok: status.is_success(),
            status_code: status.as_u16(),
            data,
            byte_length: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            elapsed_ms: Some(elapsed_ms(start)),
            transport_error: None,
        }
    }

    fn failed(&self, url: &Url, message: &str, start: Instant) -> FetchOutcome {
        match self.on_error.as_ref() {
            Some(on_error) => on_error(url, message),
            None => warn!("Request to {} failed: {}", url, message),
        }
        FetchOutcome::transport_failure(message, Some(elapsed_ms(start)))
    }
}
