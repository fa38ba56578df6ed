use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

use crate::error::TransportError;

use super::with_segments;

const KEEPALIVE_TEXT: &str = "ping";
const MIN_KEEPALIVE: Duration = Duration::from_millis(1);

pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type SignalHandler = Arc<dyn Fn() + Send + Sync>;
pub type SocketErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks for one socket. Every handler is optional; a missing one is a
/// no-op.
#[derive(Clone, Default)]
pub struct SocketHandlers {
    pub on_message: Option<MessageHandler>,
    pub on_open: Option<SignalHandler>,
    pub on_error: Option<SocketErrorHandler>,
    pub on_close: Option<SignalHandler>,
}

impl SocketHandlers {
    fn message(&self, raw: &str) {
        if let Some(handler) = self.on_message.as_ref() {
            handler(raw);
        }
    }

    fn opened(&self) {
        if let Some(handler) = self.on_open.as_ref() {
            handler();
        }
    }

    fn error(&self, message: &str) {
        if let Some(handler) = self.on_error.as_ref() {
            handler(message);
        }
    }

    fn closed(&self) {
        if let Some(handler) = self.on_close.as_ref() {
            handler();
        }
    }
}

/// Owner of one socket connection.
///
/// Dropping the handle closes the connection.
#[derive(Debug, Default)]
pub struct SocketHandle {
    close_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SocketHandle {
    #[must_use]
    pub const fn new(close_tx: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            close_tx: Some(close_tx),
            task: Some(task),
        }
    }

    /// A handle with nothing behind it, for connectors that never open a
    /// connection.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            close_tx: None,
            task: None,
        }
    }

    /// Ask the connection to close. Safe to call repeatedly, and before the
    /// connection ever opened.
    pub fn close(&mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            drop(close_tx.send(()));
        }
    }

    /// Whether the connection task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens one socket per task.
pub trait SocketConnector: Send + Sync {
    fn connect(&self, task_id: &str, handlers: SocketHandlers) -> SocketHandle;
}

/// Socket connector for the `/ws/tasks/{id}` channel.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base: Url,
    keepalive: Duration,
}

impl WsConnector {
    #[must_use]
    pub const fn new(base: Url, keepalive: Duration) -> Self {
        Self { base, keepalive }
    }

    /// # Errors
    ///
    /// Returns an error when the base URL cannot carry a path.
    pub fn socket_url(&self, task_id: &str) -> Result<Url, TransportError> {
        with_segments(&self.base, ["ws", "tasks", task_id])
    }
}

impl SocketConnector for WsConnector {
    fn connect(&self, task_id: &str, handlers: SocketHandlers) -> SocketHandle {
        let url = match self.socket_url(task_id) {
            Ok(url) => url,
            Err(err) => {
                handlers.error(&err.to_string());
                handlers.closed();
                return SocketHandle::detached();
            }
        };
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(drive_socket(url, self.keepalive, handlers, close_rx));
        SocketHandle::new(close_tx, task)
    }
}

/// Derive the socket base from the HTTP API base: same host and port,
/// `http` becomes `ws` and `https` becomes `wss`, path dropped.
///
/// # Errors
///
/// Returns an error for schemes other than http, https, ws and wss.
pub fn derive_socket_base(http_base: &Url) -> Result<Url, TransportError> {
    let scheme = match http_base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::UnsupportedScheme {
                scheme: other.to_owned(),
            });
        }
    };
    let mut url = http_base.clone();
    url.set_scheme(scheme)
        .map_err(|()| TransportError::UnsupportedScheme {
            scheme: http_base.scheme().to_owned(),
        })?;
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

async fn drive_socket(
    url: Url,
    keepalive: Duration,
    handlers: SocketHandlers,
    mut close_rx: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        _closed = &mut close_rx => {
            handlers.closed();
            return;
        }
        connected = connect_async(url.as_str()) => connected,
    };
    let mut stream = match connected {
        Ok((stream, _response)) => stream,
        Err(err) => {
            debug!("Socket connect to {} failed: {}", url, err);
            handlers.error(&err.to_string());
            handlers.closed();
            return;
        }
    };
    handlers.opened();

    let keepalive = keepalive.max(MIN_KEEPALIVE);
    let first_beat = Instant::now()
        .checked_add(keepalive)
        .unwrap_or_else(Instant::now);
    let mut heartbeat = interval_at(first_beat, keepalive);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _closed = &mut close_rx => {
                drop(stream.close(None).await);
                break;
            }
            _tick = heartbeat.tick() => {
                if let Err(err) = stream.send(Message::Text(KEEPALIVE_TEXT.to_owned())).await {
                    handlers.error(&err.to_string());
                    break;
                }
            }
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => handlers.message(&text),
                Some(Ok(Message::Binary(bytes))) => {
                    handlers.message(&String::from_utf8_lossy(&bytes));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    trace!("Socket control frame from {}", url);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    handlers.error(&err.to_string());
                    break;
                }
            },
        }
    }
    handlers.closed();
}
