//! Helpers shared by unit tests: a current-thread runtime driver and a
//! scripted raw HTTP/1.1 server.
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::{AppError, AppResult};

pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedRequest {
    pub request_line: String,
    pub body: String,
}

/// Serve one scripted response per connection, in order, and hand back
/// what each request looked like.
pub(crate) async fn spawn_http_mock_server(
    responses: Vec<MockResponse>,
) -> AppResult<(SocketAddr, JoinHandle<AppResult<Vec<RecordedRequest>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| AppError::validation(format!("Failed to bind HTTP server: {}", err)))?;
    let addr = listener
        .local_addr()
        .map_err(|err| AppError::validation(format!("Failed to read HTTP addr: {}", err)))?;

    let task = tokio::spawn(async move {
        let mut recorded = Vec::with_capacity(responses.len());
        for response in responses {
            let (mut stream, _) = timeout(TEST_TIMEOUT, listener.accept())
                .await
                .map_err(|_err| AppError::validation("HTTP accept timed out"))?
                .map_err(|err| AppError::validation(format!("HTTP accept failed: {}", err)))?;
            recorded.push(read_request(&mut stream).await?);
            let head = format!(
                "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                response.status,
                response.body.len()
            );
            let mut bytes = head.into_bytes();
            bytes.extend_from_slice(response.body.as_bytes());
            timeout(TEST_TIMEOUT, stream.write_all(&bytes))
                .await
                .map_err(|_err| AppError::validation("HTTP write timed out"))?
                .map_err(|err| AppError::validation(format!("HTTP write failed: {}", err)))?;
        }
        Ok(recorded)
    });
    Ok((addr, task))
}

async fn read_request(stream: &mut TcpStream) -> AppResult<RecordedRequest> {
    let mut raw = Vec::with_capacity(1024);
    let header_end = loop {
        let mut chunk = [0_u8; 1024];
        let read = timeout(TEST_TIMEOUT, stream.read(&mut chunk))
            .await
            .map_err(|_err| AppError::validation("HTTP read timed out"))?
            .map_err(|err| AppError::validation(format!("HTTP read failed: {}", err)))?;
        if read == 0 {
            return Err(AppError::validation("HTTP client closed before headers"));
        }
        let chunk_prefix = chunk
            .get(..read)
            .ok_or_else(|| AppError::validation("HTTP read buffer prefix unavailable"))?;
        raw.extend_from_slice(chunk_prefix);
        if let Some(position) = raw.windows(4).position(|bytes| bytes == b"\r\n\r\n") {
            break position.saturating_add(4);
        }
    };

    let head = String::from_utf8_lossy(raw.get(..header_end).unwrap_or_default()).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = raw.get(header_end..).unwrap_or_default().to_vec();
    while body.len() < content_length {
        let mut chunk = [0_u8; 1024];
        let read = timeout(TEST_TIMEOUT, stream.read(&mut chunk))
            .await
            .map_err(|_err| AppError::validation("HTTP body read timed out"))?
            .map_err(|err| AppError::validation(format!("HTTP body read failed: {}", err)))?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }

    Ok(RecordedRequest {
        request_line: head.lines().next().unwrap_or_default().to_owned(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
