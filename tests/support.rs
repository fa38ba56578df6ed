use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tokio_tungstenite::tungstenite::{Message, accept};

/// What the fake backend answers for one run.
#[derive(Debug, Clone)]
pub struct Script {
    pub task_state: &'static str,
    pub result_done: bool,
    pub socket_messages: Vec<&'static str>,
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn the HTTP API and the socket endpoint on two local ports.
///
/// # Errors
///
/// Returns an error if a listener cannot be created or configured.
pub fn spawn_backend(script: &Script) -> Result<(String, String, Vec<ServerHandle>), String> {
    let http_script = script.clone();
    let (http_url, http_handle) = spawn_listener("http", move |stream| {
        handle_http(stream, &http_script);
    })?;
    let socket_script = script.clone();
    let (ws_url, ws_handle) = spawn_listener("ws", move |stream| {
        handle_socket(stream, &socket_script);
    })?;
    Ok((
        format!("{}/api", http_url),
        ws_url,
        vec![http_handle, ws_handle],
    ))
}

/// An address nothing listens on.
///
/// # Errors
///
/// Returns an error if no port can be reserved.
pub fn unused_base_url() -> Result<String, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe listener failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?;
    drop(listener);
    Ok(format!("http://{}/api", addr))
}

fn spawn_listener<F>(scheme: &str, handler: F) -> Result<(String, ServerHandle), String>
where
    F: Fn(TcpStream) + Send + Sync + Clone + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    if stream.set_nonblocking(false).is_err() {
                        continue;
                    }
                    let handler = handler.clone();
                    thread::spawn(move || handler(stream));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("{}://{}", scheme, addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
        },
    ))
}

fn handle_http(stream: TcpStream, script: &Script) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let path = path.split('?').next().unwrap_or(path);
    let (status, payload) = match path {
        "/api/calculate_pi" => ("200 OK", r#"{"id":"task-e2e"}"#.to_owned()),
        "/api/naive/calculate_pi" => ("200 OK", r#"{"ok":true}"#.to_owned()),
        "/api/naive/check_progress" => (
            "200 OK",
            format!(
                r#"{{"state":"{}","progress":{{"percentage":0.5,"current":4}},"server_cpu_ms_naive":3}}"#,
                script.task_state
            ),
        ),
        "/api/naive/task_result" => (
            "200 OK",
            format!(
                r#"{{"partial_result":"3.141","done":{}}}"#,
                script.result_done
            ),
        ),
        _ => ("404 Not Found", r#"{"detail":"not found"}"#.to_owned()),
    };

    let mut stream = reader.into_inner();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    drop(stream.flush());
    drop(stream.shutdown(Shutdown::Both));
}

fn handle_socket(stream: TcpStream, script: &Script) {
    let Ok(mut socket) = accept(stream) else {
        return;
    };
    for message in &script.socket_messages {
        if socket.send(Message::Text((*message).to_owned())).is_err() {
            return;
        }
    }
    while socket.read().is_ok() {}
}

/// Run the `pushpoll` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_pushpoll<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = pushpoll_bin()?;
    Command::new(bin)
        .args(args)
        .env("PUSHPOLL_LOG", "error")
        .env("NO_PROXY", "127.0.0.1")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("PUSHPOLL_BASE_URL")
        .env_remove("PUSHPOLL_WS_BASE_URL")
        .output()
        .map_err(|err| format!("run pushpoll failed: {}", err))
}

fn pushpoll_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_pushpoll").map_or_else(
        || Err("CARGO_BIN_EXE_pushpoll missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
