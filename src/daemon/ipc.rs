//! IPC server for the timer daemon.
//!
//! One JSON request per connection over a Unix domain socket, answered with
//! one JSON response. Every request locks the engine, so commands are applied
//! atomically with respect to clock ticks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::types::{IpcRequest, IpcResponse, ResponseData, TimerMode};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the server to `socket_path`, replacing a stale socket file.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request, with a read timeout and a size cap.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            return Err(IpcError::ConnectionError("Connection closed by client".to_string()).into());
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends a response.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Serves a single connection: read a request, answer it.
///
/// Malformed requests get an error response instead of a dropped connection.
pub async fn serve_connection(mut stream: UnixStream, handler: RequestHandler) -> Result<()> {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            debug!(?request, "IPC request");
            handler.handle(request).await
        }
        Err(e) => IpcResponse::error(format!("リクエストを処理できません: {}", e), None),
    };

    IpcServer::send_response(&mut stream, &response).await
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the shared engine.
#[derive(Clone)]
pub struct RequestHandler {
    engine: Arc<Mutex<TimerEngine>>,
}

impl RequestHandler {
    pub fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        Self { engine }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        let (result, message) = match request {
            IpcRequest::Start => (engine.start(), "タイマーを開始しました".to_string()),
            IpcRequest::Pause => (engine.pause(), "タイマーを一時停止しました".to_string()),
            IpcRequest::Reset { minutes } => {
                (engine.reset(minutes), "タイマーをリセットしました".to_string())
            }
            IpcRequest::SwitchMode { mode } => {
                (engine.switch_mode(mode), switch_message(mode))
            }
            IpcRequest::Status => (Ok(()), String::new()),
        };

        let data = Some(ResponseData::from_timer_state(engine.state()));
        match result {
            Ok(()) => IpcResponse::success(message, data),
            Err(e) => IpcResponse::error(e.to_string(), data),
        }
    }
}

fn switch_message(mode: TimerMode) -> String {
    format!("{}モードに切り替えました", mode.label())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::daemon::clock::ManualClock;
    use crate::daemon::status::MockStatusSink;
    use crate::daemon::timer::{TimerEvent, TimerSinks};
    use crate::notification::MockCompletionSink;
    use crate::stats::MockSessionCounter;
    use crate::types::TimerConfig;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_engine() -> (Arc<Mutex<TimerEngine>>, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = TimerEngine::new(
            TimerConfig::default(),
            Box::new(ManualClock::new()),
            TimerSinks {
                session_counter: Arc::new(MockSessionCounter::new()),
                completion: Arc::new(MockCompletionSink::new()),
                status: Arc::new(MockStatusSink::new()),
            },
            tx,
        );
        (Arc::new(Mutex::new(engine)), rx)
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation_and_cleanup() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");

            let server = IpcServer::new(&socket_path).unwrap();
            assert!(socket_path.exists());
            assert_eq!(server.socket_path(), socket_path);

            drop(server);
            assert!(!socket_path.exists());
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");
            std::fs::write(&socket_path, "dummy").unwrap();

            assert!(IpcServer::new(&socket_path).is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let _server = IpcServer::new(&socket_path).unwrap();
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream
                    .write_all(br#"{"command":"reset","minutes":10}"#)
                    .await
                    .unwrap();
                stream
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();
            assert_eq!(request, IpcRequest::Reset { minutes: Some(10) });

            let _ = client.await;
        }

        #[tokio::test]
        async fn test_oversized_request_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let payload = vec![b' '; MAX_REQUEST_SIZE * 2];
                let _ = stream.write_all(&payload).await;
                stream
            });

            let mut stream = server.accept().await.unwrap();
            // Give the client time to fill the socket buffer
            tokio::time::sleep(Duration::from_millis(50)).await;
            let result = IpcServer::receive_request(&mut stream).await;
            assert!(result.is_err());

            let _ = client.await;
        }

        #[tokio::test]
        async fn test_serve_connection_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");
            let server = IpcServer::new(&socket_path).unwrap();
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(br#"{"command":"status"}"#).await.unwrap();
                stream.shutdown().await.unwrap();
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf).await.unwrap();
                serde_json::from_slice::<IpcResponse>(&buf).unwrap()
            });

            let stream = server.accept().await.unwrap();
            serve_connection(stream, handler).await.unwrap();

            let response = client.await.unwrap();
            assert!(response.is_success());
            assert_eq!(response.data.unwrap().display, "25:00");
        }

        #[tokio::test]
        async fn test_serve_connection_answers_garbage_with_error() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("test.sock");
            let server = IpcServer::new(&socket_path).unwrap();
            let (engine, _rx) = create_engine();

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"{\"command\":\"fly\"}").await.unwrap();
                stream.shutdown().await.unwrap();
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf).await.unwrap();
                serde_json::from_slice::<IpcResponse>(&buf).unwrap()
            });

            let stream = server.accept().await.unwrap();
            serve_connection(stream, RequestHandler::new(engine))
                .await
                .unwrap();

            let response = client.await.unwrap();
            assert!(!response.is_success());
            assert!(response.data.is_none());
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test]
        async fn test_handle_start() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let response = handler.handle(IpcRequest::Start).await;

            assert!(response.is_success());
            assert_eq!(response.message, "タイマーを開始しました");
            let data = response.data.unwrap();
            assert!(data.is_running);
            assert_eq!(data.title, "💻 25:00 - Focus");
        }

        #[tokio::test]
        async fn test_handle_pause() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);
            handler.handle(IpcRequest::Start).await;

            let response = handler.handle(IpcRequest::Pause).await;

            assert!(response.is_success());
            assert!(!response.data.unwrap().is_running);
        }

        #[tokio::test]
        async fn test_handle_reset_with_minutes() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let response = handler
                .handle(IpcRequest::Reset { minutes: Some(10) })
                .await;

            assert!(response.is_success());
            assert_eq!(response.data.unwrap().remaining_seconds, 600);
        }

        #[tokio::test]
        async fn test_handle_reset_invalid_keeps_state() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let response = handler
                .handle(IpcRequest::Reset { minutes: Some(-5) })
                .await;

            assert!(!response.is_success());
            assert!(response.message.contains("-5"));
            assert_eq!(response.data.unwrap().remaining_seconds, 1500);
        }

        #[tokio::test]
        async fn test_handle_switch_mode() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let response = handler
                .handle(IpcRequest::SwitchMode {
                    mode: TimerMode::LongBreak,
                })
                .await;

            assert!(response.is_success());
            assert_eq!(response.message, "Long Breakモードに切り替えました");
            let data = response.data.unwrap();
            assert_eq!(data.mode, TimerMode::LongBreak);
            assert_eq!(data.remaining_seconds, 900);
            assert_eq!(data.title, "15:00 - Long Break Mode 🍅");
        }

        #[tokio::test]
        async fn test_handle_status() {
            let (engine, _rx) = create_engine();
            let handler = RequestHandler::new(engine);

            let response = handler.handle(IpcRequest::Status).await;

            assert!(response.is_success());
            assert_eq!(response.message, "");
            assert_eq!(response.data.unwrap().mode, TimerMode::Focus);
        }
    }
}
