//! IPC Client for communicating with the timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::config::AppPaths;
use crate::types::{IpcRequest, IpcResponse, TimerMode};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 200;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
    retry_delay: Duration,
}

impl IpcClient {
    /// Creates a client for the socket under the resolved home directory.
    pub fn new() -> Result<Self> {
        Ok(Self::with_socket_path(AppPaths::resolve()?.socket()))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Sets the base delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn start(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Start).await
    }

    pub async fn pause(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Pause).await
    }

    pub async fn reset(&self, minutes: Option<i64>) -> Result<IpcResponse> {
        self.request(&IpcRequest::Reset { minutes }).await
    }

    pub async fn switch_mode(&self, mode: TimerMode) -> Result<IpcResponse> {
        self.request(&IpcRequest::SwitchMode { mode }).await
    }

    pub async fn status(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Status).await
    }

    /// Sends `request` and turns an error response into an `Err`.
    ///
    /// Error responses are final; only transport failures are retried.
    pub async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request_with_retry(request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::debug!("リクエスト失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let io_timeout = Duration::from_secs(IO_TIMEOUT_SECS);

        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("デーモンに接続できません。'pomotask daemon' を起動してください")?;

        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(io_timeout, stream.write_all(&request_json))
            .await
            .context("書き込みがタイムアウトしました")?
            .context("リクエストの送信に失敗しました")?;

        // End of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        let n = timeout(
            io_timeout,
            (&mut stream)
                .take(MAX_RESPONSE_SIZE as u64)
                .read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if n == 0 {
            anyhow::bail!("デーモンからの応答がありませんでした");
        }

        serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")
    }
}

// ============================================================================
// Tests
// ============================================================================
