//! Controller side of the control channel.
//!
//! Used by `tvsim send` and by tests that play the role of the external
//! controller process.

use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::error::Error;
use crate::frame;

#[cfg(unix)]
type Stream = tokio::net::UnixStream;

#[cfg(windows)]
type Stream = tokio::net::windows::named_pipe::NamedPipeClient;

// ── RetryPolicy ──────────────────────────────────────────────────────

/// How hard [`ControllerClient::connect_with_retry`] tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first. Default: 3.
    pub retries: u32,
    /// Fixed delay between attempts. Default: 500ms.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

// ── ControllerClient ─────────────────────────────────────────────────

/// An attached controller.
#[derive(Debug)]
pub struct ControllerClient {
    endpoint: String,
    stream: Stream,
}

impl ControllerClient {
    /// Attach to the simulator's endpoint once.
    pub async fn connect(endpoint: &str) -> Result<Self, Error> {
        let stream = open(endpoint).await.map_err(|source| Error::ConnectFailed {
            endpoint: endpoint.to_owned(),
            source,
        })?;
        tracing::debug!(endpoint, "attached to simulator");
        Ok(Self {
            endpoint: endpoint.to_owned(),
            stream,
        })
    }

    /// Attach, retrying while the endpoint is absent or busy.
    pub async fn connect_with_retry(endpoint: &str, policy: &RetryPolicy) -> Result<Self, Error> {
        let mut attempt: u32 = 0;
        loop {
            match Self::connect(endpoint).await {
                Ok(client) => return Ok(client),
                Err(e) if attempt < policy.retries => {
                    attempt += 1;
                    tracing::info!(error = %e, attempt, "simulator not reachable, retrying");
                    tokio::time::sleep(policy.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one command code as a single frame.
    pub async fn send(&mut self, code: u32) -> Result<(), Error> {
        let frame = frame::encode(code);
        self.stream
            .write_all(&frame)
            .await
            .map_err(Error::WriteFailed)?;
        self.stream.flush().await.map_err(Error::WriteFailed)
    }

    /// Detach from the simulator.
    pub async fn close(mut self) -> Result<(), Error> {
        self.stream.shutdown().await.map_err(Error::WriteFailed)
    }
}

#[cfg(unix)]
async fn open(endpoint: &str) -> std::io::Result<Stream> {
    tokio::net::UnixStream::connect(endpoint).await
}

#[cfg(windows)]
async fn open(endpoint: &str) -> std::io::Result<Stream> {
    use tokio::net::windows::named_pipe::{ClientOptions, PipeMode};

    ClientOptions::new()
        .pipe_mode(PipeMode::Message)
        .open(endpoint)
}
