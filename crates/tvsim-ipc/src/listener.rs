//! Transport listener with reconnect.
//!
//! Owns one [`Endpoint`] for the lifetime of the simulator and forwards
//! every decoded command code into the ingress channel. A controller may
//! attach, detach and reattach any number of times; only a setup failure
//! or cancellation ends the loop.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::endpoint::{Connection, Endpoint, ReadOutcome};
use crate::error::Error;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ── ListenerState ────────────────────────────────────────────────────

/// Observable phase of the listener loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    /// Not started, or stopped after cancellation.
    Idle,
    /// Endpoint is open and waiting for a controller.
    Listening,
    /// A controller is attached.
    Connected,
    /// The last controller went away; the endpoint is being prepared again.
    Disconnected,
    /// Endpoint setup failed. The loop has exited.
    Failed,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ── ListenerConfig ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Pause after a failed accept before listening again. Default: 100ms.
    pub accept_retry: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            accept_retry: Duration::from_millis(100),
        }
    }
}

// ── ListenerHandle ───────────────────────────────────────────────────

/// Handle to a running listener task.
pub struct ListenerHandle {
    state: watch::Receiver<ListenerState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Current phase of the loop.
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Subscribe to phase changes.
    pub fn watch(&self) -> watch::Receiver<ListenerState> {
        self.state.clone()
    }

    /// Cancel the loop and wait for it to release the endpoint.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        let abort = task.abort_handle();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
            tracing::warn!("listener did not stop in time, aborting");
            abort.abort();
        }
    }
}

/// Spawn the listener loop.
///
/// `create` runs inside the spawned task, so endpoint construction may
/// rely on the Tokio reactor. If it fails, the loop publishes
/// [`ListenerState::Failed`] and exits; the caller keeps running.
pub fn spawn_listener<E, F>(
    create: F,
    ingress: mpsc::Sender<u32>,
    config: ListenerConfig,
    cancel: CancellationToken,
) -> ListenerHandle
where
    E: Endpoint,
    F: FnOnce() -> Result<E, Error> + Send + 'static,
{
    let (state_tx, state_rx) = watch::channel(ListenerState::Idle);
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        listen_loop(create, ingress, config, state_tx, task_cancel).await;
    });

    ListenerHandle {
        state: state_rx,
        cancel,
        task: Some(task),
    }
}

// ── Background loop ──────────────────────────────────────────────────

/// How serving a single controller ended.
enum ConnectionEnd {
    Detached,
    Cancelled,
    IngressClosed,
}

/// Main loop: create → accept → read until detach → recreate → accept ...
async fn listen_loop<E, F>(
    create: F,
    ingress: mpsc::Sender<u32>,
    config: ListenerConfig,
    state_tx: watch::Sender<ListenerState>,
    cancel: CancellationToken,
) where
    E: Endpoint,
    F: FnOnce() -> Result<E, Error>,
{
    let mut endpoint = match create() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!(error = %e, "endpoint setup failed, remote control disabled");
            state_tx.send_replace(ListenerState::Failed);
            return;
        }
    };
    let identity = endpoint.identity().to_owned();

    loop {
        state_tx.send_replace(ListenerState::Listening);
        tracing::info!(endpoint = %identity, "waiting for controller");

        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = endpoint.accept() => result,
        };

        let accept_failed = match accepted {
            Ok(mut conn) => {
                state_tx.send_replace(ListenerState::Connected);
                tracing::info!(endpoint = %identity, "controller connected");

                let end = serve_connection(&mut conn, &ingress, &cancel).await;
                conn.close();
                match end {
                    ConnectionEnd::Detached => {}
                    ConnectionEnd::Cancelled => break,
                    ConnectionEnd::IngressClosed => {
                        tracing::debug!("ingress closed, stopping listener");
                        break;
                    }
                }
                tracing::info!(endpoint = %identity, "controller disconnected");
                false
            }
            Err(e) => {
                tracing::warn!(endpoint = %identity, error = %e, "accept failed");
                true
            }
        };

        state_tx.send_replace(ListenerState::Disconnected);

        if let Err(e) = endpoint.recreate() {
            tracing::error!(endpoint = %identity, error = %e, "failed to recreate endpoint");
            endpoint.close();
            state_tx.send_replace(ListenerState::Failed);
            return;
        }

        if accept_failed {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(config.accept_retry) => {}
            }
        }
    }

    endpoint.close();
    state_tx.send_replace(ListenerState::Idle);
    tracing::debug!(endpoint = %identity, "listener stopped");
}

/// Read frames from one controller until it goes away.
async fn serve_connection<C: Connection>(
    conn: &mut C,
    ingress: &mpsc::Sender<u32>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return ConnectionEnd::Cancelled,
            result = conn.read_command() => result,
        };

        match outcome {
            Ok(ReadOutcome::Code(code)) => {
                tracing::trace!(code = %format!("0x{code:02X}"), "frame received");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return ConnectionEnd::Cancelled,
                    sent = ingress.send(code) => {
                        if sent.is_err() {
                            return ConnectionEnd::IngressClosed;
                        }
                    }
                }
            }
            Ok(ReadOutcome::Malformed { len }) => {
                tracing::debug!(len, "dropping malformed frame");
            }
            Ok(ReadOutcome::EndOfStream) => return ConnectionEnd::Detached,
            Err(e) => {
                tracing::debug!(error = %e, "controller read failed");
                return ConnectionEnd::Detached;
            }
        }
    }
}
