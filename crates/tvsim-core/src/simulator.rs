// ── Simulator facade ──
//
// Owns the device state through a single actor task. Every mutation
// (hardware commands, local commands, sweep ticks) goes through that
// actor's mailbox, so nothing else ever touches `DeviceState`. Snapshots
// leave the actor by value over `watch`, `broadcast` and the sink feed.
//
// Background tasks hold only the channels they use, never the facade.
// Dropping the last `Simulator` handle cancels them and releases the
// endpoint; `shutdown` additionally waits for them to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tvsim_ipc::{ListenerConfig, ListenerHandle, ListenerState, create_platform_endpoint, spawn_listener};

use crate::config::SimulatorConfig;
use crate::error::CoreError;
use crate::ingress::{self, CommandIngress};
use crate::machine::{self, Transition};
use crate::model::{Command, DeviceState, InterruptEvent, Snapshot, Source};
use crate::sink::{self, BroadcastSink, Observer, ObserverId, SinkFeed, SinkMessage};
use crate::stream::SnapshotStream;

const MAILBOX_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

struct Envelope {
    command: Command,
    reply: Option<oneshot::Sender<Transition>>,
}

// ── Clock ────────────────────────────────────────────────────────────

/// Wall-clock timestamps derived from Tokio's monotonic clock, so paused
/// test time drives expiry the same way real time does.
struct Clock {
    wall: DateTime<Utc>,
    base: Instant,
}

impl Clock {
    fn new() -> Self {
        Self {
            wall: Utc::now(),
            base: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.wall + TimeDelta::from_std(self.base.elapsed()).unwrap_or(TimeDelta::zero())
    }
}

// ── Publisher ────────────────────────────────────────────────────────

/// Outbound side of the state actor.
struct Publisher {
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    event_tx: broadcast::Sender<Arc<InterruptEvent>>,
    feed: SinkFeed,
}

impl Publisher {
    /// Push a freshly captured snapshot (and any interrupt events) out.
    /// Called by the actor after the state borrow has ended.
    fn publish(&self, snapshot: Snapshot, events: Vec<InterruptEvent>) {
        let snapshot = Arc::new(snapshot);
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        let _ = self.feed.send(SinkMessage::Snapshot(snapshot));

        for event in events {
            let _ = self.event_tx.send(Arc::new(event.clone()));
            let _ = self.feed.send(SinkMessage::Interrupt(event));
        }
    }
}

// ── Simulator ────────────────────────────────────────────────────────

/// The appliance simulator.
///
/// Cheaply cloneable via `Arc<SimulatorInner>`. Create with
/// [`new`](Self::new), then [`start`](Self::start) to spawn the state
/// actor, the sink fan-out and (if enabled) the transport listener.
#[derive(Clone)]
pub struct Simulator {
    inner: Arc<SimulatorInner>,
}

struct SimulatorInner {
    config: SimulatorConfig,
    clock: Arc<Clock>,
    started: AtomicBool,
    mailbox_tx: mpsc::Sender<Envelope>,
    mailbox_rx: Mutex<Option<mpsc::Receiver<Envelope>>>,
    publisher: Arc<Publisher>,
    sink: Arc<BroadcastSink>,
    sink_rx: Mutex<Option<mpsc::UnboundedReceiver<SinkMessage>>>,
    listener_state: OnceLock<watch::Receiver<ListenerState>>,
    listener: Mutex<Option<ListenerHandle>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for SimulatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Simulator {
    /// Create a simulator with the startup state. Does NOT spawn anything.
    pub fn new(config: SimulatorConfig) -> Self {
        let clock = Clock::new();
        let initial = Arc::new(Snapshot::capture(&DeviceState::default(), 0, clock.now()));
        let (snapshot_tx, _) = watch::channel(initial);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (mailbox_tx, mailbox_rx) = mpsc::channel(MAILBOX_SIZE);
        let (sink, sink_rx) = BroadcastSink::new();
        let publisher = Publisher {
            snapshot_tx,
            event_tx,
            feed: sink.feed(),
        };

        Self {
            inner: Arc::new(SimulatorInner {
                config,
                clock: Arc::new(clock),
                started: AtomicBool::new(false),
                mailbox_tx,
                mailbox_rx: Mutex::new(Some(mailbox_rx)),
                publisher: Arc::new(publisher),
                sink: Arc::new(sink),
                sink_rx: Mutex::new(Some(sink_rx)),
                listener_state: OnceLock::new(),
                listener: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background tasks.
    ///
    /// A transport setup failure does not fail `start`: the listener
    /// reports [`ListenerState::Failed`] and local commands keep working.
    pub async fn start(&self) -> Result<(), CoreError> {
        let Some(mailbox_rx) = self.inner.mailbox_rx.lock().await.take() else {
            return Err(CoreError::AlreadyRunning);
        };
        let sink_rx = self
            .inner
            .sink_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyRunning)?;

        let config = &self.inner.config;
        let cancel = self.inner.cancel.clone();
        let mut handles = self.inner.task_handles.lock().await;

        handles.push(tokio::spawn(sink::fanout_task(
            Arc::clone(&self.inner.sink),
            sink_rx,
            self.snapshot(),
            cancel.clone(),
        )));
        handles.push(tokio::spawn(state_actor_task(
            Arc::clone(&self.inner.publisher),
            Arc::clone(&self.inner.clock),
            config.clone(),
            mailbox_rx,
            cancel.clone(),
        )));

        if config.hardware {
            let (ingress_tx, ingress) = ingress::channel(config.ingress_capacity);
            handles.push(tokio::spawn(ingress_task(
                self.inner.mailbox_tx.clone(),
                ingress,
                cancel.clone(),
            )));

            let endpoint = config.endpoint.clone();
            let listener = spawn_listener(
                move || create_platform_endpoint(&endpoint),
                ingress_tx,
                ListenerConfig {
                    accept_retry: config.accept_retry,
                },
                cancel.child_token(),
            );
            let _ = self.inner.listener_state.set(listener.watch());
            *self.inner.listener.lock().await = Some(listener);
        }

        self.inner.started.store(true, Ordering::Release);
        info!(
            hardware = config.hardware,
            endpoint = %config.endpoint,
            "simulator started"
        );
        Ok(())
    }

    /// Stop every background task, release the endpoint and wait for the
    /// tasks to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(listener) = self.inner.listener.lock().await.take() {
            listener.shutdown().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("simulator stopped");
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Inject one command and wait for the resulting transition.
    ///
    /// Entry point for REST handlers, UI clicks and the local console.
    /// Hardware codes reach the same mailbox through the ingress consumer.
    pub async fn submit(&self, code: u32, source: Source) -> Result<Transition, CoreError> {
        if !self.inner.started.load(Ordering::Acquire) {
            return Err(CoreError::NotStarted);
        }
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SimulatorStopped);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            command: Command::new(code, source),
            reply: Some(reply_tx),
        };
        self.inner
            .mailbox_tx
            .send(envelope)
            .await
            .map_err(|_| CoreError::SimulatorStopped)?;
        reply_rx.await.map_err(|_| CoreError::SimulatorStopped)
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Latest snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.publisher.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.publisher.snapshot_tx.subscribe())
    }

    /// Subscribe to interrupt events (hardware-sourced commands only).
    pub fn events(&self) -> broadcast::Receiver<Arc<InterruptEvent>> {
        self.inner.publisher.event_tx.subscribe()
    }

    /// Register an observer with the broadcast sink.
    pub fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        self.inner.sink.register(observer)
    }

    pub fn unregister(&self, id: ObserverId) -> bool {
        self.inner.sink.unregister(id)
    }

    /// Transport listener phase. Stays [`ListenerState::Idle`] when the
    /// listener is disabled or not started yet.
    pub fn listener_state(&self) -> watch::Receiver<ListenerState> {
        self.inner
            .listener_state
            .get()
            .cloned()
            .unwrap_or_else(|| watch::channel(ListenerState::Idle).1)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Sole owner of `DeviceState`.
async fn state_actor_task(
    publisher: Arc<Publisher>,
    clock: Arc<Clock>,
    config: SimulatorConfig,
    mut mailbox: mpsc::Receiver<Envelope>,
    cancel: CancellationToken,
) {
    let mut state = DeviceState::default();
    let mut revision = publisher.snapshot_tx.borrow().revision;

    let mut ticker = tokio::time::interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = mailbox.recv() => {
                let Some(Envelope { command, reply }) = envelope else { break };
                let now = clock.now();
                let transition = machine::apply(&mut state, &command, now);
                debug!(
                    code = %format!("0x{:02X}", command.code),
                    source = %command.source,
                    notification = %transition.notification,
                    "command applied"
                );

                revision += 1;
                publisher.publish(Snapshot::capture(&state, revision, now), transition.events.clone());

                if let Some(reply) = reply {
                    let _ = reply.send(transition);
                }
            }
            _ = ticker.tick() => {
                let now = clock.now();
                let swept = machine::sweep(&mut state, now, config.ephemeral_timeout);
                if swept.changed() {
                    revision += 1;
                    publisher.publish(Snapshot::capture(&state, revision, now), Vec::new());
                }
            }
        }
    }

    debug!("state actor stopped");
}

/// Drains Command Ingress into the actor mailbox as hardware commands.
async fn ingress_task(
    mailbox: mpsc::Sender<Envelope>,
    mut ingress: CommandIngress,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = ingress.next() => match next {
                Some(command) => command,
                None => break,
            },
        };

        let envelope = Envelope {
            command,
            reply: None,
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = mailbox.send(envelope) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!("ingress consumer stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn local_only() -> SimulatorConfig {
        SimulatorConfig {
            hardware: false,
            ..SimulatorConfig::default()
        }
    }

    #[tokio::test]
    async fn lifecycle_errors() {
        let sim = Simulator::new(local_only());
        assert!(matches!(
            sim.submit(0x10, Source::Local).await,
            Err(CoreError::NotStarted)
        ));

        sim.start().await.unwrap();
        assert!(matches!(sim.start().await, Err(CoreError::AlreadyRunning)));

        sim.shutdown().await;
        assert!(matches!(
            sim.submit(0x10, Source::Local).await,
            Err(CoreError::SimulatorStopped)
        ));
    }

    #[tokio::test]
    async fn listener_state_idle_without_hardware() {
        let sim = Simulator::new(local_only());
        sim.start().await.unwrap();
        assert_eq!(*sim.listener_state().borrow(), ListenerState::Idle);
        sim.shutdown().await;
    }
}
