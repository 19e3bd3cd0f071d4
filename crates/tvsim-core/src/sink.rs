// ── Broadcast Sink ──
//
// Fan-out of snapshots and interrupt events to registered observers.
// The state actor never calls observers itself: it pushes onto an
// unbounded feed and the fan-out task delivers after the state has been
// released. Registration is a map insert and never waits on delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::model::{InterruptEvent, Snapshot};

// ── Observer ─────────────────────────────────────────────────────────

/// Anything that wants device snapshots.
///
/// Called from the fan-out task; implementations must not block.
pub trait Observer: Send + Sync + 'static {
    fn receive(&self, snapshot: &Arc<Snapshot>);

    /// Hardware-sourced command notice. Ignored by default.
    fn interrupt(&self, _event: &InterruptEvent) {}

    /// A closed observer is dropped from the registry on the next delivery.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> Observer for F
where
    F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
{
    fn receive(&self, snapshot: &Arc<Snapshot>) {
        self(snapshot);
    }
}

/// Identifier returned by [`BroadcastSink::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a [`ChannelObserver`] forwards.
#[derive(Debug, Clone)]
pub enum ObserverMessage {
    Snapshot(Arc<Snapshot>),
    Interrupt(InterruptEvent),
}

/// Observer that forwards into an unbounded channel, for consumers that
/// live on their own task.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ObserverMessage>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn receive(&self, snapshot: &Arc<Snapshot>) {
        let _ = self.tx.send(ObserverMessage::Snapshot(Arc::clone(snapshot)));
    }

    fn interrupt(&self, event: &InterruptEvent) {
        let _ = self.tx.send(ObserverMessage::Interrupt(event.clone()));
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── Feed ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) enum SinkMessage {
    Snapshot(Arc<Snapshot>),
    Interrupt(InterruptEvent),
    /// Deliver the latest snapshot to a newly registered observer.
    Greet(ObserverId),
}

pub(crate) type SinkFeed = mpsc::UnboundedSender<SinkMessage>;

// ── BroadcastSink ────────────────────────────────────────────────────

struct Registration {
    observer: Arc<dyn Observer>,
    /// Set once the observer has been handed any snapshot.
    primed: AtomicBool,
}

impl Registration {
    fn receive(&self, snapshot: &Arc<Snapshot>) {
        self.primed.store(true, Ordering::Release);
        self.observer.receive(snapshot);
    }
}

pub struct BroadcastSink {
    observers: DashMap<ObserverId, Arc<Registration>>,
    feed: SinkFeed,
}

impl BroadcastSink {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (feed, rx) = mpsc::unbounded_channel();
        let sink = Self {
            observers: DashMap::new(),
            feed,
        };
        (sink, rx)
    }

    pub(crate) fn feed(&self) -> SinkFeed {
        self.feed.clone()
    }

    /// Add an observer. It receives the current snapshot first, then
    /// every later one.
    pub fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        let registration = Registration {
            observer,
            primed: AtomicBool::new(false),
        };
        self.observers.insert(id, Arc::new(registration));
        let _ = self.feed.send(SinkMessage::Greet(id));
        debug!(observer = %id, "observer registered");
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            debug!(observer = %id, "observer unregistered");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Clone the registry out so no shard lock is held while observers
    /// run. Observers may register or unregister from inside `receive`.
    fn registered(&self) -> Vec<(ObserverId, Arc<Registration>)> {
        self.observers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    fn deliver(&self, snapshot: &Arc<Snapshot>) {
        let mut closed = Vec::new();
        for (id, registration) in self.registered() {
            if registration.observer.is_closed() {
                closed.push(id);
            } else if self.observers.contains_key(&id) {
                registration.receive(snapshot);
            }
        }

        for id in closed {
            if self.observers.remove(&id).is_some() {
                debug!(observer = %id, "dropping closed observer");
            }
        }
    }

    fn deliver_interrupt(&self, event: &InterruptEvent) {
        for (id, registration) in self.registered() {
            if self.observers.contains_key(&id) {
                registration.observer.interrupt(event);
            }
        }
    }

    /// Hand `latest` to a new observer unless a broadcast already queued
    /// ahead of the greeting reached it first.
    fn greet(&self, id: ObserverId, latest: &Arc<Snapshot>) {
        let registration = self.observers.get(&id).map(|e| Arc::clone(e.value()));
        if let Some(registration) = registration.filter(|r| !r.primed.load(Ordering::Acquire)) {
            registration.receive(latest);
        }
    }
}

/// Fan-out loop. Runs until cancelled or the feed closes.
pub(crate) async fn fanout_task(
    sink: Arc<BroadcastSink>,
    mut rx: mpsc::UnboundedReceiver<SinkMessage>,
    mut latest: Arc<Snapshot>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    SinkMessage::Snapshot(snapshot) => {
                        trace!(revision = snapshot.revision, "broadcasting snapshot");
                        sink.deliver(&snapshot);
                        latest = snapshot;
                    }
                    SinkMessage::Interrupt(event) => sink.deliver_interrupt(&event),
                    SinkMessage::Greet(id) => sink.greet(id, &latest),
                }
            }
        }
    }
    debug!("broadcast sink stopped");
}
