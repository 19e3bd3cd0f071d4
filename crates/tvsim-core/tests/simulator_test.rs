// Integration tests for the `Simulator` facade: actor serialization,
// ephemeral expiry, observers and the hardware path.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use tvsim_core::{
    App, ChannelObserver, CoreError, ListenerState, ObserverMessage, Simulator, SimulatorConfig,
    Source, TransitionOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn local_config() -> SimulatorConfig {
    SimulatorConfig {
        hardware: false,
        ..SimulatorConfig::default()
    }
}

async fn started(config: SimulatorConfig) -> Simulator {
    let sim = Simulator::new(config);
    sim.start().await.unwrap();
    sim
}

async fn press(sim: &Simulator, codes: &[u32]) {
    for code in codes {
        sim.submit(*code, Source::Local).await.unwrap();
    }
}

async fn wait_for(rx: &mut watch::Receiver<ListenerState>, want: ListenerState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
        .await
        .unwrap()
        .unwrap();
}

// ── Local commands ──────────────────────────────────────────────────

#[tokio::test]
async fn test_local_commands_update_snapshot() {
    let sim = started(local_config()).await;
    assert_eq!(sim.snapshot().revision, 0);

    press(&sim, &[0x10, 0x11, 0x11, 0x13]).await;

    let snap = sim.snapshot();
    assert!(snap.powered_on);
    assert_eq!(snap.volume, 52);
    assert!(snap.muted);
    assert_eq!(snap.notification.as_deref(), Some("Mute: ON"));
    assert_eq!(snap.last_button.as_deref(), Some("Mute"));
    assert_eq!(snap.revision, 4);

    sim.shutdown().await;
}

#[tokio::test]
async fn test_submit_returns_transition() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10]).await;

    let transition = sim.submit(0x50, Source::Local).await.unwrap();
    assert_eq!(transition.outcome, TransitionOutcome::ChannelEntryPending);
    sim.submit(0x50, Source::Local).await.unwrap();
    let transition = sim.submit(0x50, Source::Local).await.unwrap();
    assert_eq!(transition.notification, "Invalid channel: 000");
    assert!(transition.events.is_empty());
    assert_eq!(sim.snapshot().channel, 1);

    sim.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_submitters_are_serialized() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10]).await;
    let start_volume = sim.snapshot().volume;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let sim = sim.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..3 {
                sim.submit(0x12, Source::Local).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snap = sim.snapshot();
    assert_eq!(snap.volume, start_volume - 30);
    assert_eq!(snap.revision, 31);
    sim.shutdown().await;
}

// ── Ephemeral expiry ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_partial_channel_entry_expires() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10, 0x54, 0x55]).await;
    assert_eq!(sim.snapshot().channel_entry, "45");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(sim.snapshot().channel_entry, "45");

    tokio::time::sleep(Duration::from_millis(800)).await;
    let snap = sim.snapshot();
    assert_eq!(snap.channel_entry, "");
    assert_eq!(snap.notification, None);
    assert_eq!(snap.channel, 1);
    assert_eq!(snap.current_app, Some(App::Home));

    sim.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_newer_notification_is_not_cleared_early() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10]).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    press(&sim, &[0x11]).await;

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(sim.snapshot().notification.as_deref(), Some("Volume: 51%"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(sim.snapshot().notification, None);

    sim.shutdown().await;
}

// ── Observers ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_observer_receives_current_then_each_mutation() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10]).await;

    let (observer, mut rx) = ChannelObserver::new();
    sim.register(Arc::new(observer));

    let ObserverMessage::Snapshot(first) = rx.recv().await.unwrap() else {
        panic!("expected snapshot");
    };
    assert_eq!(first.revision, 1);
    assert!(first.powered_on);

    press(&sim, &[0x14]).await;
    let ObserverMessage::Snapshot(next) = rx.recv().await.unwrap() else {
        panic!("expected snapshot");
    };
    assert_eq!(next.revision, 2);
    assert_eq!(next.channel, 2);

    sim.shutdown().await;
}

#[tokio::test]
async fn test_snapshot_stream_follows_changes() {
    let sim = started(local_config()).await;
    let mut stream = sim.subscribe();

    press(&sim, &[0x10]).await;
    let snap = stream.changed().await.unwrap();
    assert!(snap.powered_on);

    sim.shutdown().await;
}

#[tokio::test]
async fn test_snapshot_stream_adapter_yields_current_first() {
    let sim = started(local_config()).await;
    press(&sim, &[0x10]).await;

    let mut stream = sim.subscribe().into_stream();
    assert_eq!(stream.next().await.unwrap().revision, 1);

    press(&sim, &[0x11]).await;
    let next = stream.next().await.unwrap();
    assert_eq!(next.revision, 2);
    assert_eq!(next.volume, 51);

    sim.shutdown().await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_after_shutdown_fails() {
    let sim = started(local_config()).await;
    sim.shutdown().await;
    let err = sim.submit(0x10, Source::Local).await.unwrap_err();
    assert!(matches!(err, CoreError::SimulatorStopped));
}

// ── Hardware path ───────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn test_hardware_commands_survive_reconnect() {
    use tvsim_ipc::ControllerClient;

    let dir = tempfile::tempdir().unwrap();
    let endpoint = dir.path().join("tv.sock").display().to_string();
    let sim = started(SimulatorConfig {
        endpoint: endpoint.clone(),
        ..SimulatorConfig::default()
    })
    .await;

    let mut listener = sim.listener_state();
    wait_for(&mut listener, ListenerState::Listening).await;
    let mut events = sim.events();

    let mut controller = ControllerClient::connect(&endpoint).await.unwrap();
    controller.send(0x10).await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.code, 0x10);
    assert_eq!(event.name, "Power");
    controller.close().await.unwrap();

    wait_for(&mut listener, ListenerState::Listening).await;

    let mut controller = ControllerClient::connect(&endpoint).await.unwrap();
    controller.send(0x13).await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.name, "Mute");

    let snap = sim.snapshot();
    assert!(snap.powered_on);
    assert!(snap.muted);

    sim.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_setup_failure_keeps_local_commands_working() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = dir
        .path()
        .join("missing")
        .join("tv.sock")
        .display()
        .to_string();
    let sim = started(SimulatorConfig {
        endpoint,
        ..SimulatorConfig::default()
    })
    .await;

    let mut listener = sim.listener_state();
    wait_for(&mut listener, ListenerState::Failed).await;

    press(&sim, &[0x10]).await;
    assert!(sim.snapshot().powered_on);
    sim.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_dropping_last_handle_releases_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tv.sock");
    let sim = started(SimulatorConfig {
        endpoint: path.display().to_string(),
        ..SimulatorConfig::default()
    })
    .await;

    let mut listener = sim.listener_state();
    wait_for(&mut listener, ListenerState::Listening).await;
    let clone = sim.clone();
    drop(sim);
    assert!(path.exists(), "a live clone keeps the endpoint open");
    drop(clone);

    wait_for(&mut listener, ListenerState::Idle).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while path.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_local_commands_emit_no_events() {
    let sim = started(local_config()).await;
    let mut events = sim.events();
    press(&sim, &[0x10, 0x11]).await;
    assert!(events.try_recv().is_err());
    sim.shutdown().await;
}
