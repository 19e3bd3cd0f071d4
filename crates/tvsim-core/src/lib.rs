// tvsim-core: state machine and observer fan-out between the transport and consumers.

pub mod config;
pub mod error;
pub mod ingress;
pub mod machine;
pub mod model;
pub mod simulator;
pub mod sink;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SimulatorConfig;
pub use error::CoreError;
pub use machine::{SweepResult, Transition, TransitionOutcome, apply, sweep};
pub use simulator::Simulator;
pub use sink::{BroadcastSink, ChannelObserver, Observer, ObserverId, ObserverMessage};
pub use stream::SnapshotStream;

pub use model::{
    App, Button, ButtonGroup, Command, DeviceState, EventKind, InputSource, InterruptEvent,
    Overlay, Snapshot, Source, parse_code,
};

pub use tvsim_ipc::ListenerState;
