// ── Appliance domain model ──
//
// Buttons, commands, the mutable device record and the immutable
// snapshots observers receive.

pub mod button;
pub mod command;
pub mod event;
pub mod snapshot;
pub mod state;

pub use button::{Button, ButtonGroup, parse_code};
pub use command::{Command, Source};
pub use event::{EventKind, InterruptEvent};
pub use snapshot::Snapshot;
pub use state::{App, ChannelEntry, DeviceState, InputSource, Notification, Overlay};
