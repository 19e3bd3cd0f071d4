use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{App, DeviceState, InputSource, Overlay};

/// Immutable, flat copy of [`DeviceState`] pushed to observers.
///
/// Fully re-serialized on every broadcast. `revision` increases by one
/// per mutation so observers can spot gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub revision: u64,
    pub updated_at: DateTime<Utc>,

    pub powered_on: bool,
    pub volume: u8,
    pub muted: bool,
    pub channel: u16,
    pub current_app: Option<App>,
    pub input_source: InputSource,
    pub game_mode: bool,
    pub overlay: Overlay,
    pub info: bool,
    pub channel_entry: String,
    pub notification: Option<String>,
    pub last_button: Option<String>,
}

impl Snapshot {
    pub fn capture(state: &DeviceState, revision: u64, updated_at: DateTime<Utc>) -> Self {
        Self {
            revision,
            updated_at,
            powered_on: state.powered_on,
            volume: state.volume,
            muted: state.muted,
            channel: state.channel,
            current_app: state.current_app,
            input_source: state.input_source,
            game_mode: state.game_mode,
            overlay: state.overlay,
            info: state.info,
            channel_entry: state.channel_entry.digits.clone(),
            notification: state.notification.text.clone(),
            last_button: state.last_button.clone(),
        }
    }
}
