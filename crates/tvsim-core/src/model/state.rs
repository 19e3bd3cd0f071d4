// ── Device state ──
//
// The single mutable appliance record. Only `machine::apply` and
// `machine::sweep` write to it; everything else sees snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

pub const VOLUME_MAX: u8 = 100;
pub const CHANNEL_MIN: u16 = 1;
pub const CHANNEL_MAX: u16 = 999;

/// Digits needed to commit a channel entry.
pub const CHANNEL_ENTRY_LEN: usize = 3;

/// Foreground application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum App {
    Home,
    YouTube,
    Netflix,
    #[serde(rename = "Amazon Prime")]
    #[strum(serialize = "Amazon Prime")]
    AmazonPrime,
    #[serde(rename = "HBO Max")]
    #[strum(serialize = "HBO Max")]
    HboMax,
}

/// Input selector, cycled by Input and Source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum InputSource {
    #[default]
    #[serde(rename = "HDMI 1")]
    #[strum(serialize = "HDMI 1")]
    Hdmi1,
    #[serde(rename = "HDMI 2")]
    #[strum(serialize = "HDMI 2")]
    Hdmi2,
    #[serde(rename = "HDMI 3")]
    #[strum(serialize = "HDMI 3")]
    Hdmi3,
    #[serde(rename = "HDMI 4")]
    #[strum(serialize = "HDMI 4")]
    Hdmi4,
    #[serde(rename = "TV")]
    #[strum(serialize = "TV")]
    Tv,
    Component,
    #[serde(rename = "AV")]
    #[strum(serialize = "AV")]
    Av,
}

impl InputSource {
    /// Next source in the fixed cycle, wrapping to the first.
    pub fn next(self) -> Self {
        Self::iter()
            .cycle()
            .skip_while(|s| *s != self)
            .nth(1)
            .unwrap_or_default()
    }
}

/// Exclusive on-screen panel. Info is tracked separately because it
/// layers over either of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overlay {
    #[default]
    None,
    Menu,
    Settings,
}

/// Partially typed channel number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEntry {
    pub digits: String,
    pub last_digit_at: Option<DateTime<Utc>>,
}

impl ChannelEntry {
    pub fn clear(&mut self) {
        self.digits.clear();
        self.last_digit_at = None;
    }
}

/// Transient message for observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub text: Option<String>,
    pub set_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub powered_on: bool,
    pub volume: u8,
    pub muted: bool,
    pub channel: u16,
    pub current_app: Option<App>,
    pub input_source: InputSource,
    pub game_mode: bool,
    pub overlay: Overlay,
    pub info: bool,
    pub channel_entry: ChannelEntry,
    pub notification: Notification,
    /// Name of the last button received, powered or not.
    pub last_button: Option<String>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            powered_on: false,
            volume: 50,
            muted: false,
            channel: CHANNEL_MIN,
            current_app: Some(App::Home),
            input_source: InputSource::default(),
            game_mode: false,
            overlay: Overlay::None,
            info: false,
            channel_entry: ChannelEntry::default(),
            notification: Notification::default(),
            last_button: None,
        }
    }
}

impl DeviceState {
    /// Drop every on-screen panel, Info included.
    pub fn clear_overlays(&mut self) {
        self.overlay = Overlay::None;
        self.info = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn startup_defaults() {
        let state = DeviceState::default();
        assert!(!state.powered_on);
        assert_eq!(state.volume, 50);
        assert_eq!(state.channel, 1);
        assert_eq!(state.current_app, Some(App::Home));
        assert_eq!(state.input_source, InputSource::Hdmi1);
        assert!(state.channel_entry.digits.is_empty());
    }

    #[test]
    fn input_cycle_wraps() {
        let mut source = InputSource::Hdmi1;
        let mut seen = Vec::new();
        for _ in 0..7 {
            source = source.next();
            seen.push(source.to_string());
        }
        assert_eq!(
            seen,
            ["HDMI 2", "HDMI 3", "HDMI 4", "TV", "Component", "AV", "HDMI 1"]
        );
    }

    #[test]
    fn app_names() {
        assert_eq!(App::AmazonPrime.to_string(), "Amazon Prime");
        assert_eq!(
            serde_json::to_string(&App::HboMax).unwrap(),
            "\"HBO Max\""
        );
    }
}
