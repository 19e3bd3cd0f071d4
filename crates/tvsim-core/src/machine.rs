// ── Device state machine ──
//
// Pure transition logic: (state, command, now) -> (state', notification,
// events). No I/O and no clock reads; the owning loop supplies `now`.

use std::mem;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::state::{CHANNEL_ENTRY_LEN, CHANNEL_MAX, CHANNEL_MIN, VOLUME_MAX};
use crate::model::{App, Button, Command, DeviceState, InterruptEvent, Overlay, Source};

/// What a command did, beyond the notification text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// State changed.
    Applied,
    /// A named button with no state effect.
    NoEffect,
    /// Device is off; only `notification` and `last_button` changed.
    PoweredOff,
    /// A digit was buffered; the channel is not committed yet.
    ChannelEntryPending,
    /// Three digits parsed outside `[1, 999]`. Channel unchanged.
    InvalidChannelEntry { digits: String },
    /// Code not in the button table. State unchanged.
    UnknownCommand { code: u32 },
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub notification: String,
    pub outcome: TransitionOutcome,
    pub events: Vec<InterruptEvent>,
}

/// Apply one command to the device state.
pub fn apply(state: &mut DeviceState, command: &Command, now: DateTime<Utc>) -> Transition {
    let button = Button::from_code(command.code);
    let name = button.map_or_else(
        || format!("Unknown (0x{:02X})", command.code),
        |b| b.name().to_owned(),
    );

    let (notification, outcome) = match button {
        None => (
            format!("Unknown command (0x{:02X})", command.code),
            TransitionOutcome::UnknownCommand { code: command.code },
        ),
        Some(Button::Power) => toggle_power(state),
        Some(b) if !state.powered_on => (
            format!("Button: {}", b.name()),
            TransitionOutcome::PoweredOff,
        ),
        Some(b) => press(state, b, now),
    };

    state.last_button = Some(name.clone());
    state.notification.text = Some(notification.clone());
    state.notification.set_at = Some(now);

    let events = match command.source {
        Source::Hardware => vec![InterruptEvent::new(command.code, name, now)],
        Source::Local => Vec::new(),
    };

    Transition {
        notification,
        outcome,
        events,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

fn toggle_power(state: &mut DeviceState) -> (String, TransitionOutcome) {
    state.powered_on = !state.powered_on;
    if state.powered_on && state.current_app.is_none() {
        state.current_app = Some(App::Home);
    }
    (
        format!("Power: {}", on_off(state.powered_on)),
        TransitionOutcome::Applied,
    )
}

fn toggle_overlay(state: &mut DeviceState, overlay: Overlay, label: &str) -> String {
    state.overlay = if state.overlay == overlay {
        Overlay::None
    } else {
        overlay
    };
    format!("{label}: {}", on_off(state.overlay == overlay))
}

fn open_app(state: &mut DeviceState, app: App) -> (String, TransitionOutcome) {
    state.current_app = Some(app);
    (format!("Opening {app}..."), TransitionOutcome::Applied)
}

fn tune(state: &mut DeviceState, channel: u16) -> String {
    state.channel = channel;
    state.current_app = None;
    format!("Channel: {channel}")
}

/// Handle a button on a powered device. Power itself never reaches here.
fn press(state: &mut DeviceState, button: Button, now: DateTime<Utc>) -> (String, TransitionOutcome) {
    let applied = |text: String| (text, TransitionOutcome::Applied);

    match button {
        Button::VolumeUp => {
            state.volume = state.volume.saturating_add(1).min(VOLUME_MAX);
            applied(format!("Volume: {}%", state.volume))
        }
        Button::VolumeDown => {
            state.volume = state.volume.saturating_sub(1);
            applied(format!("Volume: {}%", state.volume))
        }
        Button::Mute => {
            state.muted = !state.muted;
            applied(format!("Mute: {}", on_off(state.muted)))
        }
        Button::ChannelUp => {
            let next = state.channel % CHANNEL_MAX + 1;
            applied(tune(state, next))
        }
        Button::ChannelDown => {
            let next = (state.channel + CHANNEL_MAX - 2) % CHANNEL_MAX + 1;
            applied(tune(state, next))
        }
        Button::Home => {
            state.current_app = Some(App::Home);
            state.clear_overlays();
            applied("Home".to_owned())
        }
        Button::Menu => applied(toggle_overlay(state, Overlay::Menu, "Menu")),
        Button::Settings => applied(toggle_overlay(state, Overlay::Settings, "Settings")),
        Button::Info => {
            state.info = !state.info;
            applied(format!("Info: {}", on_off(state.info)))
        }
        Button::Back | Button::Exit => {
            state.clear_overlays();
            applied(button.name().to_owned())
        }
        Button::YouTube => open_app(state, App::YouTube),
        Button::Netflix => open_app(state, App::Netflix),
        Button::AmazonPrime => open_app(state, App::AmazonPrime),
        Button::HboMax => open_app(state, App::HboMax),
        Button::Input | Button::Source => {
            state.input_source = state.input_source.next();
            applied(format!("Input: {}", state.input_source))
        }
        Button::GameMode => {
            state.game_mode = !state.game_mode;
            applied(format!("Game Mode: {}", on_off(state.game_mode)))
        }
        Button::Play | Button::Pause | Button::Stop => {
            (button.name().to_owned(), TransitionOutcome::NoEffect)
        }
        other => match other.digit() {
            Some(digit) => enter_digit(state, digit, now),
            None => (
                format!("Button: {}", other.name()),
                TransitionOutcome::NoEffect,
            ),
        },
    }
}

fn enter_digit(state: &mut DeviceState, digit: u8, now: DateTime<Utc>) -> (String, TransitionOutcome) {
    let entry = &mut state.channel_entry;
    entry.digits.push(char::from(b'0' + digit));
    entry.last_digit_at = Some(now);

    if entry.digits.len() < CHANNEL_ENTRY_LEN {
        return (
            format!("Channel entry: {}", entry.digits),
            TransitionOutcome::ChannelEntryPending,
        );
    }

    let digits = mem::take(&mut entry.digits);
    entry.last_digit_at = None;

    match digits.parse::<u16>() {
        Ok(channel) if (CHANNEL_MIN..=CHANNEL_MAX).contains(&channel) => {
            (tune(state, channel), TransitionOutcome::Applied)
        }
        _ => (
            format!("Invalid channel: {digits}"),
            TransitionOutcome::InvalidChannelEntry { digits },
        ),
    }
}

// ── Ephemeral expiry ─────────────────────────────────────────────────

/// Which ephemeral fields a [`sweep`] cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepResult {
    pub channel_entry_cleared: bool,
    pub notification_cleared: bool,
}

impl SweepResult {
    pub fn changed(self) -> bool {
        self.channel_entry_cleared || self.notification_cleared
    }
}

fn expired(since: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    since.is_some_and(|at| (now - at).to_std().is_ok_and(|elapsed| elapsed > ttl))
}

/// Clear ephemeral fields older than `ttl`.
///
/// Compares against the stored timestamps, so a newer notification or
/// digit written after an older one is never cleared early.
pub fn sweep(state: &mut DeviceState, now: DateTime<Utc>, ttl: Duration) -> SweepResult {
    let mut result = SweepResult::default();

    if !state.channel_entry.digits.is_empty() && expired(state.channel_entry.last_digit_at, now, ttl)
    {
        state.channel_entry.clear();
        result.channel_entry_cleared = true;
    }

    if state.notification.text.is_some() && expired(state.notification.set_at, now, ttl) {
        state.notification.text = None;
        state.notification.set_at = None;
        result.notification_cleared = true;
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::InputSource;

    const TTL: Duration = Duration::from_secs(2);

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn at_ms(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    fn press_local(state: &mut DeviceState, button: Button) -> Transition {
        apply(state, &Command::local(u32::from(button.code())), t0())
    }

    fn powered() -> DeviceState {
        DeviceState {
            powered_on: true,
            ..DeviceState::default()
        }
    }

    fn enter(state: &mut DeviceState, digits: &str) -> Transition {
        let mut last = None;
        for c in digits.chars() {
            let code = 0x50 + c.to_digit(10).unwrap();
            last = Some(apply(state, &Command::local(code), t0()));
        }
        last.unwrap()
    }

    // ── Volume / mute ────────────────────────────────────────────────

    #[test]
    fn volume_stays_in_bounds() {
        let mut state = powered();
        for _ in 0..120 {
            press_local(&mut state, Button::VolumeUp);
            assert!(state.volume <= 100);
        }
        assert_eq!(state.volume, 100);
        assert_eq!(state.notification.text.as_deref(), Some("Volume: 100%"));

        for _ in 0..120 {
            press_local(&mut state, Button::VolumeDown);
        }
        assert_eq!(state.volume, 0);
    }

    #[test]
    fn mute_twice_restores() {
        let mut state = powered();
        let t = press_local(&mut state, Button::Mute);
        assert!(state.muted);
        assert_eq!(t.notification, "Mute: ON");
        press_local(&mut state, Button::Mute);
        assert!(!state.muted);
    }

    // ── Channels ─────────────────────────────────────────────────────

    #[test]
    fn channel_wraps_both_ways() {
        let mut state = powered();
        state.channel = 999;
        press_local(&mut state, Button::ChannelUp);
        assert_eq!(state.channel, 1);
        press_local(&mut state, Button::ChannelDown);
        assert_eq!(state.channel, 999);
        press_local(&mut state, Button::ChannelDown);
        assert_eq!(state.channel, 998);
    }

    #[test]
    fn channel_sequence_stays_in_range() {
        let mut state = powered();
        let pattern = [
            Button::ChannelDown,
            Button::ChannelDown,
            Button::ChannelUp,
            Button::ChannelDown,
            Button::ChannelUp,
            Button::ChannelUp,
        ];
        for button in pattern.iter().cycle().take(3000) {
            press_local(&mut state, *button);
            assert!((1..=999).contains(&state.channel));
        }
    }

    #[test]
    fn channel_change_leaves_app() {
        let mut state = powered();
        press_local(&mut state, Button::Netflix);
        assert_eq!(state.current_app, Some(App::Netflix));
        let t = press_local(&mut state, Button::ChannelUp);
        assert_eq!(state.current_app, None);
        assert_eq!(t.notification, "Channel: 2");
    }

    #[test]
    fn three_digits_commit() {
        let mut state = powered();
        let t = enter(&mut state, "456");
        assert_eq!(state.channel, 456);
        assert!(state.channel_entry.digits.is_empty());
        assert_eq!(state.current_app, None);
        assert_eq!(t.notification, "Channel: 456");
        assert_eq!(t.outcome, TransitionOutcome::Applied);

        enter(&mut state, "999");
        assert_eq!(state.channel, 999);
    }

    #[test]
    fn zero_channel_is_rejected() {
        let mut state = powered();
        state.channel = 42;
        let t = enter(&mut state, "000");
        assert_eq!(state.channel, 42);
        assert!(state.channel_entry.digits.is_empty());
        assert_eq!(t.notification, "Invalid channel: 000");
        assert_eq!(
            t.outcome,
            TransitionOutcome::InvalidChannelEntry {
                digits: "000".into()
            }
        );
        assert_eq!(state.current_app, Some(App::Home));
    }

    #[test]
    fn partial_entry_keeps_app_and_shows_progress() {
        let mut state = powered();
        press_local(&mut state, Button::YouTube);
        let t = enter(&mut state, "12");
        assert_eq!(t.notification, "Channel entry: 12");
        assert_eq!(t.outcome, TransitionOutcome::ChannelEntryPending);
        assert_eq!(state.current_app, Some(App::YouTube));
        assert_eq!(state.channel, 1);
    }

    // ── Power ────────────────────────────────────────────────────────

    #[test]
    fn power_on_restores_home_and_keeps_settings() {
        let mut state = powered();
        state.volume = 30;
        state.channel = 77;
        state.current_app = None;
        press_local(&mut state, Button::Power);
        assert!(!state.powered_on);
        let t = press_local(&mut state, Button::Power);
        assert!(state.powered_on);
        assert_eq!(t.notification, "Power: ON");
        assert_eq!(state.current_app, Some(App::Home));
        assert_eq!(state.volume, 30);
        assert_eq!(state.channel, 77);
    }

    #[test]
    fn powered_off_only_touches_notification() {
        let before = DeviceState::default();
        for button in Button::ALL.iter().filter(|b| **b != Button::Power) {
            let mut state = before.clone();
            let t = press_local(&mut state, *button);
            assert_eq!(t.notification, format!("Button: {}", button.name()));
            assert_eq!(t.outcome, TransitionOutcome::PoweredOff);

            let mut expected = before.clone();
            expected.notification = state.notification.clone();
            expected.last_button = state.last_button.clone();
            assert_eq!(state, expected);
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    #[test]
    fn menu_and_settings_exclude_each_other_but_not_info() {
        let mut state = powered();
        press_local(&mut state, Button::Info);
        press_local(&mut state, Button::Menu);
        assert_eq!(state.overlay, Overlay::Menu);
        press_local(&mut state, Button::Settings);
        assert_eq!(state.overlay, Overlay::Settings);
        assert!(state.info);

        let t = press_local(&mut state, Button::Settings);
        assert_eq!(state.overlay, Overlay::None);
        assert_eq!(t.notification, "Settings: OFF");
        assert!(state.info);
    }

    #[test]
    fn home_back_exit_clear_everything() {
        for button in [Button::Home, Button::Back, Button::Exit] {
            let mut state = powered();
            press_local(&mut state, Button::Menu);
            press_local(&mut state, Button::Info);
            press_local(&mut state, Button::Netflix);
            press_local(&mut state, button);
            assert_eq!(state.overlay, Overlay::None);
            assert!(!state.info);
            let expected_app = if button == Button::Home {
                App::Home
            } else {
                App::Netflix
            };
            assert_eq!(state.current_app, Some(expected_app));
        }
    }

    #[test]
    fn input_and_source_both_cycle() {
        let mut state = powered();
        let t = press_local(&mut state, Button::Input);
        assert_eq!(t.notification, "Input: HDMI 2");
        press_local(&mut state, Button::Source);
        assert_eq!(state.input_source, InputSource::Hdmi3);
    }

    #[test]
    fn apps_and_game_mode() {
        let mut state = powered();
        let t = press_local(&mut state, Button::AmazonPrime);
        assert_eq!(t.notification, "Opening Amazon Prime...");
        assert_eq!(state.current_app, Some(App::AmazonPrime));

        let t = press_local(&mut state, Button::GameMode);
        assert!(state.game_mode);
        assert_eq!(t.notification, "Game Mode: ON");
    }

    #[test]
    fn inert_buttons_only_notify() {
        let mut state = powered();
        let before = state.clone();
        let t = press_local(&mut state, Button::Guide);
        assert_eq!(t.notification, "Button: Guide");
        assert_eq!(t.outcome, TransitionOutcome::NoEffect);
        assert_eq!(state.volume, before.volume);

        let t = press_local(&mut state, Button::Pause);
        assert_eq!(t.notification, "Pause");
    }

    // ── Unknown codes / events ───────────────────────────────────────

    #[test]
    fn unknown_code_changes_nothing_but_notification() {
        let mut state = powered();
        let before = state.clone();
        let t = apply(&mut state, &Command::hardware(0x1FF), t0());
        assert_eq!(t.notification, "Unknown command (0x1FF)");
        assert_eq!(t.outcome, TransitionOutcome::UnknownCommand { code: 0x1FF });
        assert_eq!(state.last_button.as_deref(), Some("Unknown (0x1FF)"));
        assert_eq!(state.volume, before.volume);
        assert_eq!(state.channel, before.channel);
    }

    #[test]
    fn only_hardware_commands_emit_events() {
        let mut state = powered();
        let t = apply(&mut state, &Command::hardware(0x13), t0());
        assert_eq!(t.events.len(), 1);
        assert_eq!(t.events[0].code, 0x13);
        assert_eq!(t.events[0].name, "Mute");

        let t = apply(&mut state, &Command::local(0x13), t0());
        assert!(t.events.is_empty());
    }

    // ── Sweep ────────────────────────────────────────────────────────

    #[test]
    fn stale_entry_is_swept_without_tuning() {
        let mut state = powered();
        apply(&mut state, &Command::local(0x54), at_ms(0));
        apply(&mut state, &Command::local(0x55), at_ms(500));

        assert!(!sweep(&mut state, at_ms(2400), TTL).channel_entry_cleared);
        assert_eq!(state.channel_entry.digits, "45");

        let result = sweep(&mut state, at_ms(2600), TTL);
        assert!(result.channel_entry_cleared);
        assert!(state.channel_entry.digits.is_empty());
        assert_eq!(state.channel, 1);
    }

    #[test]
    fn newer_notification_survives_older_deadline() {
        let mut state = powered();
        apply(&mut state, &Command::local(0x11), at_ms(0));
        apply(&mut state, &Command::local(0x11), at_ms(1500));

        let result = sweep(&mut state, at_ms(2100), TTL);
        assert!(!result.changed());
        assert_eq!(state.notification.text.as_deref(), Some("Volume: 52%"));

        let result = sweep(&mut state, at_ms(3600), TTL);
        assert!(result.notification_cleared);
        assert_eq!(state.notification.text, None);
    }

    #[test]
    fn sweep_on_idle_state_is_noop() {
        let mut state = DeviceState::default();
        assert_eq!(sweep(&mut state, at_ms(10_000), TTL), SweepResult::default());
    }
}
