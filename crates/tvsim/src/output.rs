//! Output formatting: table, JSON, YAML, plain, and snapshot lines.
//!
//! Stdout carries command output only; logs go to stderr or `--log-file`.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use tvsim_core::{InterruptEvent, Snapshot};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color ────────────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
///
/// `table` goes through `to_row`; `plain` emits `id_fn` per line.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Snapshot lines (`tvsim run`) ─────────────────────────────────────

pub fn snapshot_json(snapshot: &Snapshot) -> Result<String, CliError> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn event_json(event: &InterruptEvent) -> Result<String, CliError> {
    Ok(serde_json::to_string(event)?)
}

/// One-line human summary of a snapshot.
pub fn snapshot_pretty(snapshot: &Snapshot, color: bool) -> String {
    let mut line = format!("#{:<4} ", snapshot.revision);

    if !snapshot.powered_on {
        let _ = write!(line, "{}", paint("OFF", color, Paint::Dim));
        append_notification(&mut line, snapshot, color);
        return line;
    }

    let _ = write!(line, "{}", paint("ON ", color, Paint::Good));
    let volume = format!("vol {:>3}", snapshot.volume);
    if snapshot.muted {
        let _ = write!(line, " {}", paint(&format!("{volume} (muted)"), color, Paint::Warn));
    } else {
        let _ = write!(line, " {volume}");
    }
    let _ = write!(line, "  ch {:>3}  {}", snapshot.channel, snapshot.input_source);
    if let Some(app) = snapshot.current_app {
        let _ = write!(line, "  app {app}");
    }
    if snapshot.game_mode {
        let _ = write!(line, "  {}", paint("game", color, Paint::Accent));
    }
    if !snapshot.channel_entry.is_empty() {
        let _ = write!(line, "  entry {}_", snapshot.channel_entry);
    }
    append_notification(&mut line, snapshot, color);
    line
}

pub fn event_pretty(event: &InterruptEvent, color: bool) -> String {
    let label = paint("interrupt", color, Paint::Accent);
    format!("      {label} {} (0x{:02X})", event.name, event.code)
}

fn append_notification(line: &mut String, snapshot: &Snapshot, color: bool) {
    if let Some(text) = &snapshot.notification {
        let _ = write!(line, "  » {}", paint(text, color, Paint::Accent));
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Good,
    Warn,
    Accent,
    Dim,
}

fn paint(text: &str, color: bool, paint: Paint) -> String {
    if !color {
        return text.to_owned();
    }
    match paint {
        Paint::Good => text.green().to_string(),
        Paint::Warn => text.yellow().to_string(),
        Paint::Accent => text.cyan().to_string(),
        Paint::Dim => text.dimmed().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use tvsim_core::{Command, DeviceState, apply};

    use super::*;

    fn capture(codes: &[u32]) -> Snapshot {
        let mut state = DeviceState::default();
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        for code in codes {
            apply(&mut state, &Command::local(*code), now);
        }
        Snapshot::capture(&state, u64::try_from(codes.len()).unwrap(), now)
    }

    #[test]
    fn pretty_line_without_color() {
        let line = snapshot_pretty(&capture(&[0x10, 0x13]), false);
        assert_eq!(line, "#2    ON  vol  50 (muted)  ch   1  HDMI 1  app Home  » Mute: ON");
    }

    #[test]
    fn pretty_line_when_off() {
        let line = snapshot_pretty(&capture(&[0x11]), false);
        assert_eq!(line, "#1    OFF  » Button: Volume Up");
    }

    #[test]
    fn json_line_is_compact() {
        let json = snapshot_json(&capture(&[0x10])).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"powered_on\":true"));
    }
}
