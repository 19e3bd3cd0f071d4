//! `tvsim buttons`: the remote's code table.

use serde::Serialize;
use tabled::Tabled;

use tvsim_core::{Button, ButtonGroup};

use crate::cli::{ButtonsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Row types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ButtonInfo {
    code: u8,
    name: &'static str,
    group: ButtonGroup,
}

impl From<Button> for ButtonInfo {
    fn from(b: Button) -> Self {
        Self {
            code: b.code(),
            name: b.name(),
            group: b.group(),
        }
    }
}

#[derive(Tabled)]
struct ButtonRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Group")]
    group: String,
}

fn to_row(b: &ButtonInfo) -> ButtonRow {
    ButtonRow {
        code: format!("0x{:02X}", b.code),
        name: b.name,
        group: b.group.to_string(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ButtonsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let group = args.group.as_deref().map(parse_group).transpose()?;
    let buttons: Vec<ButtonInfo> = Button::ALL
        .iter()
        .copied()
        .filter(|b| group.is_none_or(|g| b.group() == g))
        .map(ButtonInfo::from)
        .collect();

    let out = output::render_list(args.output, &buttons, to_row, |b| b.name.to_owned())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn parse_group(input: &str) -> Result<ButtonGroup, CliError> {
    let wanted = input.replace(['-', ' '], "").to_lowercase();
    Button::ALL
        .iter()
        .map(|b| b.group())
        .find(|g| g.to_string().replace('-', "").to_lowercase() == wanted)
        .ok_or_else(|| CliError::Validation {
            field: "group".into(),
            reason: format!("no button group named '{input}'"),
        })
}
