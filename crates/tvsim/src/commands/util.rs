//! Shared helpers for command handlers.

use tvsim_config::Config;
use tvsim_core::{Button, parse_code};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load config from `--config` (or the platform path) and apply the
/// global flag overrides.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = match &global.config {
        Some(path) => tvsim_config::load_config_from(path)?,
        None => tvsim_config::load_config()?,
    };
    if let Some(endpoint) = &global.endpoint {
        config.endpoint.clone_from(endpoint);
        config.validate()?;
    }
    Ok(config)
}

/// Resolve a button name, alias, or numeric code.
pub fn resolve_button(input: &str) -> Result<u32, CliError> {
    parse_code(input).ok_or_else(|| CliError::UnknownButton {
        input: input.to_owned(),
    })
}

/// `Power (0x10)`, or just the hex code for codes outside the table.
pub fn describe(code: u32) -> String {
    match Button::from_code(code) {
        Some(button) => format!("{button} (0x{code:02X})"),
        None => format!("0x{code:02X}"),
    }
}
