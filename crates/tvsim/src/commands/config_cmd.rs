//! Config subcommand handlers.

use tvsim_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(tvsim_config::config_path);

    match args.command {
        ConfigCommand::Show => {
            let config = util::load_config(global)?;
            let text = toml::to_string_pretty(&config)?;
            output::print_output(text.trim_end(), global.quiet);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            tvsim_config::save_config_to(&Config::default(), &path)?;
            output::print_output(&format!("wrote {}", path.display()), global.quiet);
        }
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }
    }
    Ok(())
}
