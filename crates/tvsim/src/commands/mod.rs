//! Command dispatch: bridges CLI args to the simulator, the controller
//! client and output formatting.

pub mod buttons;
pub mod config_cmd;
pub mod run;
pub mod send;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Send(args) => send::handle(args, global).await,
        Command::Buttons(args) => buttons::handle(&args, global),
        Command::Config(args) => config_cmd::handle(args, global),
        // Generated in main before dispatch.
        Command::Completions(_) => Ok(()),
    }
}
