//! `tvsim send`: act as the remote control.

use std::time::Duration;

use tracing::info;

use tvsim_ipc::{ControllerClient, RetryPolicy};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = util::load_config(global)?;
    let codes = args
        .buttons
        .iter()
        .map(|b| util::resolve_button(b))
        .collect::<Result<Vec<_>, _>>()?;

    let mut policy = config.retry_policy();
    if let Some(retries) = args.retries {
        policy.retries = retries;
    }
    if let Some(delay) = args.retry_delay {
        policy.delay = delay;
    }

    let presses = press_all(&config.endpoint, &codes, &policy, args.delay, global.quiet);
    tokio::time::timeout(args.timeout, presses)
        .await
        .map_err(|_| CliError::Timeout {
            elapsed: humantime::format_duration(args.timeout).to_string(),
        })?
}

async fn press_all(
    endpoint: &str,
    codes: &[u32],
    policy: &RetryPolicy,
    delay: Option<Duration>,
    quiet: bool,
) -> Result<(), CliError> {
    let mut client = ControllerClient::connect_with_retry(endpoint, policy).await?;

    for (i, code) in codes.iter().copied().enumerate() {
        if let Some(delay) = delay.filter(|_| i > 0) {
            tokio::time::sleep(delay).await;
        }
        client.send(code).await?;
        info!(code = %format!("0x{code:02X}"), "frame sent");
        output::print_output(&format!("sent {}", util::describe(code)), quiet);
    }

    client.close().await?;
    Ok(())
}
