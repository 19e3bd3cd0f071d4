//! `tvsim run`: start the simulator and stream snapshots to stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, info};

use tvsim_core::{ChannelObserver, ObserverMessage, Simulator, Source};

use crate::cli::{GlobalOpts, RunArgs, SnapshotFormat};
use crate::error::CliError;
use crate::output;

use super::util;

type Console = Lines<BufReader<Stdin>>;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = util::load_config(global)?;
    if args.no_hardware {
        config.hardware = false;
    }

    let sim = Simulator::new(config.to_simulator_config());
    sim.start().await?;

    let (observer, rx) = ChannelObserver::new();
    let observer_id = sim.register(Arc::new(observer));

    let printer = Printer {
        format: args.output,
        events: args.events,
        color: output::should_color(global.color),
        quiet: global.quiet,
    };
    let console = args
        .interactive
        .then(|| BufReader::new(tokio::io::stdin()).lines());

    let result = session(&sim, rx, console, &printer).await;

    sim.unregister(observer_id);
    sim.shutdown().await;
    result
}

/// Print snapshots until Ctrl-C, or until stdin closes in interactive mode.
async fn session(
    sim: &Simulator,
    mut rx: mpsc::UnboundedReceiver<ObserverMessage>,
    mut console: Option<Console>,
    printer: &Printer,
) -> Result<(), CliError> {
    let mut printed: Option<u64> = None;
    // Revision to flush before leaving once stdin is exhausted.
    let mut closing: Option<u64> = None;

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupted");
                return Ok(());
            }
            msg = rx.recv() => {
                let Some(msg) = msg else { return Ok(()) };
                if let ObserverMessage::Snapshot(snapshot) = &msg {
                    printed = Some(snapshot.revision);
                }
                printer.print(&msg)?;
                if closing.is_some_and(|target| printed >= Some(target)) {
                    return Ok(());
                }
            }
            line = next_line(&mut console) => {
                let Some(line) = line? else {
                    console = None;
                    let target = sim.snapshot().revision;
                    if printed >= Some(target) {
                        return Ok(());
                    }
                    closing = Some(target);
                    continue;
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                match util::resolve_button(input) {
                    Ok(code) => {
                        let transition = sim.submit(code, Source::Local).await?;
                        debug!(input, notification = %transition.notification, "local command");
                    }
                    Err(err) => eprintln!("{:?}", miette::Report::new(err)),
                }
            }
        }
    }
}

async fn next_line(console: &mut Option<Console>) -> std::io::Result<Option<String>> {
    match console {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

// ── Printer ─────────────────────────────────────────────────────────

struct Printer {
    format: SnapshotFormat,
    events: bool,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn print(&self, msg: &ObserverMessage) -> Result<(), CliError> {
        let line = match (msg, self.format) {
            (ObserverMessage::Snapshot(snapshot), SnapshotFormat::Json) => {
                output::snapshot_json(snapshot)?
            }
            (ObserverMessage::Snapshot(snapshot), SnapshotFormat::Pretty) => {
                output::snapshot_pretty(snapshot, self.color)
            }
            (ObserverMessage::Interrupt(_), _) if !self.events => return Ok(()),
            (ObserverMessage::Interrupt(event), SnapshotFormat::Json) => output::event_json(event)?,
            (ObserverMessage::Interrupt(event), SnapshotFormat::Pretty) => {
                output::event_pretty(event, self.color)
            }
        };
        output::print_output(&line, self.quiet);
        Ok(())
    }
}
