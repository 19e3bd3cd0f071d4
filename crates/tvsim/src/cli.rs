//! Clap derive structures for the `tvsim` CLI.
//!
//! Only depends on clap, clap_complete and humantime so `build.rs` can
//! include it for man page generation.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tvsim -- a TV appliance you can drive with a remote control
#[derive(Debug, Parser)]
#[command(
    name = "tvsim",
    version,
    about = "Simulate a remote-controllable TV",
    long_about = "Runs a simulated TV that listens for 4-byte button codes on a local\n\
        socket (named pipe on Windows) and publishes every state change.\n\n\
        `tvsim send` plays the remote control side.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to load instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Socket path (Unix) or pipe name (Windows); overrides the config file
    #[arg(long, short = 'e', global = true, value_name = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

/// How `tvsim run` prints snapshots.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SnapshotFormat {
    /// One compact JSON object per line
    Json,
    /// Colored one-line summary
    Pretty,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the simulator and print every snapshot
    Run(RunArgs),

    /// Send button presses to a running simulator
    #[command(alias = "press")]
    Send(SendArgs),

    /// List the remote's buttons and their codes
    #[command(alias = "ls")]
    Buttons(ButtonsArgs),

    /// Inspect or create the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Do not open the controller endpoint; only local commands apply
    #[arg(long)]
    pub no_hardware: bool,

    /// Read button names or codes from stdin, one per line
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Also print interrupt events for hardware commands
    #[arg(long)]
    pub events: bool,

    /// Snapshot output format
    #[arg(long, short = 'o', default_value = "json")]
    pub output: SnapshotFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

// ── send ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Button names ("power", "volume-up", "5") or codes ("0x10", "16")
    #[arg(required = true, num_args = 1..)]
    pub buttons: Vec<String>,

    /// Pause between presses (e.g. 250ms, 1s)
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,

    /// Connection attempts after the first one fails
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between connection attempts
    #[arg(long, value_parser = humantime::parse_duration)]
    pub retry_delay: Option<Duration>,

    /// Give up after this long
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

// ── buttons ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ButtonsArgs {
    /// Only list buttons from this group (e.g. "Basic", "D-Pad")
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub output: OutputFormat,
}

// ── config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

// ── completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
