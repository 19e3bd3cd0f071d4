//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with help text and stable
//! exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tvsim_config::ConfigError;
use tvsim_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the simulator at {endpoint}")]
    #[diagnostic(
        code(tvsim::connection_failed),
        help(
            "Check that `tvsim run` is running with the controller endpoint enabled.\n\
             Endpoint: {endpoint}"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: tvsim_ipc::Error,
    },

    #[error("Lost the connection to the simulator")]
    #[diagnostic(code(tvsim::transport))]
    Transport(#[source] tvsim_ipc::Error),

    #[error("Gave up after {elapsed}")]
    #[diagnostic(
        code(tvsim::timeout),
        help("Raise the limit with --timeout or shorten --delay.")
    )]
    Timeout { elapsed: String },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Unknown button '{input}'")]
    #[diagnostic(
        code(tvsim::unknown_button),
        help("List valid names and codes with: tvsim buttons")
    )]
    UnknownButton { input: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tvsim::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(tvsim::config),
        help("Inspect the effective settings with: tvsim config show")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(tvsim::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Simulator ────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(tvsim::simulator))]
    Simulator(#[from] CoreError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(tvsim::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(tvsim::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML serialization failed: {0}")]
    #[diagnostic(code(tvsim::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Transport(_) => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::UnknownButton { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ipc::Error → CliError mapping ────────────────────────────────────

impl From<tvsim_ipc::Error> for CliError {
    fn from(err: tvsim_ipc::Error) -> Self {
        if let tvsim_ipc::Error::ConnectFailed { endpoint, .. } = &err {
            return Self::ConnectionFailed {
                endpoint: endpoint.clone(),
                source: err,
            };
        }
        Self::Transport(err)
    }
}
