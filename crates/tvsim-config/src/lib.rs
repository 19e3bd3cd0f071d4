//! Configuration for the tvsim simulator and controller client.
//!
//! Layered with figment: built-in defaults, then `config.toml` in the
//! platform config directory, then `TVSIM_`-prefixed environment
//! variables (nested keys use a double underscore, e.g.
//! `TVSIM_CLIENT__RETRIES=5`). Translates into
//! `tvsim_core::SimulatorConfig` and `tvsim_ipc::RetryPolicy`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tvsim_core::SimulatorConfig;
use tvsim_ipc::RetryPolicy;

const ENV_PREFIX: &str = "TVSIM_";
const SWEEP_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 10..=1000;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Socket path (Unix) or pipe name (Windows).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Start the transport listener.
    #[serde(default = "default_hardware")]
    pub hardware: bool,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Lifetime of notifications and partial channel entries.
    #[serde(default = "default_ephemeral_timeout_ms")]
    pub ephemeral_timeout_ms: u64,

    #[serde(default = "default_ingress_capacity")]
    pub ingress_capacity: usize,

    #[serde(default = "default_accept_retry_ms")]
    pub accept_retry_ms: u64,

    /// Settings for `tvsim send`.
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            hardware: default_hardware(),
            sweep_interval_ms: default_sweep_interval_ms(),
            ephemeral_timeout_ms: default_ephemeral_timeout_ms(),
            ingress_capacity: default_ingress_capacity(),
            accept_retry_ms: default_accept_retry_ms(),
            client: ClientConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_endpoint() -> String {
    tvsim_ipc::default_identity().into()
}
fn default_hardware() -> bool {
    true
}
fn default_sweep_interval_ms() -> u64 {
    100
}
fn default_ephemeral_timeout_ms() -> u64 {
    2000
}
fn default_ingress_capacity() -> usize {
    64
}
fn default_accept_retry_ms() -> u64 {
    100
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(invalid("endpoint", "must not be empty"));
        }
        if !SWEEP_INTERVAL_RANGE_MS.contains(&self.sweep_interval_ms) {
            return Err(invalid(
                "sweep_interval_ms",
                format!(
                    "{} is outside {}..={}",
                    self.sweep_interval_ms,
                    SWEEP_INTERVAL_RANGE_MS.start(),
                    SWEEP_INTERVAL_RANGE_MS.end()
                ),
            ));
        }
        if self.ephemeral_timeout_ms == 0 {
            return Err(invalid("ephemeral_timeout_ms", "must be greater than 0"));
        }
        if self.ingress_capacity == 0 {
            return Err(invalid("ingress_capacity", "must be greater than 0"));
        }
        Ok(())
    }

    /// Translate into the runtime settings of `tvsim_core::Simulator`.
    pub fn to_simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            endpoint: self.endpoint.clone(),
            hardware: self.hardware,
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            ephemeral_timeout: Duration::from_millis(self.ephemeral_timeout_ms),
            ingress_capacity: self.ingress_capacity,
            accept_retry: Duration::from_millis(self.accept_retry_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.client.retries,
            delay: Duration::from_millis(self.client.retry_delay_ms),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tvsim", "tvsim").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tvsim");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate config from an explicit file + environment. A
/// missing file is not an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
