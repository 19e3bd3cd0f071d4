//! Cross-process control channel for the tvsim appliance simulator.
//!
//! An external controller attaches to a local endpoint (a Unix domain
//! socket, or a message-mode named pipe on Windows) and writes 4-byte
//! little-endian command codes. The [`listener`] loop accepts controllers
//! one at a time, forwards every code into an ingress channel, and comes
//! back to listening whenever a controller detaches.
//!
//! [`client::ControllerClient`] is the matching controller side.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod listener;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod pipe;

pub use client::{ControllerClient, RetryPolicy};
pub use endpoint::{
    Connection, DEFAULT_PIPE_NAME, DEFAULT_SOCKET_PATH, Endpoint, PlatformEndpoint, ReadOutcome,
    create_platform_endpoint, default_identity,
};
pub use error::Error;
pub use listener::{ListenerConfig, ListenerHandle, ListenerState, spawn_listener};
