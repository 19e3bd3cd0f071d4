// ── Endpoint contract ──
//
// One logical control channel, one controller at a time. The platform
// primitive (Unix domain socket or Windows message-mode named pipe) is
// picked once at startup; the listener loop only sees these traits.

use std::future::Future;

use crate::error::Error;

/// Default endpoint identity for Unix platforms.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/phillips_remote_tv.sock";

/// Default endpoint identity for Windows.
pub const DEFAULT_PIPE_NAME: &str = r"\\.\pipe\phillips_remote_tv";

/// The endpoint identity used when none is configured.
pub fn default_identity() -> &'static str {
    if cfg!(windows) {
        DEFAULT_PIPE_NAME
    } else {
        DEFAULT_SOCKET_PATH
    }
}

/// Result of a single successful read on a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete frame carrying a command code.
    Code(u32),
    /// A message of the wrong size. Dropped; the connection stays open.
    Malformed { len: usize },
    /// The controller went away (clean close or a short read).
    EndOfStream,
}

/// The simulator side of the control channel.
pub trait Endpoint: Send + 'static {
    type Connection: Connection;

    /// Configured path / pipe name. Recreation reuses it.
    fn identity(&self) -> &str;

    /// Wait until a controller attaches.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection, Error>> + Send;

    /// Prepare the endpoint for the next controller after a detach.
    ///
    /// Stream sockets keep listening and need nothing. Message-mode pipes
    /// are single-use and must rebuild their server instance here.
    fn recreate(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Release the endpoint. Idempotent, never fails.
    fn close(&mut self);
}

/// One attached controller.
pub trait Connection: Send + 'static {
    /// Wait for the next frame.
    fn read_command(&mut self) -> impl Future<Output = Result<ReadOutcome, Error>> + Send;

    /// Drop the controller. Idempotent, never fails.
    fn close(&mut self);
}

// ── Platform selection ──────────────────────────────────────────────

#[cfg(unix)]
pub type PlatformEndpoint = crate::unix::UnixSocketEndpoint;

#[cfg(windows)]
pub type PlatformEndpoint = crate::pipe::NamedPipeEndpoint;

/// Create the endpoint native to this platform.
#[cfg(unix)]
pub fn create_platform_endpoint(identity: &str) -> Result<PlatformEndpoint, Error> {
    crate::unix::UnixSocketEndpoint::create(identity)
}

/// Create the endpoint native to this platform.
#[cfg(windows)]
pub fn create_platform_endpoint(identity: &str) -> Result<PlatformEndpoint, Error> {
    crate::pipe::NamedPipeEndpoint::create(identity)
}
