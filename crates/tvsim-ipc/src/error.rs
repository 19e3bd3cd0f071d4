use std::io;

use thiserror::Error;

/// Top-level error type for the `tvsim-ipc` crate.
///
/// Covers both sides of the control channel: the simulator's endpoint
/// (setup, accept, read) and the controller-side client (connect, write).
/// `tvsim-core` maps these into simulator-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Endpoint lifecycle ──────────────────────────────────────────
    /// The endpoint could not be created (bind / pipe creation failed).
    #[error("failed to set up endpoint {endpoint}: {source}")]
    SetupFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Waiting for a controller to attach failed.
    #[error("failed to accept controller connection: {0}")]
    AcceptFailed(#[source] io::Error),

    /// Reading a frame from an attached controller failed.
    #[error("failed to read from controller connection: {0}")]
    ReadFailed(#[source] io::Error),

    // ── Client ──────────────────────────────────────────────────────
    /// The controller client could not reach the endpoint.
    #[error("cannot connect to endpoint {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Writing a frame to the endpoint failed.
    #[error("failed to write frame: {0}")]
    WriteFailed(#[source] io::Error),
}

impl Error {
    /// Returns `true` if the listener should treat this error as a
    /// disconnect and go back to listening.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::AcceptFailed(_) | Self::ReadFailed(_))
    }

    /// Returns `true` if this error is fatal to the listener loop.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::SetupFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_classification() {
        let accept = Error::AcceptFailed(io::Error::other("boom"));
        let read = Error::ReadFailed(io::Error::from(io::ErrorKind::ConnectionReset));
        let setup = Error::SetupFailed {
            endpoint: "/tmp/x.sock".into(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };

        assert!(accept.is_disconnect());
        assert!(read.is_disconnect());
        assert!(!setup.is_disconnect());
        assert!(setup.is_setup());
        assert!(!accept.is_setup());
    }

    #[test]
    fn setup_error_names_the_endpoint() {
        let err = Error::SetupFailed {
            endpoint: "/tmp/phillips_remote_tv.sock".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/tmp/phillips_remote_tv.sock"));
    }
}
