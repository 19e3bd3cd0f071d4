//! Unix domain socket endpoint (stream mode).
//!
//! The listening socket survives controller detaches, so `recreate` is a
//! no-op. Frames are read with `read_exact`: an EOF before all four bytes
//! arrive is reported as [`ReadOutcome::EndOfStream`].

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info};

use crate::endpoint::{Connection, Endpoint, ReadOutcome};
use crate::error::Error;
use crate::frame::{self, FRAME_LEN};

/// Listening Unix socket bound to a filesystem path.
#[derive(Debug)]
pub struct UnixSocketEndpoint {
    path: PathBuf,
    identity: String,
    listener: Option<UnixListener>,
}

impl UnixSocketEndpoint {
    /// Bind the socket, replacing a stale socket file left by a previous run.
    /// Any other kind of file at `path` is left alone and fails setup.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let identity = path.display().to_string();

        let setup_failed = |source| Error::SetupFailed {
            endpoint: identity.clone(),
            source,
        };

        remove_stale_socket(&path).map_err(setup_failed)?;
        let listener = UnixListener::bind(&path).map_err(setup_failed)?;

        info!(endpoint = %identity, "created unix socket endpoint");
        Ok(Self {
            path,
            identity,
            listener: Some(listener),
        })
    }
}

impl Endpoint for UnixSocketEndpoint {
    type Connection = UnixSocketConnection;

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn accept(&mut self) -> Result<UnixSocketConnection, Error> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            Error::AcceptFailed(io::Error::new(
                io::ErrorKind::NotConnected,
                "endpoint is closed",
            ))
        })?;
        let (stream, _addr) = listener.accept().await.map_err(Error::AcceptFailed)?;
        Ok(UnixSocketConnection {
            stream: Some(stream),
        })
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            let _ = std::fs::remove_file(&self.path);
            debug!(endpoint = %self.identity, "unix socket endpoint closed");
        }
    }
}

impl Drop for UnixSocketEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

/// One accepted controller stream.
#[derive(Debug)]
pub struct UnixSocketConnection {
    stream: Option<UnixStream>,
}

impl Connection for UnixSocketConnection {
    async fn read_command(&mut self) -> Result<ReadOutcome, Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(ReadOutcome::EndOfStream);
        };

        let mut buf = [0u8; FRAME_LEN];
        match stream.read_exact(&mut buf).await {
            Ok(_) => Ok(frame::decode(&buf)
                .map_or(ReadOutcome::Malformed { len: buf.len() }, ReadOutcome::Code)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(ReadOutcome::EndOfStream),
            Err(e) => Err(Error::ReadFailed(e)),
        }
    }

    fn close(&mut self) {
        self.stream.take();
    }
}

fn remove_stale_socket(path: &Path) -> io::Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.file_type().is_socket() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a socket",
        ));
    }
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
