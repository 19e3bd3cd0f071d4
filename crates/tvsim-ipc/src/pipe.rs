//! Windows named pipe endpoint (message mode).
//!
//! A single server instance serves one controller. After the controller
//! detaches the instance is disconnected and dropped, and
//! [`Endpoint::recreate`] builds a fresh one under the same name.

use std::io;

use tokio::io::AsyncReadExt;
use tokio::net::windows::named_pipe::{NamedPipeServer, PipeMode, ServerOptions};
use tracing::{debug, info};

use crate::endpoint::{Connection, Endpoint, ReadOutcome};
use crate::error::Error;
use crate::frame;

const PIPE_BUFFER_SIZE: u32 = 65_536;

/// Read buffer; anything larger than one frame is malformed anyway.
const READ_BUFFER_SIZE: usize = 64;

/// `ERROR_MORE_DATA`: the message did not fit the read buffer.
const ERROR_MORE_DATA: i32 = 234;

#[derive(Debug)]
pub struct NamedPipeEndpoint {
    name: String,
    server: Option<NamedPipeServer>,
}

impl NamedPipeEndpoint {
    /// Create the first pipe instance. Fails if another process already
    /// owns the name.
    pub fn create(name: &str) -> Result<Self, Error> {
        let server = build_server(name, true)?;
        info!(endpoint = %name, "created named pipe endpoint");
        Ok(Self {
            name: name.to_owned(),
            server: Some(server),
        })
    }
}

fn build_server(name: &str, first: bool) -> Result<NamedPipeServer, Error> {
    ServerOptions::new()
        .first_pipe_instance(first)
        .pipe_mode(PipeMode::Message)
        .max_instances(1)
        .in_buffer_size(PIPE_BUFFER_SIZE)
        .out_buffer_size(PIPE_BUFFER_SIZE)
        .create(name)
        .map_err(|source| Error::SetupFailed {
            endpoint: name.to_owned(),
            source,
        })
}

impl Endpoint for NamedPipeEndpoint {
    type Connection = NamedPipeConnection;

    fn identity(&self) -> &str {
        &self.name
    }

    async fn accept(&mut self) -> Result<NamedPipeConnection, Error> {
        let server = self.server.take().ok_or_else(closed)?;
        // A failed instance is dropped here so `recreate` builds a new one.
        server.connect().await.map_err(Error::AcceptFailed)?;
        Ok(NamedPipeConnection {
            server: Some(server),
        })
    }

    fn recreate(&mut self) -> Result<(), Error> {
        if self.server.is_none() {
            self.server = Some(build_server(&self.name, false)?);
            debug!(endpoint = %self.name, "named pipe instance recreated");
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.server.take().is_some() {
            debug!(endpoint = %self.name, "named pipe endpoint closed");
        }
    }
}

fn closed() -> Error {
    Error::AcceptFailed(io::Error::new(
        io::ErrorKind::NotConnected,
        "endpoint is closed",
    ))
}

/// The connected server instance.
#[derive(Debug)]
pub struct NamedPipeConnection {
    server: Option<NamedPipeServer>,
}

impl Connection for NamedPipeConnection {
    async fn read_command(&mut self) -> Result<ReadOutcome, Error> {
        let Some(server) = self.server.as_mut() else {
            return Ok(ReadOutcome::EndOfStream);
        };

        let mut buf = [0u8; READ_BUFFER_SIZE];
        match server.read(&mut buf).await {
            Ok(0) => Ok(ReadOutcome::EndOfStream),
            Ok(n) => {
                let message = buf.get(..n).unwrap_or_default();
                Ok(frame::decode(message).map_or(ReadOutcome::Malformed { len: n }, ReadOutcome::Code))
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(ReadOutcome::EndOfStream),
            Err(e) if e.raw_os_error() == Some(ERROR_MORE_DATA) => {
                // Drain the rest of the oversized message so the next read
                // starts on a message boundary.
                drain_message(server).await?;
                Ok(ReadOutcome::Malformed { len: READ_BUFFER_SIZE })
            }
            Err(e) => Err(Error::ReadFailed(e)),
        }
    }

    fn close(&mut self) {
        if let Some(server) = self.server.take() {
            let _ = server.disconnect();
        }
    }
}

async fn drain_message(server: &mut NamedPipeServer) -> Result<(), Error> {
    let mut scratch = [0u8; READ_BUFFER_SIZE];
    loop {
        match server.read(&mut scratch).await {
            Err(e) if e.raw_os_error() == Some(ERROR_MORE_DATA) => {}
            Ok(_) => return Ok(()),
            Err(e) => return Err(Error::ReadFailed(e)),
        }
    }
}

#[cfg(all(test, windows))]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::AsyncWriteExt;
    use tokio::net::windows::named_pipe::ClientOptions;

    use super::*;

    fn unique_name() -> String {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        format!(
            r"\\.\pipe\tvsim-test-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        )
    }

    #[tokio::test]
    async fn detach_then_recreate_serves_next_controller() {
        let name = unique_name();
        let mut endpoint = NamedPipeEndpoint::create(&name).unwrap();

        let mut client = ClientOptions::new().open(&name).unwrap();
        let mut conn = endpoint.accept().await.unwrap();
        client.write_all(&frame::encode(0x10)).await.unwrap();
        assert_eq!(conn.read_command().await.unwrap(), ReadOutcome::Code(0x10));

        drop(client);
        assert_eq!(conn.read_command().await.unwrap(), ReadOutcome::EndOfStream);
        conn.close();

        endpoint.recreate().unwrap();
        let mut client = ClientOptions::new().open(&name).unwrap();
        let mut conn = endpoint.accept().await.unwrap();
        client.write_all(&frame::encode(0x13)).await.unwrap();
        assert_eq!(conn.read_command().await.unwrap(), ReadOutcome::Code(0x13));
    }

    #[tokio::test]
    async fn failed_accept_is_replaced_on_recreate() {
        let name = unique_name();
        let mut endpoint = NamedPipeEndpoint::create(&name).unwrap();

        // Attach and leave before the server connects.
        drop(ClientOptions::new().open(&name).unwrap());
        let err = endpoint.accept().await.unwrap_err();
        assert!(err.is_disconnect());

        endpoint.recreate().unwrap();
        let mut client = ClientOptions::new().open(&name).unwrap();
        let mut conn = endpoint.accept().await.unwrap();
        client.write_all(&frame::encode(0x11)).await.unwrap();
        assert_eq!(conn.read_command().await.unwrap(), ReadOutcome::Code(0x11));
    }

    #[tokio::test]
    async fn oversized_message_is_drained() {
        let name = unique_name();
        let mut endpoint = NamedPipeEndpoint::create(&name).unwrap();
        let mut client = ClientOptions::new().open(&name).unwrap();
        let mut conn = endpoint.accept().await.unwrap();

        client.write_all(&[0xAB; 200]).await.unwrap();
        client.write_all(&[0x01, 0x02]).await.unwrap();
        client.write_all(&frame::encode(0x59)).await.unwrap();

        assert_eq!(
            conn.read_command().await.unwrap(),
            ReadOutcome::Malformed {
                len: READ_BUFFER_SIZE
            }
        );
        assert_eq!(
            conn.read_command().await.unwrap(),
            ReadOutcome::Malformed { len: 2 }
        );
        assert_eq!(conn.read_command().await.unwrap(), ReadOutcome::Code(0x59));
    }
}
