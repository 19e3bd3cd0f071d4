//! Command Ingress: FIFO hand-off from the transport listener to the
//! state actor.
//!
//! The listener owns the [`IngressSender`] half and pushes raw codes.
//! A single consumer drains [`CommandIngress`] and forwards each code as
//! a hardware-sourced [`Command`].

use tokio::sync::mpsc;

use crate::model::Command;

/// Producer half. Cloneable; this is what the transport listener holds.
pub type IngressSender = mpsc::Sender<u32>;

/// Consumer half.
#[derive(Debug)]
pub struct CommandIngress {
    rx: mpsc::Receiver<u32>,
}

/// Bounded ingress queue. A full queue applies backpressure to the
/// listener rather than dropping codes.
pub fn channel(capacity: usize) -> (IngressSender, CommandIngress) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, CommandIngress { rx })
}

impl CommandIngress {
    /// Wait for the next code. `None` once every sender is gone and the
    /// queue is drained.
    pub async fn next(&mut self) -> Option<Command> {
        self.rx.recv().await.map(Command::hardware)
    }
}
