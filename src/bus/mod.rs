//! The process-wide command bus.
//!
//! A single FIFO queue shared by every producer in the process (link poller,
//! telemetry gateway, workers) and drained by exactly one consumer, the
//! dispatcher loop. Pushes never block; the consumer blocks on an empty
//! queue instead of polling.

use tokio::sync::mpsc;
use tracing::warn;

use crate::command::Command;

/// Create the bus. The sender half is cloned into every producer; the
/// receiver half goes to the dispatcher loop.
pub fn channel() -> (BusSender, BusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BusSender { tx }, BusReceiver { rx })
}

/// Producer handle to the command bus.
#[derive(Clone)]
pub struct BusSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl BusSender {
    /// Enqueue a command. Never blocks; a send after the dispatcher has shut
    /// down is logged and dropped.
    pub fn send(&self, command: Command) {
        if let Err(err) = self.tx.send(command) {
            warn!(kind = err.0.kind(), "bus closed, dropping command");
        }
    }
}

/// Consumer handle to the command bus. There is exactly one.
pub struct BusReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl BusReceiver {
    /// Wait for the next command. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_enqueue_order() {
        let (tx, mut rx) = channel();
        tx.send(Command::Reload);
        tx.send(Command::SetBrightness(10));
        tx.send(Command::Exit);

        assert_eq!(rx.recv().await, Some(Command::Reload));
        assert_eq!(rx.recv().await, Some(Command::SetBrightness(10)));
        assert_eq!(rx.recv().await, Some(Command::Exit));
    }

    #[tokio::test]
    async fn interleaved_producers_share_one_fifo() {
        let (tx, mut rx) = channel();
        let other = tx.clone();
        tx.send(Command::Reload);
        other.send(Command::Reboot);
        tx.send(Command::Exit);

        assert_eq!(rx.recv().await, Some(Command::Reload));
        assert_eq!(rx.recv().await, Some(Command::Reboot));
        assert_eq!(rx.recv().await, Some(Command::Exit));
    }

    #[tokio::test]
    async fn recv_ends_when_all_senders_drop() {
        let (tx, mut rx) = channel();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
