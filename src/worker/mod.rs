//! Worker lifecycle contract and the plumbing shared by every worker.
//!
//! A worker is anything that can be started, stopped, and fed commands
//! without blocking the sender. Workers run as spawned tasks that own their
//! inbox exclusively; all cross-worker communication goes through command
//! queues, never through calls into another worker's internals.

pub mod display;
pub mod standby;

pub use display::DisplayWorker;
pub use standby::StandbyWorker;

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::command::Command;

/// Observable lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Constructed, never started.
    Idle,
    /// Run loop active (or about to be).
    Running,
    /// Stopped cooperatively; may be started again.
    Stopped,
    /// The run loop died on an error and will not be restarted by itself.
    Dead,
}

/// Contract shared by every worker in the process.
///
/// `start` is a no-op if the worker is already running. `stop` is a no-op if
/// there is nothing running and is safe to call before the first `start`; it
/// is advisory, the run loop observes it at its next poll. `push` never
/// blocks the caller; whether commands pushed while stopped are dropped or
/// held is each worker's documented policy.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start(&self);

    async fn stop(&self);

    fn push(&self, command: Command);

    fn status(&self) -> WorkerStatus;
}

const STATUS_IDLE: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_STOPPED: u8 = 2;
const STATUS_DEAD: u8 = 3;

/// Start/stop bookkeeping shared between a worker handle and its run loop.
///
/// Every run is identified by an epoch token; `stop` bumps the epoch, so a
/// loop spawned before the stop can never outlive it unnoticed, and a
/// stop/start pair always hands the new loop a fresh token.
pub struct Lifecycle {
    status: AtomicU8,
    epoch: AtomicU64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(STATUS_IDLE),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_RUNNING => WorkerStatus::Running,
            STATUS_STOPPED => WorkerStatus::Stopped,
            STATUS_DEAD => WorkerStatus::Dead,
            _ => WorkerStatus::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.load(Ordering::SeqCst) == STATUS_RUNNING
    }

    /// Claim a new run. Returns the run's epoch token, or `None` if a run is
    /// already active (start is idempotent).
    pub fn begin(&self) -> Option<u64> {
        let prev = self.status.swap(STATUS_RUNNING, Ordering::SeqCst);
        if prev == STATUS_RUNNING {
            return None;
        }
        Some(self.epoch.load(Ordering::SeqCst))
    }

    /// Request the active run to stop. Returns `false` when there is nothing
    /// running (stop is idempotent and safe before the first start).
    pub fn request_stop(&self) -> bool {
        match self.status.compare_exchange(
            STATUS_RUNNING,
            STATUS_STOPPED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    /// Record that the run loop died on an error. The worker stays down until
    /// something outside it decides to start it again.
    pub fn mark_dead(&self) {
        self.status.store(STATUS_DEAD, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// True while the run identified by `token` should keep polling.
    pub fn is_current(&self, token: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == token
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker-owned command inbox.
///
/// The sender half lives for the worker's whole life so commands can be
/// buffered across restarts; the receiver half is locked by whichever run
/// loop is active.
pub struct Inbox {
    tx: mpsc::UnboundedSender<Command>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Command>>>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Enqueue a command. Never blocks.
    pub fn push(&self, command: Command) {
        let _ = self.tx.send(command);
    }

    /// Handle to the receiver half for a run loop to lock.
    pub fn receiver(&self) -> Arc<Mutex<mpsc::UnboundedReceiver<Command>>> {
        Arc::clone(&self.rx)
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_idempotent_while_running() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin().is_some());
        assert!(lifecycle.begin().is_none());
        assert_eq!(lifecycle.status(), WorkerStatus::Running);
    }

    #[test]
    fn stop_before_start_is_a_safe_no_op() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.request_stop());
        assert_eq!(lifecycle.status(), WorkerStatus::Idle);
    }

    #[test]
    fn stop_invalidates_the_running_token() {
        let lifecycle = Lifecycle::new();
        let token = lifecycle.begin().expect("first start");
        assert!(lifecycle.is_current(token));

        assert!(lifecycle.request_stop());
        assert!(!lifecycle.is_current(token));
        assert_eq!(lifecycle.status(), WorkerStatus::Stopped);

        // Second stop is a no-op.
        assert!(!lifecycle.request_stop());
    }

    #[test]
    fn restart_hands_out_a_fresh_token() {
        let lifecycle = Lifecycle::new();
        let first = lifecycle.begin().expect("first start");
        lifecycle.request_stop();

        let second = lifecycle.begin().expect("restart");
        assert_ne!(first, second);
        assert!(lifecycle.is_current(second));
        assert!(!lifecycle.is_current(first));
    }

    #[test]
    fn dead_state_is_observable_and_restartable() {
        let lifecycle = Lifecycle::new();
        let token = lifecycle.begin().expect("start");
        lifecycle.mark_dead();

        assert_eq!(lifecycle.status(), WorkerStatus::Dead);
        assert!(!lifecycle.is_current(token));
        // A dead worker is not restarted by the contract itself, but a
        // supervisor may still start it again.
        assert!(lifecycle.begin().is_some());
    }

    #[tokio::test]
    async fn inbox_buffers_until_drained() {
        let inbox = Inbox::new();
        inbox.push(Command::Reload);
        inbox.push(Command::Exit);

        let rx = inbox.receiver();
        let mut rx = rx.lock().await;
        assert_eq!(rx.try_recv().ok(), Some(Command::Reload));
        assert_eq!(rx.try_recv().ok(), Some(Command::Exit));
        assert!(rx.try_recv().is_err());
    }
}
