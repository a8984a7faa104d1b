//! Standby worker: renders connection status while the display is offline.
//!
//! Unlike the display worker, the standby worker holds commands pushed while
//! it is not running and applies them when its loop comes up: the arbiter
//! mirrors every status change here unconditionally, and the surface must be
//! current the moment it becomes foreground again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use super::{Inbox, Lifecycle, Worker, WorkerStatus};
use crate::command::Command;
use crate::platform::StatusSurface;

pub struct StandbyWorker {
    surface: Arc<dyn StatusSurface>,
    poll_interval: Duration,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
}

impl StandbyWorker {
    pub fn new(surface: Arc<dyn StatusSurface>, poll_interval: Duration) -> Self {
        Self {
            surface,
            poll_interval,
            inbox: Inbox::new(),
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }
}

#[async_trait]
impl Worker for StandbyWorker {
    fn name(&self) -> &'static str {
        "standby"
    }

    async fn start(&self) {
        let Some(token) = self.lifecycle.begin() else {
            return;
        };

        let surface = Arc::clone(&self.surface);
        let receiver = self.inbox.receiver();
        let lifecycle = Arc::clone(&self.lifecycle);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            info!("standby worker started");
            match run(&*surface, receiver, &lifecycle, token, poll_interval).await {
                Ok(()) => info!("standby worker stopped"),
                Err(err) => {
                    error!(%err, "standby worker died");
                    lifecycle.mark_dead();
                }
            }
        });
    }

    async fn stop(&self) {
        if self.lifecycle.request_stop() {
            info!("standby worker stop requested");
        }
    }

    fn push(&self, command: Command) {
        // Held across stops: status mirroring continues while not foreground.
        self.inbox.push(command);
    }

    fn status(&self) -> WorkerStatus {
        self.lifecycle.status()
    }
}

async fn run(
    surface: &dyn StatusSurface,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Command>>>,
    lifecycle: &Lifecycle,
    token: u64,
    poll_interval: Duration,
) -> Result<()> {
    let mut rx = receiver.lock().await;
    if !lifecycle.is_current(token) {
        return Ok(());
    }

    while lifecycle.is_current(token) {
        while let Ok(command) = rx.try_recv() {
            match command {
                Command::UiStatusText(text) => surface.set_status_text(&text).await?,
                Command::UiProgressVisible(visible) => {
                    surface.set_progress_visible(visible).await?
                }
                other => debug!(kind = other.kind(), "standby worker ignoring command"),
            }
        }

        tokio::time::sleep(poll_interval).await;
    }

    surface.clear().await?;
    Ok(())
}
