//! Display worker: owns the kiosk browser while the appliance is online.
//!
//! The run loop launches the browser at the dashboard, sweeps stray windows
//! every poll, and services its inbox. Commands pushed while the worker is
//! not running are dropped: a stale reload against a browser that no longer
//! exists is worthless.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use super::{Inbox, Lifecycle, Worker, WorkerStatus};
use crate::command::Command;
use crate::platform::KioskBrowser;

pub struct DisplayWorker {
    browser: Arc<dyn KioskBrowser>,
    dashboard_url: String,
    poll_interval: Duration,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
}

impl DisplayWorker {
    pub fn new(
        browser: Arc<dyn KioskBrowser>,
        dashboard_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            browser,
            dashboard_url: dashboard_url.into(),
            poll_interval,
            inbox: Inbox::new(),
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }
}

#[async_trait]
impl Worker for DisplayWorker {
    fn name(&self) -> &'static str {
        "display"
    }

    async fn start(&self) {
        let Some(token) = self.lifecycle.begin() else {
            return;
        };

        let browser = Arc::clone(&self.browser);
        let url = self.dashboard_url.clone();
        let receiver = self.inbox.receiver();
        let lifecycle = Arc::clone(&self.lifecycle);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            info!("display worker started");
            match run(&*browser, &url, receiver, &lifecycle, token, poll_interval).await {
                Ok(()) => info!("display worker stopped"),
                Err(err) => {
                    error!(%err, "display worker died");
                    lifecycle.mark_dead();
                }
            }
        });
    }

    async fn stop(&self) {
        if self.lifecycle.request_stop() {
            info!("display worker stop requested");
        }
    }

    fn push(&self, command: Command) {
        if !self.lifecycle.is_running() {
            debug!(kind = command.kind(), "display worker not running, dropping command");
            return;
        }
        self.inbox.push(command);
    }

    fn status(&self) -> WorkerStatus {
        self.lifecycle.status()
    }
}

async fn run(
    browser: &dyn KioskBrowser,
    url: &str,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Command>>>,
    lifecycle: &Lifecycle,
    token: u64,
    poll_interval: Duration,
) -> Result<()> {
    let mut rx = receiver.lock().await;
    if !lifecycle.is_current(token) {
        // Stopped while waiting for the previous run to release the inbox.
        return Ok(());
    }

    browser.launch(url).await?;

    while lifecycle.is_current(token) {
        browser.close_stray_windows().await?;

        while let Ok(command) = rx.try_recv() {
            match command {
                Command::Reload => browser.reload().await?,
                other => debug!(kind = other.kind(), "display worker ignoring command"),
            }
        }

        tokio::time::sleep(poll_interval).await;
    }

    browser.shutdown().await?;
    Ok(())
}
