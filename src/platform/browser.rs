//! Process-spawning kiosk browser backend.
//!
//! Runs the configured browser binary in kiosk mode and keeps the child
//! handle so reload and shutdown can act on it. A reload is a relaunch: the
//! dashboard is a single always-on page, so restarting the process is the
//! reliable refresh for every browser we ship on.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::KioskBrowser;

pub struct ProcessBrowser {
    program: String,
    session: Mutex<Option<Session>>,
}

struct Session {
    child: Child,
    url: String,
}

impl ProcessBrowser {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            session: Mutex::new(None),
        }
    }

    fn spawn(&self, url: &str) -> Result<Child> {
        Command::new(&self.program)
            .arg("--kiosk")
            .arg("--noerrdialogs")
            .arg("--disable-infobars")
            .arg("--disable-extensions")
            .arg(url)
            .spawn()
            .with_context(|| format!("spawning {}", self.program))
    }

    async fn kill(session: &mut Session) {
        if let Err(err) = session.child.kill().await {
            debug!(%err, "browser child already gone");
        }
    }
}

#[async_trait]
impl KioskBrowser for ProcessBrowser {
    async fn launch(&self, url: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        if let Some(existing) = session.as_mut() {
            Self::kill(existing).await;
        }
        let child = self.spawn(url)?;
        info!(program = %self.program, url, "kiosk browser launched");
        *session = Some(Session {
            child,
            url: url.to_string(),
        });
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let current = session.as_mut().ok_or_else(|| anyhow!("browser not running"))?;
        Self::kill(current).await;
        current.child = self.spawn(&current.url)?;
        info!(url = %current.url, "kiosk browser reloaded");
        Ok(())
    }

    async fn close_stray_windows(&self) -> Result<()> {
        // A single-process kiosk session has no secondary windows to sweep;
        // backends that drive a real automation protocol do the work here.
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if let Some(mut existing) = session.take() {
            Self::kill(&mut existing).await;
            info!("kiosk browser shut down");
        }
        Ok(())
    }
}
