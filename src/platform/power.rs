//! System power control.
//!
//! Reboot is a one-way side effect with no return path: the process expects
//! to be terminated by the reboot itself, so the request is fired and
//! forgotten.

use tokio::process::Command;
use tracing::{error, warn};

use super::PowerControl;

pub struct SystemPower {
    reboot_command: String,
}

impl SystemPower {
    pub fn new() -> Self {
        Self {
            reboot_command: "systemctl".into(),
        }
    }
}

impl Default for SystemPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerControl for SystemPower {
    fn reboot(&self) {
        warn!("reboot requested");
        match Command::new(&self.reboot_command).arg("reboot").spawn() {
            Ok(_) => {}
            Err(err) => error!(%err, "failed to issue reboot"),
        }
    }
}
