//! Sysfs-backed link source.
//!
//! Maps the kernel's operstate for one interface onto the connectivity
//! phases. The operstate vocabulary is coarser than a connection manager's,
//! so only a subset of phases can ever be produced here; richer backends can
//! report the full set through the same trait.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::LinkSource;
use crate::link::{LinkPhase, LinkReport};

pub struct SysfsLink {
    interface: String,
    operstate_path: PathBuf,
}

impl SysfsLink {
    pub fn new(interface: impl Into<String>) -> Self {
        let interface = interface.into();
        let operstate_path = PathBuf::from(format!("/sys/class/net/{interface}/operstate"));
        Self {
            interface,
            operstate_path,
        }
    }

    fn phase_for(operstate: &str) -> LinkPhase {
        match operstate {
            "up" => LinkPhase::Connected,
            "dormant" => LinkPhase::Connecting,
            "down" | "lowerlayerdown" => LinkPhase::Disconnected,
            other => LinkPhase::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl LinkSource for SysfsLink {
    async fn sample(&self) -> LinkReport {
        let phase = match fs::read_to_string(&self.operstate_path).await {
            Ok(raw) => Self::phase_for(raw.trim()),
            Err(err) => {
                debug!(%err, interface = %self.interface, "operstate read failed");
                LinkPhase::Disconnected
            }
        };
        LinkReport::new(phase, self.interface.clone())
    }
}
