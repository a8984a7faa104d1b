//! System command handler: brightness and reboot.
//!
//! Stateless. Brightness is bounds-checked here so the actuator only ever
//! sees a valid percent; reboot is fire-and-forget because the process
//! expects to be terminated by the reboot itself.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::platform::{PowerControl, SensorSource};

pub struct SystemHandler {
    sensors: Arc<dyn SensorSource>,
    power: Arc<dyn PowerControl>,
}

impl SystemHandler {
    pub fn new(sensors: Arc<dyn SensorSource>, power: Arc<dyn PowerControl>) -> Self {
        Self { sensors, power }
    }

    pub async fn handle(&self, command: Command) {
        match command {
            Command::SetBrightness(percent) => {
                if !(0..=100).contains(&percent) {
                    warn!(percent, "rejecting set_brightness outside 0-100");
                    return;
                }
                if let Err(err) = self.sensors.set_brightness(percent).await {
                    error!(%err, percent, "failed to apply brightness");
                } else {
                    info!(percent, "brightness applied");
                }
            }
            Command::Reboot => {
                self.power.reboot();
            }
            other => debug!(kind = other.kind(), "system handler ignoring command"),
        }
    }
}
