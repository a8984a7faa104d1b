//! Environment-driven configuration.
//!
//! Everything has a default that works on a development machine; a deployed
//! appliance overrides through the environment (or a .env file loaded at
//! bootstrap).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::gateway::BrokerConfig;

/// Connectivity check cadence.
pub const LINK_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Sensor reads ride every Nth link poll (2 s * 3 = one push per ~6 s).
pub const SENSOR_PUSH_EVERY: u32 = 3;
/// Retained state snapshot cadence on the broker side.
pub const STATE_PUBLISH_INTERVAL: Duration = Duration::from_secs(10);
/// Worker inbox poll cadence; also bounds how fast a stop is observed.
pub const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub unique_id: String,
    pub mac: String,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub identity: DeviceIdentity,
    pub dashboard_url: String,
    pub broker: BrokerConfig,
    pub interface: String,
    pub backlight_dir: PathBuf,
    pub thermal_zone: PathBuf,
    pub browser_command: String,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let interface = var_or("KIOSK_INTERFACE", "eth0");
        let identity = DeviceIdentity::for_interface(&interface);

        Self {
            identity,
            dashboard_url: var_or("KIOSK_DASHBOARD_URL", "http://127.0.0.1:8123"),
            broker: BrokerConfig {
                addr: var_or("KIOSK_BROKER_ADDR", "127.0.0.1:8080"),
                ..Default::default()
            },
            interface,
            backlight_dir: var_or("KIOSK_BACKLIGHT_DIR", "/sys/class/backlight/intel_backlight")
                .into(),
            thermal_zone: var_or("KIOSK_THERMAL_ZONE", "/sys/class/thermal/thermal_zone0").into(),
            browser_command: var_or("KIOSK_BROWSER", "chromium"),
        }
    }
}

impl DeviceIdentity {
    /// Identity derived from the interface's MAC address.
    pub fn for_interface(interface: &str) -> Self {
        let path = format!("/sys/class/net/{interface}/address");
        let mac = match std::fs::read_to_string(&path) {
            Ok(raw) => raw.trim().to_string(),
            Err(err) => {
                warn!(%err, interface, "cannot read MAC address, using zero identity");
                "00:00:00:00:00:00".into()
            }
        };
        Self {
            unique_id: unique_id_from_mac(&mac),
            mac,
        }
    }
}

/// `kiosk-` plus the last six hex digits of the MAC, lowercased.
pub fn unique_id_from_mac(mac: &str) -> String {
    let compact: String = mac
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect::<String>()
        .to_lowercase();
    let suffix = if compact.len() >= 6 {
        &compact[compact.len() - 6..]
    } else {
        &compact
    };
    format!("kiosk-{suffix}")
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_uses_the_mac_tail() {
        assert_eq!(unique_id_from_mac("AA:BB:CC:A1:B2:C3"), "kiosk-a1b2c3");
        assert_eq!(unique_id_from_mac("aa-bb-cc-a1-b2-c3"), "kiosk-a1b2c3");
    }

    #[test]
    fn short_or_empty_macs_still_produce_an_id() {
        assert_eq!(unique_id_from_mac(""), "kiosk-");
        assert_eq!(unique_id_from_mac("AB:CD"), "kiosk-abcd");
    }
}
