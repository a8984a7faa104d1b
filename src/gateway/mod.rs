//! Telemetry gateway: the broker-facing worker.
//!
//! Inbound, it is the process's only external command ingress: every frame
//! is validated against the closed command set and anything else is dropped
//! before it can reach the bus. Outbound, it accumulates sensor snapshots
//! (merging, never replacing) and publishes the accumulator as a retained
//! state document on a fixed cadence, independent of bus traffic.

pub mod connection;
pub mod discovery;

pub use connection::{BrokerConfig, BrokerEvent, BrokerLink, Publication};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::bus::BusSender;
use crate::command::Command;
use crate::config::DeviceIdentity;
use crate::worker::{Inbox, Lifecycle, Worker, WorkerStatus};

/// Topic layout for one device.
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn for_device(unique_id: &str) -> Self {
        Self {
            base: format!("homeassistant/device/{unique_id}/"),
        }
    }

    pub fn command(&self) -> String {
        format!("{}command", self.base)
    }

    pub fn state(&self) -> String {
        format!("{}state", self.base)
    }

    pub fn availability(&self) -> String {
        format!("{}availability", self.base)
    }

    pub fn config(&self) -> String {
        format!("{}config", self.base)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub identity: DeviceIdentity,
    pub broker: BrokerConfig,
    /// Cadence of the retained state snapshot.
    pub publish_interval: Duration,
}

pub struct TelemetryGateway {
    config: GatewayConfig,
    topics: Topics,
    bus: BusSender,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
}

impl TelemetryGateway {
    pub fn new(config: GatewayConfig, bus: BusSender) -> Self {
        let topics = Topics::for_device(&config.identity.unique_id);
        Self {
            config,
            topics,
            bus,
            inbox: Inbox::new(),
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }
}

#[async_trait]
impl Worker for TelemetryGateway {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn start(&self) {
        let Some(token) = self.lifecycle.begin() else {
            return;
        };

        let config = self.config.clone();
        let topics = self.topics.clone();
        let bus = self.bus.clone();
        let receiver = self.inbox.receiver();
        let lifecycle = Arc::clone(&self.lifecycle);

        tokio::spawn(async move {
            info!(device = %config.identity.unique_id, "telemetry gateway started");
            match run(config, topics, bus, receiver, &lifecycle, token).await {
                Ok(()) => info!("telemetry gateway stopped"),
                Err(err) => {
                    error!(%err, "telemetry gateway died");
                    lifecycle.mark_dead();
                }
            }
        });
    }

    async fn stop(&self) {
        if self.lifecycle.request_stop() {
            info!("telemetry gateway stop requested");
        }
    }

    fn push(&self, command: Command) {
        // Held: snapshots queued before the first start are merged then.
        self.inbox.push(command);
    }

    fn status(&self) -> WorkerStatus {
        self.lifecycle.status()
    }
}

async fn run(
    config: GatewayConfig,
    topics: Topics,
    bus: BusSender,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Command>>>,
    lifecycle: &Lifecycle,
    token: u64,
) -> Result<()> {
    let mut link = BrokerLink::connect(config.broker.clone());
    let publisher = link.publisher();
    let mut rx = receiver.lock().await;
    if !lifecycle.is_current(token) {
        return Ok(());
    }

    let mut accumulator: Map<String, Value> = Map::new();
    let mut publish_tick = tokio::time::interval(config.publish_interval);
    // The broker state cadence is slow; re-check the stop flag on a faster
    // tick so shutdown stays within a poll interval.
    let mut stop_check = tokio::time::interval(Duration::from_millis(250));

    while lifecycle.is_current(token) {
        tokio::select! {
            _ = publish_tick.tick() => {
                publisher.publish(Publication {
                    topic: topics.state(),
                    payload: Value::Object(accumulator.clone()),
                    retain: true,
                });
            }
            _ = stop_check.tick() => {}
            maybe = rx.recv() => match maybe {
                Some(Command::SensorsPush(update)) => merge(&mut accumulator, update),
                Some(other) => debug!(kind = other.kind(), "gateway ignoring command"),
                None => break,
            },
            maybe = link.recv() => match maybe {
                Some(BrokerEvent::Connected) => {
                    info!(addr = %config.broker.addr, "broker connected");
                    publisher.publish(Publication {
                        topic: topics.availability(),
                        payload: json!("online"),
                        retain: true,
                    });
                    publisher.publish(Publication {
                        topic: topics.config(),
                        payload: discovery::document(&config.identity, &topics),
                        retain: true,
                    });
                }
                Some(BrokerEvent::Disconnected { reason }) => {
                    warn!(%reason, "broker disconnected");
                }
                Some(BrokerEvent::Received(line)) => match Command::from_wire(line.as_bytes()) {
                    Ok(command) => {
                        debug!(kind = command.kind(), "inbound command accepted");
                        bus.send(command);
                    }
                    Err(err) => debug!(%err, "dropping invalid inbound command"),
                },
                None => return Err(anyhow!("broker link closed")),
            },
        }
    }

    // Best-effort farewell; queued frames are flushed as the link winds down.
    publisher.publish(Publication {
        topic: topics.availability(),
        payload: json!("offline"),
        retain: true,
    });
    Ok(())
}

/// Merge an update into the accumulator. Keys absent from the update keep
/// their previous values.
fn merge(accumulator: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, value) in update {
        accumulator.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn merge_keeps_keys_missing_from_the_update() {
        let mut accumulator = Map::new();
        merge(
            &mut accumulator,
            json!({"cputemp": 40.0, "brightness": 80})
                .as_object()
                .cloned()
                .unwrap(),
        );
        merge(
            &mut accumulator,
            json!({"cputemp": 42.5}).as_object().cloned().unwrap(),
        );

        assert_eq!(accumulator.get("cputemp"), Some(&json!(42.5)));
        assert_eq!(accumulator.get("brightness"), Some(&json!(80)));
    }

    #[test]
    fn topics_follow_the_device_base() {
        let topics = Topics::for_device("kiosk-a1b2c3");
        assert_eq!(topics.state(), "homeassistant/device/kiosk-a1b2c3/state");
        assert_eq!(topics.command(), "homeassistant/device/kiosk-a1b2c3/command");
        assert_eq!(topics.config(), "homeassistant/device/kiosk-a1b2c3/config");
    }

    fn gateway_config(addr: String) -> GatewayConfig {
        GatewayConfig {
            identity: DeviceIdentity {
                unique_id: "kiosk-a1b2c3".into(),
                mac: "AA:BB:CC:A1:B2:C3".into(),
            },
            broker: BrokerConfig {
                addr,
                connect_timeout: Duration::from_secs(1),
                reconnect_delay: Duration::from_millis(20),
                max_reconnect_delay: Duration::from_millis(100),
            },
            publish_interval: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn valid_inbound_commands_reach_the_bus_and_junk_does_not() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();

        let (bus_tx, mut bus_rx) = bus::channel();
        let gateway = TelemetryGateway::new(gateway_config(addr), bus_tx);
        gateway.start().await;

        let (mut server, _) = listener.accept().await.expect("accept");
        server
            .write_all(b"{\"command\":\"format_disk\"}\nnot json\n{\"command\":\"reload\"}\n")
            .await
            .expect("server write");

        // Only the valid frame makes it through the ingress boundary.
        let command = tokio::time::timeout(Duration::from_secs(1), bus_rx.recv())
            .await
            .expect("bus delivery")
            .expect("open bus");
        assert_eq!(command, Command::Reload);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), bus_rx.recv())
                .await
                .is_err()
        );

        gateway.stop().await;
    }

    #[tokio::test]
    async fn publishes_availability_discovery_then_retained_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();

        let (bus_tx, _bus_rx) = bus::channel();
        let gateway = TelemetryGateway::new(gateway_config(addr), bus_tx);
        gateway.push(Command::SensorsPush(
            json!({"cputemp": 41.5}).as_object().cloned().unwrap(),
        ));
        gateway.start().await;

        let (server, _) = listener.accept().await.expect("accept");
        let mut lines = BufReader::new(server).lines();

        // Frame order between the state ticker and the connect announcements
        // is not fixed; scan until all three have shown up.
        let mut availability = None;
        let mut config = None;
        let mut merged_state = None;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while (availability.is_none() || config.is_none() || merged_state.is_none())
            && tokio::time::Instant::now() < deadline
        {
            let line = tokio::time::timeout(Duration::from_secs(1), lines.next_line())
                .await
                .expect("frame in time")
                .expect("read")
                .expect("open connection");
            let frame: Value = serde_json::from_str(&line).expect("json");
            match frame["topic"].as_str() {
                Some("homeassistant/device/kiosk-a1b2c3/availability") => {
                    availability = Some(frame)
                }
                Some("homeassistant/device/kiosk-a1b2c3/config") => config = Some(frame),
                Some("homeassistant/device/kiosk-a1b2c3/state")
                    if frame["payload"]["cputemp"] == 41.5 =>
                {
                    merged_state = Some(frame)
                }
                _ => {}
            }
        }

        assert_eq!(availability.expect("availability frame")["payload"], "online");
        let config = config.expect("discovery frame");
        assert_eq!(
            config["payload"]["dev"]["identifiers"][0],
            "kiosk-a1b2c3"
        );
        assert_eq!(merged_state.expect("merged state frame")["retain"], true);

        gateway.stop().await;
    }
}
