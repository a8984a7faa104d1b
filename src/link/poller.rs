//! Link poller: fast connectivity sampling, batched sensor reads.
//!
//! Connectivity flips are rare and must gate the foreground switch quickly,
//! so every tick samples the link and a collapsed-value edge is enqueued
//! immediately. Sensor reads are comparatively expensive and noisy, so they
//! ride every Nth tick instead of getting their own timer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::LinkReport;
use crate::bus::BusSender;
use crate::command::Command;
use crate::platform::{LinkSource, SensorSource};

pub struct LinkPoller {
    link: Arc<dyn LinkSource>,
    sensors: Arc<dyn SensorSource>,
    bus: BusSender,
    tick_interval: Duration,
    /// Sensor reads happen once per this many ticks.
    sensor_every: u32,
    last_linked: Option<bool>,
    tick: u32,
}

impl LinkPoller {
    pub fn new(
        link: Arc<dyn LinkSource>,
        sensors: Arc<dyn SensorSource>,
        bus: BusSender,
        tick_interval: Duration,
        sensor_every: u32,
    ) -> Self {
        Self {
            link,
            sensors,
            bus,
            tick_interval,
            sensor_every: sensor_every.max(1),
            last_linked: None,
            tick: 0,
        }
    }

    /// Run the poller on its own task for the life of the process.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_ms = self.tick_interval.as_millis() as u64,
                sensor_every = self.sensor_every,
                "link poller started"
            );
            let mut ticker = tokio::time::interval(self.tick_interval);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }

    /// One poller tick: the edge-triggered link check plus, every Nth call,
    /// the batched sensor read.
    pub async fn poll_once(&mut self) {
        let report = self.link.sample().await;
        let linked = report.phase.is_online();
        if self.last_linked != Some(linked) {
            debug!(phase = %report.phase, network = %report.network, "link edge");
            self.last_linked = Some(linked);
            self.bus.send(Command::LinkState(report));
        }

        self.tick = self.tick.wrapping_add(1);
        if self.tick % self.sensor_every == 0 {
            let snapshot = self.read_sensors().await;
            self.bus.send(Command::SensorsPush(snapshot));
        }
    }

    async fn read_sensors(&self) -> Map<String, Value> {
        let mut snapshot = Map::new();
        snapshot.insert("cputemp".into(), json!(self.sensors.temperature().await));
        snapshot.insert("brightness".into(), json!(self.sensors.brightness().await));
        snapshot.insert("uptime".into(), json!(self.sensors.uptime().await));
        snapshot
    }
}
