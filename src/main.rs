mod arbiter;
mod bus;
mod command;
mod config;
mod gateway;
mod link;
mod platform;
mod worker;

use std::sync::Arc;

use arbiter::ForegroundArbiter;
use command::handlers::SystemHandler;
use command::Dispatcher;
use config::AgentConfig;
use gateway::{GatewayConfig, TelemetryGateway};
use link::LinkPoller;
use platform::{
    ConsoleSurface, KioskBrowser, LinkSource, PowerControl, ProcessBrowser, SensorSource,
    StatusSurface, SysfsLink, SysfsSensors, SystemPower,
};
use worker::{DisplayWorker, StandbyWorker, Worker};

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AgentConfig::from_env();

    info!("kiosk agent starting: {}", config.identity.unique_id);
    info!("  dashboard: {}", config.dashboard_url);
    info!("  broker: {}", config.broker.addr);
    info!("  interface: {}", config.interface);

    let browser: Arc<dyn KioskBrowser> = Arc::new(ProcessBrowser::new(config.browser_command.clone()));
    let surface: Arc<dyn StatusSurface> = Arc::new(ConsoleSurface::new());
    let sensors: Arc<dyn SensorSource> = Arc::new(SysfsSensors::new(
        config.backlight_dir.clone(),
        config.thermal_zone.clone(),
    ));
    let link_source: Arc<dyn LinkSource> = Arc::new(SysfsLink::new(config.interface.clone()));
    let power: Arc<dyn PowerControl> = Arc::new(SystemPower::new());

    let (bus_tx, bus_rx) = bus::channel();

    let display: Arc<dyn Worker> = Arc::new(DisplayWorker::new(
        browser,
        config.dashboard_url.clone(),
        config::WORKER_POLL_INTERVAL,
    ));
    let standby: Arc<dyn Worker> = Arc::new(StandbyWorker::new(
        surface,
        config::WORKER_POLL_INTERVAL,
    ));
    let gateway: Arc<dyn Worker> = Arc::new(TelemetryGateway::new(
        GatewayConfig {
            identity: config.identity.clone(),
            broker: config.broker.clone(),
            publish_interval: config::STATE_PUBLISH_INTERVAL,
        },
        bus_tx.clone(),
    ));

    // The gateway runs for the whole process life; the display and standby
    // workers are owned by the arbiter and come up with the first link report.
    gateway.start().await;

    LinkPoller::new(
        link_source,
        Arc::clone(&sensors),
        bus_tx.clone(),
        config::LINK_POLL_INTERVAL,
        config::SENSOR_PUSH_EVERY,
    )
    .spawn();

    let arbiter = ForegroundArbiter::new(display, standby);
    let system = SystemHandler::new(sensors, power);

    Dispatcher::new(arbiter, gateway, system).run(bus_rx).await;

    info!("kiosk agent stopped");
}
