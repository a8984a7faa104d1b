//! The dispatcher loop: the single consumer of the command bus.
//!
//! Commands are routed strictly by kind, one at a time, in the order they
//! were enqueued. Every handler deals with its own failures, so one bad
//! command can never stop the routing of the commands behind it.

use std::sync::Arc;

use tracing::{debug, info};

use super::handlers::SystemHandler;
use super::Command;
use crate::arbiter::ForegroundArbiter;
use crate::bus::BusReceiver;
use crate::worker::Worker;

pub struct Dispatcher {
    arbiter: ForegroundArbiter,
    gateway: Arc<dyn Worker>,
    system: SystemHandler,
}

impl Dispatcher {
    pub fn new(arbiter: ForegroundArbiter, gateway: Arc<dyn Worker>, system: SystemHandler) -> Self {
        Self {
            arbiter,
            gateway,
            system,
        }
    }

    /// Drain the bus until an `exit` command or the last producer goes away.
    pub async fn run(mut self, mut bus: BusReceiver) {
        info!("dispatcher loop running");
        while let Some(command) = bus.recv().await {
            if command == Command::Exit {
                self.shutdown().await;
                break;
            }
            self.route(command).await;
        }
        info!("dispatcher loop finished");
    }

    /// Route one command to its destination.
    pub async fn route(&mut self, command: Command) {
        debug!(kind = command.kind(), "routing command");
        match command {
            Command::SensorsPush(_) => self.gateway.push(command),
            Command::LinkState(report) => self.arbiter.handle_link(&report).await,
            Command::Reload | Command::UiStatusText(_) | Command::UiProgressVisible(_) => {
                self.arbiter.forward(command).await
            }
            Command::SetBrightness(_) | Command::Reboot => self.system.handle(command).await,
            // Handled in `run` before routing.
            Command::Exit => {}
        }
    }

    /// Stop every worker before the process terminates. Best-effort: stops
    /// are advisory and not awaited beyond the request.
    async fn shutdown(&mut self) {
        info!("exit command received, stopping workers");
        self.gateway.stop().await;
        self.arbiter.shutdown().await;
    }
}
