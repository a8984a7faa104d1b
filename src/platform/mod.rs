//! Capability ports to the appliance hardware and external surfaces.
//!
//! Everything the controller touches outside its own process goes through
//! these traits, so the orchestration core stays testable without a browser,
//! a backlight, or a network stack. One default implementation per trait
//! lives alongside it; swapping a backend never touches the core.

pub mod browser;
pub mod link;
pub mod power;
pub mod sensors;
pub mod surface;

pub use browser::ProcessBrowser;
pub use link::SysfsLink;
pub use power::SystemPower;
pub use sensors::SysfsSensors;
pub use surface::ConsoleSurface;

use anyhow::Result;
use async_trait::async_trait;

use crate::link::LinkReport;

/// Drives the kiosk browser that owns the display.
#[async_trait]
pub trait KioskBrowser: Send + Sync {
    /// Bring up the browser in kiosk mode pointed at `url`.
    async fn launch(&self, url: &str) -> Result<()>;

    /// Refresh the dashboard page.
    async fn reload(&self) -> Result<()>;

    /// Close any window other than the dashboard.
    async fn close_stray_windows(&self) -> Result<()>;

    /// Tear the browser down.
    async fn shutdown(&self) -> Result<()>;
}

/// The standby status display: a line of text and a progress indicator.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn set_status_text(&self, text: &str) -> Result<()>;

    async fn set_progress_visible(&self, visible: bool) -> Result<()>;

    /// Blank the surface when the worker stops.
    async fn clear(&self) -> Result<()>;
}

/// Raw sensor values. Reads never fail outward; a failed read yields the
/// sentinel (-1) so one bad read cannot stall a polling loop.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// CPU temperature in degrees Celsius, -1.0 when unreadable.
    async fn temperature(&self) -> f64;

    /// Backlight brightness in percent, -1 when unreadable.
    async fn brightness(&self) -> i64;

    /// Seconds since boot, -1 when unreadable.
    async fn uptime(&self) -> i64;

    /// Apply a brightness percent that has already been bounds-checked.
    async fn set_brightness(&self, percent: i64) -> Result<()>;
}

/// Raw network adapter state.
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn sample(&self) -> LinkReport;
}

/// One-way power actions. Best-effort, no return path.
pub trait PowerControl: Send + Sync {
    fn reboot(&self);
}
