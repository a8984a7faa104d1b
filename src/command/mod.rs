//! Command types shared by the bus, the workers, and the wire boundary.
//!
//! Everything that moves between components in this process is one of these
//! commands. The wire shape is a JSON object `{"command": <string>, "arg":
//! <any>}`; parsing happens once, at the gateway ingress, and anything that
//! does not map onto a known kind is dropped there.

pub mod dispatcher;
pub mod handlers;

pub use dispatcher::Dispatcher;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::link::LinkReport;

/// A command flowing through the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Merge a sensor snapshot into the outbound telemetry accumulator.
    SensorsPush(Map<String, Value>),
    /// Refresh the dashboard page in the kiosk browser.
    Reload,
    /// Reboot the appliance.
    Reboot,
    /// Set the backlight brightness in percent.
    SetBrightness(i64),
    /// The connectivity phase changed.
    LinkState(LinkReport),
    /// Update the status line on the standby surface.
    UiStatusText(String),
    /// Show or hide the progress indicator on the standby surface.
    UiProgressVisible(bool),
    /// Stop every worker, then terminate the process.
    Exit,
}

impl Command {
    /// The wire-level kind string for this command.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SensorsPush(_) => "sensors_push",
            Command::Reload => "reload",
            Command::Reboot => "reboot",
            Command::SetBrightness(_) => "set_brightness",
            Command::LinkState(_) => "link_state",
            Command::UiStatusText(_) => "ui_update_status_text",
            Command::UiProgressVisible(_) => "ui_progress_bar_visibility",
            Command::Exit => "exit",
        }
    }
}

/// Why an inbound wire payload was rejected.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing \"command\" field")]
    MissingKind,

    #[error("unknown command {0:?}")]
    UnknownKind(String),

    #[error("invalid arg for {kind}: {reason}")]
    BadArg { kind: &'static str, reason: String },
}

impl Command {
    /// Parse an inbound wire payload.
    ///
    /// Only externally issuable kinds are accepted here; `link_state` and the
    /// UI kinds originate inside the process and are rejected like any other
    /// unknown kind.
    pub fn from_wire(payload: &[u8]) -> Result<Self, WireError> {
        let value: Value = serde_json::from_slice(payload)?;
        let object = value.as_object().ok_or(WireError::NotAnObject)?;
        let kind = object
            .get("command")
            .and_then(Value::as_str)
            .ok_or(WireError::MissingKind)?;

        match kind {
            "sensors_push" => match object.get("arg").and_then(Value::as_object) {
                Some(map) => Ok(Command::SensorsPush(map.clone())),
                None => Err(WireError::BadArg {
                    kind: "sensors_push",
                    reason: "expected an object".into(),
                }),
            },
            "reload" => Ok(Command::Reload),
            "reboot" => Ok(Command::Reboot),
            "set_brightness" => match object.get("arg").and_then(Value::as_i64) {
                Some(percent) => Ok(Command::SetBrightness(percent)),
                None => Err(WireError::BadArg {
                    kind: "set_brightness",
                    reason: "expected an integer".into(),
                }),
            },
            "exit" => Ok(Command::Exit),
            other => Err(WireError::UnknownKind(other.into())),
        }
    }
}
