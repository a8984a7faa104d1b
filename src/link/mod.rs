//! Connectivity phases and the status line derived from them.

use serde::{Deserialize, Serialize};

pub mod poller;

pub use poller::LinkPoller;

/// Connectivity phase as reported by the link source.
///
/// The transitional phases mirror what a connection manager walks through on
/// the way up; the arbiter only ever reacts to the collapsed boolean, while
/// the standby surface renders the finer-grained phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    Disconnected,
    Connecting,
    Configuring,
    Checking,
    Connected,
    Disconnecting,
    /// A phase the controller does not model explicitly.
    Other(String),
}

impl LinkPhase {
    /// Collapsed connectivity boolean: true only when fully connected.
    pub fn is_online(&self) -> bool {
        matches!(self, LinkPhase::Connected)
    }

    /// True for the transitional sub-phases on the way to connected.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            LinkPhase::Connecting | LinkPhase::Configuring | LinkPhase::Checking
        )
    }
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkPhase::Disconnected => write!(f, "disconnected"),
            LinkPhase::Connecting => write!(f, "connecting"),
            LinkPhase::Configuring => write!(f, "configuring"),
            LinkPhase::Checking => write!(f, "checking"),
            LinkPhase::Connected => write!(f, "connected"),
            LinkPhase::Disconnecting => write!(f, "disconnecting"),
            LinkPhase::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A single sample from the link source: the phase plus the human-readable
/// name of the network it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub phase: LinkPhase,
    pub network: String,
}

impl LinkReport {
    pub fn new(phase: LinkPhase, network: impl Into<String>) -> Self {
        Self {
            phase,
            network: network.into(),
        }
    }
}

/// What the standby surface should show for a link report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub progress_visible: bool,
}

impl StatusLine {
    /// Derive the status line from the raw (non-collapsed) phase.
    pub fn for_report(report: &LinkReport) -> Self {
        match &report.phase {
            LinkPhase::Connected => Self {
                text: format!("Connected to {}", report.network),
                progress_visible: false,
            },
            phase if phase.is_transitional() => Self {
                text: format!("Connecting to {}", report.network),
                progress_visible: true,
            },
            LinkPhase::Disconnecting | LinkPhase::Disconnected => Self {
                text: "Disconnected".into(),
                progress_visible: false,
            },
            other => Self {
                text: other.to_string(),
                progress_visible: false,
            },
        }
    }
}
