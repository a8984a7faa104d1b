//! Foreground arbitration between the display and standby workers.
//!
//! Exactly one of the two foreground-eligible workers owns the visible
//! surface at a time. The arbiter reacts only to the collapsed connectivity
//! boolean carried by each `link_state` command; every transitional phase
//! maps to "not linked". All arbiter state is confined to the dispatcher
//! task, so nothing here needs a lock.

use std::sync::Arc;

use tracing::{info, warn};

use crate::command::Command;
use crate::link::{LinkReport, StatusLine};
use crate::worker::Worker;

/// Which worker currently owns the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foreground {
    /// No link report seen yet; no worker has been started.
    Uninitialized,
    Display,
    Standby,
}

pub struct ForegroundArbiter {
    display: Arc<dyn Worker>,
    standby: Arc<dyn Worker>,
    foreground: Foreground,
    /// Last collapsed value a transition was applied for. Tracked here, not
    /// re-derived from worker identity.
    last_linked: Option<bool>,
}

impl ForegroundArbiter {
    pub fn new(display: Arc<dyn Worker>, standby: Arc<dyn Worker>) -> Self {
        Self {
            display,
            standby,
            foreground: Foreground::Uninitialized,
            last_linked: None,
        }
    }

    pub fn foreground(&self) -> Foreground {
        self.foreground
    }

    /// Apply one `link_state` command.
    ///
    /// The standby surface is updated on every report, transition or not: a
    /// human reads connection status during the connecting sub-phases no
    /// matter which worker is foreground, and the surface must be current
    /// the instant it becomes foreground again.
    pub async fn handle_link(&mut self, report: &LinkReport) {
        let line = StatusLine::for_report(report);
        self.standby.push(Command::UiStatusText(line.text));
        self.standby.push(Command::UiProgressVisible(line.progress_visible));

        let linked = report.phase.is_online();
        if self.last_linked == Some(linked) {
            return;
        }

        // The display browser must not linger over the standby surface, so
        // it is stopped on the way out. The reverse is deliberately
        // asymmetric: standby keeps running underneath the display.
        if self.foreground == Foreground::Display {
            self.display.stop().await;
        }

        let next = if linked {
            self.display.start().await;
            Foreground::Display
        } else {
            self.standby.start().await;
            Foreground::Standby
        };

        info!(
            from = ?self.foreground,
            to = ?next,
            network = %report.network,
            "foreground switched"
        );
        self.foreground = next;
        // Applied even if the new worker's start fails internally; a dead
        // worker stays down until the next real flip.
        self.last_linked = Some(linked);
    }

    /// Forward a non-link command to whichever worker is foreground.
    pub async fn forward(&self, command: Command) {
        match self.foreground {
            Foreground::Uninitialized => {
                warn!(kind = command.kind(), "no foreground worker yet, dropping command");
            }
            Foreground::Display => self.display.push(command),
            Foreground::Standby => self.standby.push(command),
        }
    }

    /// Stop both owned workers. Used on process exit.
    pub async fn shutdown(&mut self) {
        self.display.stop().await;
        self.standby.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkPhase;
    use crate::worker::WorkerStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockWorker {
        starts: AtomicUsize,
        stops: AtomicUsize,
        pushed: Mutex<Vec<Command>>,
    }

    impl MockWorker {
        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }

        fn pushed(&self) -> Vec<Command> {
            self.pushed.lock().unwrap().clone()
        }

        fn status_lines(&self) -> Vec<String> {
            self.pushed()
                .into_iter()
                .filter_map(|command| match command {
                    Command::UiStatusText(text) => Some(text),
                    _ => None,
                })
                .collect()
        }

        fn progress_updates(&self) -> Vec<bool> {
            self.pushed()
                .into_iter()
                .filter_map(|command| match command {
                    Command::UiProgressVisible(visible) => Some(visible),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Worker for MockWorker {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn push(&self, command: Command) {
            self.pushed.lock().unwrap().push(command);
        }

        fn status(&self) -> WorkerStatus {
            WorkerStatus::Running
        }
    }

    fn arbiter() -> (ForegroundArbiter, Arc<MockWorker>, Arc<MockWorker>) {
        let display = Arc::new(MockWorker::default());
        let standby = Arc::new(MockWorker::default());
        let arbiter = ForegroundArbiter::new(
            Arc::clone(&display) as Arc<dyn Worker>,
            Arc::clone(&standby) as Arc<dyn Worker>,
        );
        (arbiter, display, standby)
    }

    fn report(phase: LinkPhase) -> LinkReport {
        LinkReport::new(phase, "lab-wifi")
    }

    #[tokio::test]
    async fn first_report_initializes_the_foreground() {
        let (mut arbiter, display, standby) = arbiter();
        assert_eq!(arbiter.foreground(), Foreground::Uninitialized);

        arbiter.handle_link(&report(LinkPhase::Disconnected)).await;

        assert_eq!(arbiter.foreground(), Foreground::Standby);
        assert_eq!(standby.starts(), 1);
        assert_eq!(display.starts(), 0);
    }

    #[tokio::test]
    async fn disconnected_connecting_connected_switches_exactly_once() {
        let (mut arbiter, display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Disconnected)).await;
        arbiter.handle_link(&report(LinkPhase::Connecting)).await;
        arbiter.handle_link(&report(LinkPhase::Connected)).await;

        // One switch to standby at initialization, one to display when the
        // link came up; the connecting sub-phase changed nothing.
        assert_eq!(standby.starts(), 1);
        assert_eq!(display.starts(), 1);
        assert_eq!(display.stops(), 0);
        assert_eq!(arbiter.foreground(), Foreground::Display);

        assert_eq!(
            standby.status_lines(),
            ["Disconnected", "Connecting to lab-wifi", "Connected to lab-wifi"]
        );
        assert_eq!(standby.progress_updates(), [false, true, false]);
    }

    #[tokio::test]
    async fn repeated_identical_values_cause_no_lifecycle_churn() {
        let (mut arbiter, display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.handle_link(&report(LinkPhase::Connected)).await;

        assert_eq!(display.starts(), 1);
        assert_eq!(display.stops(), 0);
        assert_eq!(standby.starts(), 0);
        // The status mirror still ran every time.
        assert_eq!(standby.status_lines().len(), 3);
    }

    #[tokio::test]
    async fn losing_the_link_stops_the_display_first() {
        let (mut arbiter, display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.handle_link(&report(LinkPhase::Disconnected)).await;

        assert_eq!(display.stops(), 1);
        assert_eq!(standby.starts(), 1);
        assert_eq!(arbiter.foreground(), Foreground::Standby);
    }

    #[tokio::test]
    async fn standby_is_never_stopped_on_the_way_to_display() {
        let (mut arbiter, _display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Disconnected)).await;
        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.handle_link(&report(LinkPhase::Disconnected)).await;
        arbiter.handle_link(&report(LinkPhase::Connected)).await;

        // Deliberate asymmetry: standby keeps running across every switch.
        assert_eq!(standby.stops(), 0);
        assert_eq!(standby.starts(), 2);
    }

    #[tokio::test]
    async fn each_flip_fires_one_stop_start_pair() {
        let (mut arbiter, display, _standby) = arbiter();

        let phases = [
            LinkPhase::Connected,
            LinkPhase::Disconnected,
            LinkPhase::Connecting,
            LinkPhase::Connected,
            LinkPhase::Checking,
            LinkPhase::Disconnected,
        ];
        for phase in phases {
            arbiter.handle_link(&report(phase)).await;
        }

        // Flips: none->true, true->false, false->true, true->false.
        assert_eq!(display.starts(), 2);
        assert_eq!(display.stops(), 2);
    }

    #[tokio::test]
    async fn forward_reaches_the_active_worker_only() {
        let (mut arbiter, display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.forward(Command::Reload).await;

        assert!(display.pushed().contains(&Command::Reload));
        assert!(!standby.pushed().contains(&Command::Reload));
    }

    #[tokio::test]
    async fn forward_before_initialization_drops_the_command() {
        let (arbiter, display, standby) = arbiter();

        arbiter.forward(Command::Reload).await;

        assert!(display.pushed().is_empty());
        assert!(standby.pushed().is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_both_workers() {
        let (mut arbiter, display, standby) = arbiter();

        arbiter.handle_link(&report(LinkPhase::Connected)).await;
        arbiter.shutdown().await;

        assert_eq!(display.stops(), 1);
        assert_eq!(standby.stops(), 1);
    }
}
