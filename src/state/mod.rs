mod agent;
mod debounce;
mod provider;
mod tracker;

pub use agent::{
    status_line, ActivityRow, ActivityStatus, AgentActivity, AgentCategory, CurrentAgent,
};
pub use provider::{ActivityProvider, ActivitySnapshot, ActivitySource, SourceKind};

use crate::config::WatchConfig;
use crate::event::ingest::Ingestor;
use crate::event::{Inbound, Message};
use crate::geo::{Coordinate, CoordinateDiagnostic, MapMarker, MapSnapshot, MarkerStore};
use serde::Serialize;
use std::time::Duration;

/// Status line while the backend is busy but no agent has been seen yet
pub const BUSY_STATUS: &str = "Processing your request...";

/// Derived state for one chat session
///
/// Single writer: everything goes through `apply` (or the specific setters)
/// in arrival order. Readers take a `view`.
#[derive(Debug)]
pub struct Session {
    /// Full message history, append-only
    messages: Vec<Message>,
    ingestor: Ingestor,
    activity: ActivityProvider,
    /// Busy flag reported by the backend, independent of typed events
    upstream_busy: bool,
    markers: MarkerStore,
}

impl Session {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            messages: Vec::new(),
            ingestor: Ingestor::new(),
            activity: ActivityProvider::new(Duration::from_millis(config.tracker.debounce_ms)),
            upstream_busy: false,
            markers: MarkerStore::new(
                config.map.default_center,
                config.map.report_invalid_coordinates,
            ),
        }
    }

    /// Apply one inbound item. Returns `true` if the view changed.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply(&mut self, inbound: Inbound, now: i64) -> bool {
        match inbound {
            Inbound::Message { message } => self.push_message(message, now),
            Inbound::Busy { busy } => self.set_busy(busy),
            Inbound::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            Inbound::Map(snapshot) => self.apply_map_snapshot(&snapshot),
            Inbound::Reset => {
                self.reset();
                true
            }
        }
    }

    /// Append a message and update everything derived from it
    #[must_use = "check if state changed to trigger re-render"]
    pub fn push_message(&mut self, mut message: Message, now: i64) -> bool {
        message.stamp(now);
        self.messages.push(message);

        // A clear that fell due while we waited fires before new signals
        let mut changed = self.activity.tick(now);

        let signals = self.ingestor.ingest(&self.messages, now);
        changed |= self.activity.apply_signals(&signals);
        changed |= self.markers.recompute(&self.messages);
        changed
    }

    #[must_use = "check if state changed to trigger re-render"]
    pub fn set_busy(&mut self, busy: bool) -> bool {
        if self.upstream_busy == busy {
            return false;
        }
        tracing::debug!(busy, "Upstream busy flag changed");
        self.upstream_busy = busy;
        true
    }

    /// External activity state; authoritative until reset
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_snapshot(&mut self, snapshot: ActivitySnapshot) -> bool {
        self.activity.apply_snapshot(snapshot)
    }

    /// External map state; authoritative until reset
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_map_snapshot(&mut self, snapshot: &MapSnapshot) -> bool {
        self.markers.apply_snapshot(snapshot)
    }

    /// Periodic tick for the debounce clear
    #[must_use = "check if state changed to trigger re-render"]
    pub fn tick(&mut self, now: i64) -> bool {
        self.activity.tick(now)
    }

    /// When `tick` next has work to do
    pub fn next_deadline(&self) -> Option<i64> {
        self.activity.next_deadline()
    }

    /// Drop all derived state; the next message starts a new session
    pub fn reset(&mut self) {
        tracing::info!(
            messages = self.messages.len(),
            inspected = self.ingestor.cursor(),
            "Session reset"
        );
        self.messages.clear();
        self.ingestor = Ingestor::new();
        self.activity.reset();
        self.upstream_busy = false;
        self.markers.reset();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_agent(&self) -> Option<CurrentAgent> {
        self.activity
            .source()
            .current_agent()
            .map(CurrentAgent::from_id)
    }

    /// Chronological history from the resolved source
    pub fn history(&self) -> &[AgentActivity] {
        self.activity.source().history()
    }

    /// Generic in-progress indicator: an agent is in focus or the backend says busy
    pub fn busy(&self) -> bool {
        self.activity.source().current_agent().is_some() || self.upstream_busy
    }

    pub fn markers(&self) -> &[MapMarker] {
        self.markers.markers()
    }

    pub fn center(&self) -> Coordinate {
        self.markers.center()
    }

    /// Snapshot for the presentation layer
    pub fn view(&self, now: i64) -> SessionView {
        let source = self.activity.source();
        let current_agent = self.current_agent();
        let status = match &current_agent {
            Some(agent) => Some(status_line(&agent.id)),
            None if self.upstream_busy => Some(BUSY_STATUS.to_string()),
            None => None,
        };

        SessionView {
            busy: self.busy(),
            status_line: status,
            current_agent,
            source: self.activity.kind(),
            activity_history: source
                .history()
                .iter()
                .map(|a| ActivityRow::new(a, now))
                .collect(),
            recent_activity: source
                .recent_first()
                .into_iter()
                .map(|a| ActivityRow::new(a, now))
                .collect(),
            map_source: if self.markers.is_external() {
                SourceKind::External
            } else {
                SourceKind::Inferred
            },
            markers: self.markers.markers().to_vec(),
            center: self.markers.center(),
            diagnostics: self.markers.diagnostics().to_vec(),
        }
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub busy: bool,
    pub status_line: Option<String>,
    pub current_agent: Option<CurrentAgent>,
    pub source: SourceKind,
    /// Chronological
    pub activity_history: Vec<ActivityRow>,
    /// Most-recent-first
    pub recent_activity: Vec<ActivityRow>,
    /// Where markers and center come from
    pub map_source: SourceKind,
    pub markers: Vec<MapMarker>,
    pub center: Coordinate,
    pub diagnostics: Vec<CoordinateDiagnostic>,
}

/// Wall clock in epoch milliseconds
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
