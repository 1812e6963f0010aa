//! Resolution between inferred and externally pushed activity state
//!
//! The backend may push its own `{currentAgent, activityHistory}` snapshot.
//! Once one arrives it is the only source for those fields until the session
//! resets; before that, the tracker's inference is used. The two never write
//! into each other.

use super::agent::AgentActivity;
use super::tracker::ActivityTracker;
use crate::event::AgentSignal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anything that can answer "who is active, and what ran before"
pub trait ActivitySource {
    fn current_agent(&self) -> Option<&str>;

    /// Chronological history
    fn history(&self) -> &[AgentActivity];

    /// History most-recent-first
    fn recent_first(&self) -> Vec<&AgentActivity> {
        self.history().iter().rev().collect()
    }
}

impl ActivitySource for ActivityTracker {
    fn current_agent(&self) -> Option<&str> {
        ActivityTracker::current_agent(self)
    }

    fn history(&self) -> &[AgentActivity] {
        ActivityTracker::history(self)
    }
}

/// Activity state pushed by the agent backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    #[serde(default)]
    pub current_agent: Option<String>,
    #[serde(default)]
    pub activity_history: Vec<AgentActivity>,
}

impl ActivitySource for ActivitySnapshot {
    fn current_agent(&self) -> Option<&str> {
        self.current_agent.as_deref().filter(|id| !id.trim().is_empty())
    }

    fn history(&self) -> &[AgentActivity] {
        &self.activity_history
    }
}

/// Which source the view currently reflects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Inferred,
    External,
}

/// Single owner of current-agent and history state
#[derive(Debug, Clone)]
pub struct ActivityProvider {
    tracker: ActivityTracker,
    external: Option<ActivitySnapshot>,
}

impl ActivityProvider {
    pub fn new(debounce: Duration) -> Self {
        Self {
            tracker: ActivityTracker::new(debounce),
            external: None,
        }
    }

    pub fn kind(&self) -> SourceKind {
        if self.external.is_some() {
            SourceKind::External
        } else {
            SourceKind::Inferred
        }
    }

    /// The source the view should read
    pub fn source(&self) -> &dyn ActivitySource {
        match &self.external {
            Some(snapshot) => snapshot,
            None => &self.tracker,
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    /// Feed signals to the tracker
    ///
    /// Returns `true` only if the visible state changed, i.e. while inferring.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_signals(&mut self, signals: &[AgentSignal]) -> bool {
        let changed = self.tracker.apply_all(signals);
        changed && self.kind() == SourceKind::Inferred
    }

    /// Replace the external snapshot; from now on it is authoritative
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_snapshot(&mut self, snapshot: ActivitySnapshot) -> bool {
        if self.external.as_ref() == Some(&snapshot) {
            return false;
        }
        if self.external.is_none() {
            tracing::info!("External activity snapshot received, switching source");
        }
        tracing::debug!(
            current = ?snapshot.current_agent,
            history = snapshot.activity_history.len(),
            "Activity snapshot applied"
        );
        self.external = Some(snapshot);
        true
    }

    #[must_use = "check if state changed to trigger re-render"]
    pub fn tick(&mut self, now: i64) -> bool {
        let cleared = self.tracker.tick(now);
        cleared && self.kind() == SourceKind::Inferred
    }

    /// Next time `tick` has work to do, if the view depends on it
    pub fn next_deadline(&self) -> Option<i64> {
        match self.kind() {
            SourceKind::Inferred => self.tracker.pending_clear(),
            SourceKind::External => None,
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.external = None;
    }
}
