//! Activity tracking from run/stop signals
//!
//! Per agent: Idle → Running → Completed. Globally one agent is in focus.
//! A stop does not clear the focus right away; the clear waits out the
//! debounce window so rapid stop/start toggling doesn't flicker. Any start
//! inside the window cancels the clear and takes focus immediately.

use super::agent::{ActivityStatus, AgentActivity};
use super::debounce::DebounceTimer;
use crate::event::{AgentSignal, SignalKind};
use std::time::Duration;

/// Stateful reducer: signals → current agent + activity history
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    /// Agent in focus
    current: Option<String>,
    /// Run episodes in chronological order
    history: Vec<AgentActivity>,
    /// Pending clear of `current`
    clear_timer: DebounceTimer,
}

impl ActivityTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            current: None,
            history: Vec::new(),
            clear_timer: DebounceTimer::new(debounce),
        }
    }

    pub fn current_agent(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Chronological history
    pub fn history(&self) -> &[AgentActivity] {
        &self.history
    }

    /// When the pending clear fires, if one is pending
    pub fn pending_clear(&self) -> Option<i64> {
        self.clear_timer.deadline()
    }

    /// Apply signals in order. Returns `true` if anything changed.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply_all(&mut self, signals: &[AgentSignal]) -> bool {
        signals
            .iter()
            .fold(false, |changed, signal| self.apply(signal) | changed)
    }

    /// Apply one signal
    ///
    /// The debounce runs on local arrival time (`observed_at`); the sender's
    /// `timestamp` only lands in history entries. A clear that fell due
    /// before the signal arrived fires first, so a batch applied at once ends
    /// in the same state as live delivery would.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn apply(&mut self, signal: &AgentSignal) -> bool {
        let cleared = self.tick(signal.observed_at);
        let changed = match signal.kind {
            SignalKind::Started => self.on_started(&signal.agent_id, signal.timestamp),
            SignalKind::Stopped => {
                self.on_stopped(&signal.agent_id, signal.timestamp, signal.observed_at)
            }
        };
        cleared || changed
    }

    fn on_started(&mut self, agent_id: &str, timestamp: i64) -> bool {
        if self.clear_timer.cancel() {
            tracing::debug!(agent = %agent_id, "Start inside debounce window, clear cancelled");
        }

        let mut changed = false;
        let running = self
            .history
            .iter()
            .rposition(|e| e.agent == agent_id && e.is_running());

        if let Some(idx) = running {
            // Already running: refresh the episode, don't duplicate it
            let entry = &mut self.history[idx];
            entry.last_seen_at = Some(timestamp);
            tracing::debug!(
                agent = %agent_id,
                started_at = entry.started_at,
                "Repeated start for running agent"
            );
        } else {
            self.history.push(AgentActivity::running(agent_id, timestamp));
            changed = true;
            tracing::info!(agent = %agent_id, timestamp, "Agent started");
        }

        if self.current.as_deref() != Some(agent_id) {
            self.current = Some(agent_id.to_string());
            changed = true;
        }
        changed
    }

    fn on_stopped(&mut self, agent_id: &str, timestamp: i64, observed_at: i64) -> bool {
        let mut changed = false;

        if let Some(idx) = self
            .history
            .iter()
            .rposition(|e| e.agent == agent_id && e.is_running())
        {
            let entry = &mut self.history[idx];
            entry.status = ActivityStatus::Completed;
            entry.finished_at = Some(timestamp);
            changed = true;
            tracing::info!(
                agent = %agent_id,
                duration_ms = timestamp.saturating_sub(entry.started_at),
                "Agent completed"
            );
        } else if !self.history.iter().any(|e| e.agent == agent_id) {
            // Stop without a start we saw: still record the episode
            self.history.push(AgentActivity {
                agent: agent_id.to_string(),
                started_at: timestamp,
                status: ActivityStatus::Completed,
                finished_at: Some(timestamp),
                last_seen_at: None,
            });
            changed = true;
            tracing::info!(agent = %agent_id, "Agent completed without observed start");
        } else {
            tracing::debug!(agent = %agent_id, "Duplicate stop ignored");
        }

        if self.current.as_deref() == Some(agent_id) {
            self.clear_timer.arm(observed_at);
            tracing::debug!(
                agent = %agent_id,
                deadline = ?self.clear_timer.deadline(),
                "Clear scheduled"
            );
        }
        changed
    }

    /// Fire the pending clear if its deadline has passed
    ///
    /// Returns `true` if the current agent was cleared.
    #[must_use = "check if state changed to trigger re-render"]
    pub fn tick(&mut self, now: i64) -> bool {
        if !self.clear_timer.fire_if_due(now) {
            return false;
        }
        match self.current.take() {
            Some(agent) => {
                tracing::info!(agent = %agent, "Debounce elapsed, focus cleared");
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.history.clear();
        self.clear_timer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActivitySource;

    const D: i64 = 500;

    fn tracker() -> ActivityTracker {
        ActivityTracker::new(Duration::from_millis(D as u64))
    }

    #[test]
    fn test_start_sets_current_synchronously() {
        let mut t = tracker();
        assert!(t.apply(&AgentSignal::started("A", 0)));
        assert_eq!(t.current_agent(), Some("A"));
        assert_eq!(t.history().len(), 1);
        assert!(t.history()[0].is_running());
    }

    #[test]
    fn test_stop_clears_only_after_debounce() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let _ = t.apply(&AgentSignal::stopped("A", 100));

        assert_eq!(t.current_agent(), Some("A"));
        assert_eq!(t.history()[0].status, ActivityStatus::Completed);
        assert_eq!(t.pending_clear(), Some(100 + D));

        assert!(!t.tick(100 + D - 1));
        assert_eq!(t.current_agent(), Some("A"));

        assert!(t.tick(100 + D));
        assert_eq!(t.current_agent(), None);
        assert_eq!(t.pending_clear(), None);
    }

    #[test]
    fn test_restart_within_window_never_clears() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let _ = t.apply(&AgentSignal::stopped("A", 100));
        let _ = t.apply(&AgentSignal::started("A", 300));

        assert_eq!(t.current_agent(), Some("A"));
        assert_eq!(t.pending_clear(), None);
        assert!(!t.tick(10_000));
        assert_eq!(t.current_agent(), Some("A"));
        // Two episodes: the completed one and the new run
        assert_eq!(t.history().len(), 2);
    }

    #[test]
    fn test_other_agent_start_overrides_pending_clear() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let _ = t.apply(&AgentSignal::stopped("A", 100));
        let _ = t.apply(&AgentSignal::started("B", 200));

        assert_eq!(t.current_agent(), Some("B"));
        assert!(!t.tick(10_000));
        assert_eq!(t.current_agent(), Some("B"));
    }

    #[test]
    fn test_batch_replays_elapsed_clear() {
        // Stop at 0, next start at 800: the clear at 500 happened in between
        let mut t = tracker();
        let _ = t.apply_all(&[
            AgentSignal::started("A", -100),
            AgentSignal::stopped("A", 0),
        ]);
        let _ = t.apply(&AgentSignal::started("B", 800));
        assert_eq!(t.current_agent(), Some("B"));

        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", -100));
        let _ = t.apply(&AgentSignal::stopped("A", 0));
        let _ = t.apply(&AgentSignal::stopped("B", 800));
        assert_eq!(t.current_agent(), None);
    }

    #[test]
    fn test_double_start_single_running_entry() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let changed = t.apply(&AgentSignal::started("A", 50));

        assert!(!changed);
        let running: Vec<_> = t
            .history()
            .iter()
            .filter(|e| e.agent == "A" && e.is_running())
            .collect();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].started_at, 0);
        assert_eq!(running[0].last_seen_at, Some(50));
    }

    #[test]
    fn test_debounce_follows_arrival_not_sender_clock() {
        // Sender 10s behind the local clock
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0).observed(10_000));
        let _ = t.apply(&AgentSignal::stopped("A", 100).observed(10_050));

        assert_eq!(t.pending_clear(), Some(10_050 + D));
        assert!(!t.tick(10_060));
        assert_eq!(t.current_agent(), Some("A"));
        assert_eq!(t.history()[0].started_at, 0);
        assert_eq!(t.history()[0].finished_at, Some(100));

        // Sender 60s ahead
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 70_000).observed(10_000));
        let _ = t.apply(&AgentSignal::stopped("A", 70_100).observed(10_050));
        assert!(t.tick(10_050 + D));
        assert_eq!(t.current_agent(), None);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", i64::MIN).observed(0));
        let _ = t.apply(&AgentSignal::stopped("A", i64::MAX).observed(10));
        assert_eq!(t.history()[0].status, ActivityStatus::Completed);
        assert_eq!(t.pending_clear(), Some(10 + D));
    }

    #[test]
    fn test_stop_of_non_current_agent_keeps_focus() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let _ = t.apply(&AgentSignal::started("B", 10));
        let _ = t.apply(&AgentSignal::stopped("A", 20));

        assert_eq!(t.current_agent(), Some("B"));
        assert_eq!(t.pending_clear(), None);
        assert_eq!(t.history()[0].status, ActivityStatus::Completed);
        assert!(t.history()[1].is_running());
    }

    #[test]
    fn test_stop_without_start_recorded_once() {
        let mut t = tracker();
        assert!(t.apply(&AgentSignal::stopped("ghost_agent", 5)));
        assert!(!t.apply(&AgentSignal::stopped("ghost_agent", 6)));
        assert_eq!(t.history().len(), 1);
        assert_eq!(t.history()[0].status, ActivityStatus::Completed);
        assert_eq!(t.current_agent(), None);
    }

    #[test]
    fn test_recent_first_is_reverse() {
        let mut t = tracker();
        let _ = t.apply_all(&[
            AgentSignal::started("A", 0),
            AgentSignal::started("B", 1),
            AgentSignal::started("C", 2),
        ]);
        let recent: Vec<&str> = ActivitySource::recent_first(&t)
            .into_iter()
            .map(|e| e.agent.as_str())
            .collect();
        assert_eq!(recent, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut t = tracker();
        let _ = t.apply(&AgentSignal::started("A", 0));
        let _ = t.apply(&AgentSignal::stopped("A", 1));
        t.reset();
        assert_eq!(t.current_agent(), None);
        assert!(t.history().is_empty());
        assert_eq!(t.pending_clear(), None);
    }
}
