//! Offline replay of a JSONL capture
//!
//! Time comes from the capture, not the wall clock: agent state timestamps
//! advance the clock, everything else happens at the last seen time. A clear
//! still pending at the end of the capture fires in `finish`.

use crate::config::WatchConfig;
use crate::errors::{Result, WatchError};
use crate::event::{Inbound, Message};
use crate::state::{Session, SessionView};
use std::path::Path;

pub struct Replay {
    session: Session,
    /// Epoch milliseconds of the latest timestamp seen
    clock: i64,
}

impl Replay {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            session: Session::new(config),
            clock: 0,
        }
    }

    pub fn clock(&self) -> i64 {
        self.clock
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply one item at the capture's notion of now
    pub fn feed(&mut self, inbound: Inbound) -> bool {
        if let Inbound::Message {
            message: Message::AgentState {
                timestamp: Some(ts),
                ..
            },
        } = &inbound
        {
            self.clock = self.clock.max(*ts);
        }
        self.session.apply(inbound, self.clock)
    }

    /// Let a pending debounce clear run to completion
    pub fn finish(&mut self) -> bool {
        let Some(deadline) = self.session.next_deadline() else {
            return false;
        };
        self.clock = self.clock.max(deadline);
        self.session.tick(self.clock)
    }

    pub fn view(&self) -> SessionView {
        self.session.view(self.clock)
    }
}

/// Replay a capture file
///
/// Returns the final view, preceded by one view per applied line when
/// `every` is set. Blank lines are skipped; a line that does not decode
/// aborts the replay with its line number.
pub fn run(path: &Path, config: &WatchConfig, every: bool) -> Result<Vec<SessionView>> {
    let content = std::fs::read_to_string(path)?;
    let mut replay = Replay::new(config);
    let mut views = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let inbound = Inbound::parse_line(line).map_err(|e| WatchError::ReplayError {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        let changed = replay.feed(inbound);
        if every && changed {
            views.push(replay.view());
        }
    }

    let cleared = replay.finish();
    if !every || cleared || views.is_empty() {
        views.push(replay.view());
    }

    tracing::info!(
        path = %path.display(),
        messages = replay.session().messages().len(),
        clock = replay.clock(),
        views = views.len(),
        "Replay finished"
    );
    Ok(views)
}
