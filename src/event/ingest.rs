//! Normalizes the message history into canonical agent signals
//!
//! Every message past the cursor is inspected, not just the latest one, so a
//! start/stop pair that lands between two notifications is never lost.

use super::{AgentSignal, Message};

/// Cursor over the message history
#[derive(Debug, Default)]
pub struct Ingestor {
    /// Number of messages already inspected
    cursor: usize,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages inspected so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Produce signals for all messages not seen yet, in order
    ///
    /// `now` stamps agent state messages that carry no timestamp. The cursor
    /// only moves forward; a history shorter than the cursor yields nothing.
    pub fn ingest(&mut self, messages: &[Message], now: i64) -> Vec<AgentSignal> {
        if messages.len() < self.cursor {
            tracing::warn!(
                cursor = self.cursor,
                len = messages.len(),
                "Message history shrank below cursor, ignoring"
            );
            return Vec::new();
        }

        let signals: Vec<AgentSignal> = messages[self.cursor..]
            .iter()
            .filter_map(|message| signal_from_message(message, now))
            .collect();

        if !signals.is_empty() {
            tracing::debug!(
                from = self.cursor,
                to = messages.len(),
                count = signals.len(),
                "Ingested agent signals"
            );
        }

        self.cursor = messages.len();
        signals
    }
}

/// Signal carried by a single message, if any
///
/// Only agent state messages with a non-empty agent id produce a signal.
pub fn signal_from_message(message: &Message, now: i64) -> Option<AgentSignal> {
    match message {
        Message::AgentState {
            agent_id,
            running,
            timestamp,
        } => {
            let agent_id = agent_id.trim();
            if agent_id.is_empty() {
                return None;
            }
            let timestamp = timestamp.unwrap_or(now);
            let signal = if *running {
                AgentSignal::started(agent_id, timestamp)
            } else {
                AgentSignal::stopped(agent_id, timestamp)
            };
            Some(signal.observed(now))
        }
        Message::Text { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Role, SignalKind};

    fn state(agent: &str, running: bool, ts: i64) -> Message {
        Message::AgentState {
            agent_id: agent.to_string(),
            running,
            timestamp: Some(ts),
        }
    }

    fn text(content: &str) -> Message {
        Message::Text {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_back_to_back_pair_not_lost() {
        let mut ingestor = Ingestor::new();
        let messages = vec![
            state("shelter_finder_agent", true, 10),
            state("shelter_finder_agent", false, 20),
            text("done"),
        ];

        let signals = ingestor.ingest(&messages, 0);

        assert_eq!(
            signals,
            vec![
                AgentSignal::started("shelter_finder_agent", 10).observed(0),
                AgentSignal::stopped("shelter_finder_agent", 20).observed(0),
            ]
        );
        assert_eq!(ingestor.cursor(), 3);
    }

    #[test]
    fn test_only_unseen_messages_inspected() {
        let mut ingestor = Ingestor::new();
        let mut messages = vec![state("a", true, 1)];
        assert_eq!(ingestor.ingest(&messages, 0).len(), 1);

        // Nothing new
        assert!(ingestor.ingest(&messages, 0).is_empty());

        messages.push(text("no marker"));
        messages.push(state("a", false, 2));
        let signals = ingestor.ingest(&messages, 0);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Stopped);
    }

    #[test]
    fn test_empty_agent_id_ignored() {
        let mut ingestor = Ingestor::new();
        let messages = vec![state("", true, 1), state("   ", false, 2)];
        assert!(ingestor.ingest(&messages, 0).is_empty());
        assert_eq!(ingestor.cursor(), 2);
    }

    #[test]
    fn test_missing_timestamp_uses_now() {
        let message = Message::AgentState {
            agent_id: " insights_agent ".to_string(),
            running: true,
            timestamp: None,
        };
        let signal = signal_from_message(&message, 777).unwrap();
        assert_eq!(signal, AgentSignal::started("insights_agent", 777));
    }

    #[test]
    fn test_sender_time_kept_apart_from_arrival() {
        let signal = signal_from_message(&state("a", false, 100), 10_050).unwrap();
        assert_eq!(signal.timestamp, 100);
        assert_eq!(signal.observed_at, 10_050);
    }

    #[test]
    fn test_cursor_never_rewinds() {
        let mut ingestor = Ingestor::new();
        let messages = vec![state("a", true, 1), state("b", true, 2)];
        let _ = ingestor.ingest(&messages, 0);

        assert!(ingestor.ingest(&messages[..1], 0).is_empty());
        assert_eq!(ingestor.cursor(), 2);
    }
}
