pub mod ingest;
pub mod socket;

use crate::errors::WatchError;
use crate::geo::MapSnapshot;
use crate::state::ActivitySnapshot;
use serde::{Deserialize, Serialize};

/// Author of a free-text message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Tool output and anything else we don't scan
    #[serde(other)]
    Other,
}

/// One entry in the session's message history
///
/// Either a typed run/stop marker for a sub-agent, or a free-text message.
/// Only assistant text is scanned for map markers; only agent state messages
/// produce activity signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Sub-agent run/stop marker
    #[serde(rename = "AgentStateMessage", rename_all = "camelCase")]
    AgentState {
        /// Agent identifier (`nodeName` and `agentName` accepted on input)
        #[serde(default, alias = "nodeName", alias = "agentName")]
        agent_id: String,
        /// true = started, false = stopped
        running: bool,
        /// Epoch milliseconds; stamped on arrival when missing
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    /// Free-text chat message
    #[serde(rename = "TextMessage")]
    Text {
        role: Role,
        #[serde(default)]
        content: String,
    },
}

impl Message {
    /// Assistant text content, if this is an assistant message
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            Message::Text {
                role: Role::Assistant,
                content,
            } => Some(content),
            _ => None,
        }
    }

    /// Stamp agent state messages that arrived without a timestamp
    pub fn stamp(&mut self, now: i64) {
        if let Message::AgentState { timestamp, .. } = self {
            timestamp.get_or_insert(now);
        }
    }
}

/// Item accepted on the inbound channel (socket or replay file)
///
/// # Wire format
/// Newline-delimited JSON, tagged by `kind`:
/// - `{"kind":"message","message":{"type":"TextMessage","role":"assistant","content":"..."}}`
/// - `{"kind":"busy","busy":true}`
/// - `{"kind":"snapshot","currentAgent":"insights_agent","activityHistory":[...]}`
/// - `{"kind":"map","locations":[{"name":"...","lat":0.0,"lng":0.0,"place_type":"hospital"}],"center":{"lat":0.0,"lng":0.0}}`
/// - `{"kind":"reset"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Inbound {
    /// New message appended to the history
    Message { message: Message },
    /// Upstream busy flag changed
    Busy { busy: bool },
    /// Externally pushed activity state
    Snapshot(ActivitySnapshot),
    /// Externally pushed map state
    Map(MapSnapshot),
    /// Session ended, drop all derived state
    Reset,
}

impl Inbound {
    /// Decode and validate one inbound line
    pub fn parse_line(line: &str) -> Result<Self, WatchError> {
        let inbound: Inbound = serde_json::from_str(line.trim())?;
        inbound.validate()?;
        Ok(inbound)
    }

    /// Reject items that would put unlabelled entries into the view
    ///
    /// Agent state messages with an empty id are accepted here; the ingestor
    /// ignores them while they still count toward the history.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Inbound::Snapshot(snapshot) = self {
            if snapshot
                .activity_history
                .iter()
                .any(|entry| entry.agent.trim().is_empty())
            {
                return Err("snapshot history entry without agent");
            }
        }
        Ok(())
    }
}

/// Direction of a run/stop marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalKind {
    Started,
    Stopped,
}

/// Canonical agent signal produced by the ingestor, in message order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSignal {
    pub agent_id: String,
    pub kind: SignalKind,
    /// Sender's clock, epoch milliseconds. Recorded on history entries.
    pub timestamp: i64,
    /// Local arrival time, epoch milliseconds. Drives the debounce.
    pub observed_at: i64,
}

impl AgentSignal {
    pub fn started(agent_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            kind: SignalKind::Started,
            timestamp,
            observed_at: timestamp,
        }
    }

    pub fn stopped(agent_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            kind: SignalKind::Stopped,
            timestamp,
            observed_at: timestamp,
        }
    }

    /// Same signal, seen locally at `now`
    #[must_use]
    pub fn observed(mut self, now: i64) -> Self {
        self.observed_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActivityStatus;

    #[test]
    fn test_parse_agent_state_aliases() {
        for field in ["agentId", "nodeName", "agentName"] {
            let line = format!(
                r#"{{"kind":"message","message":{{"type":"AgentStateMessage","{field}":"insights_agent","running":true}}}}"#
            );
            let inbound = Inbound::parse_line(&line).unwrap();
            assert_eq!(
                inbound,
                Inbound::Message {
                    message: Message::AgentState {
                        agent_id: "insights_agent".to_string(),
                        running: true,
                        timestamp: None,
                    }
                },
                "field: {}",
                field
            );
        }
    }

    #[test]
    fn test_parse_text_roles() {
        let line = r#"{"kind":"message","message":{"type":"TextMessage","role":"assistant","content":"hi"}}"#;
        let Inbound::Message { message } = Inbound::parse_line(line).unwrap() else {
            panic!("expected message");
        };
        assert_eq!(message.assistant_text(), Some("hi"));

        let line = r#"{"kind":"message","message":{"type":"TextMessage","role":"tool","content":"x"}}"#;
        let Inbound::Message { message } = Inbound::parse_line(line).unwrap() else {
            panic!("expected message");
        };
        assert_eq!(message.assistant_text(), None);
    }

    #[test]
    fn test_parse_busy_reset_snapshot() {
        assert_eq!(
            Inbound::parse_line(r#"{"kind":"busy","busy":true}"#).unwrap(),
            Inbound::Busy { busy: true }
        );
        assert_eq!(
            Inbound::parse_line(r#"{"kind":"reset"}"#).unwrap(),
            Inbound::Reset
        );

        let line = r#"{"kind":"snapshot","currentAgent":"shelter_finder_agent","activityHistory":[{"agent":"shelter_finder_agent","timestamp":1000,"status":"running"}]}"#;
        let Inbound::Snapshot(snapshot) = Inbound::parse_line(line).unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(
            snapshot.current_agent.as_deref(),
            Some("shelter_finder_agent")
        );
        assert_eq!(snapshot.activity_history[0].started_at, 1000);
        assert_eq!(
            snapshot.activity_history[0].status,
            ActivityStatus::Running
        );
    }

    #[test]
    fn test_invalid_lines_rejected() {
        assert!(Inbound::parse_line("not json").is_err());
        assert!(Inbound::parse_line(r#"{"kind":"unknown"}"#).is_err());

        let line = r#"{"kind":"snapshot","activityHistory":[{"agent":" ","timestamp":1,"status":"completed"}]}"#;
        assert!(matches!(
            Inbound::parse_line(line),
            Err(WatchError::InvalidInbound(_))
        ));
    }

    #[test]
    fn test_stamp_only_fills_missing() {
        let mut msg = Message::AgentState {
            agent_id: "a".to_string(),
            running: true,
            timestamp: None,
        };
        msg.stamp(42);
        msg.stamp(99);
        assert!(matches!(
            msg,
            Message::AgentState {
                timestamp: Some(42),
                ..
            }
        ));
    }
}
