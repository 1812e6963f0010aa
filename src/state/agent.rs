//! Agent catalog and activity records
//!
//! Known pipeline stages carry display metadata. Any other identifier still
//! gets a generated label, so no agent is ever dropped from the view.

use serde::{Deserialize, Serialize};

/// Icon used for agents missing from the catalog
const UNKNOWN_ICON: &str = "🤖";

/// Role of an agent in the response pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentCategory {
    /// Root agent routing to the others
    Coordinator,
    /// Finds active disasters
    Discovery,
    /// Queries live government feeds (FEMA, NOAA)
    LiveFeed,
    /// Locates shelters, hospitals and supplies
    Relief,
    /// Summarizes findings into an action plan
    Insights,
    /// Dataset and maps lookups
    DataTool,
    /// Not in the catalog
    Unknown,
}

/// Display metadata for a known agent
#[derive(Debug)]
pub struct AgentProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    /// Line shown while the agent is active
    pub status: &'static str,
    pub category: AgentCategory,
}

const KNOWN_AGENTS: &[AgentProfile] = &[
    AgentProfile {
        id: "first_responder",
        name: "First Responder",
        icon: "🚨",
        description: "Coordinating emergency response",
        status: "Coordinating emergency response...",
        category: AgentCategory::Coordinator,
    },
    AgentProfile {
        id: "first_responder_agent",
        name: "First Responder",
        icon: "🚨",
        description: "Coordinating emergency response",
        status: "Coordinating emergency response...",
        category: AgentCategory::Coordinator,
    },
    AgentProfile {
        id: "disaster_discovery_agent",
        name: "Disaster Discovery",
        icon: "🌪️",
        description: "Searching for active disasters and emergencies",
        status: "Discovering disasters around you...",
        category: AgentCategory::Discovery,
    },
    AgentProfile {
        id: "relief_finder_agent",
        name: "Relief Finder",
        icon: "🏥",
        description: "Locating relief resources and facilities",
        status: "Finding relief resources...",
        category: AgentCategory::Relief,
    },
    AgentProfile {
        id: "shelter_finder_agent",
        name: "Shelter Finder",
        icon: "🏠",
        description: "Finding emergency shelters nearby",
        status: "Finding shelters around you...",
        category: AgentCategory::Relief,
    },
    AgentProfile {
        id: "hospital_finder_agent",
        name: "Hospital Finder",
        icon: "🏥",
        description: "Locating medical facilities",
        status: "Finding hospitals around you...",
        category: AgentCategory::Relief,
    },
    AgentProfile {
        id: "supply_finder_agent",
        name: "Supply Finder",
        icon: "📦",
        description: "Finding emergency supplies",
        status: "Finding supplies around you...",
        category: AgentCategory::Relief,
    },
    AgentProfile {
        id: "insights_agent",
        name: "Insights Agent",
        icon: "📊",
        description: "Analyzing data and creating action plan",
        status: "Analyzing data and creating action plan...",
        category: AgentCategory::Insights,
    },
    AgentProfile {
        id: "fema_live_agent",
        name: "FEMA Data",
        icon: "🚨",
        description: "Checking FEMA disaster declarations",
        status: "Checking FEMA disaster data...",
        category: AgentCategory::LiveFeed,
    },
    AgentProfile {
        id: "noaa_live_agent",
        name: "NOAA Weather",
        icon: "🌊",
        description: "Checking weather alerts and forecasts",
        status: "Checking NOAA weather alerts...",
        category: AgentCategory::LiveFeed,
    },
    AgentProfile {
        id: "bigquery_storms_tool",
        name: "BigQuery Storms",
        icon: "🌩️",
        description: "Querying storm data from BigQuery",
        status: "Querying storm data...",
        category: AgentCategory::DataTool,
    },
    AgentProfile {
        id: "bigquery_shelter_tool",
        name: "BigQuery Shelters",
        icon: "🏠",
        description: "Querying shelter data from BigQuery",
        status: "Querying shelter data...",
        category: AgentCategory::DataTool,
    },
    AgentProfile {
        id: "bigquery_hospital_tool",
        name: "BigQuery Hospitals",
        icon: "🏥",
        description: "Querying hospital data from BigQuery",
        status: "Querying hospital data...",
        category: AgentCategory::DataTool,
    },
    AgentProfile {
        id: "bigquery_supply_tool",
        name: "BigQuery Supplies",
        icon: "📦",
        description: "Querying supply data from BigQuery",
        status: "Querying supply data...",
        category: AgentCategory::DataTool,
    },
    AgentProfile {
        id: "maps_search_tool",
        name: "Google Maps Search",
        icon: "🗺️",
        description: "Searching locations on Google Maps",
        status: "Searching locations on the map...",
        category: AgentCategory::DataTool,
    },
];

/// Look up a known agent
pub fn lookup(agent_id: &str) -> Option<&'static AgentProfile> {
    KNOWN_AGENTS.iter().find(|p| p.id == agent_id)
}

/// Human-readable label: catalog name, or one generated from the id
pub fn display_label(agent_id: &str) -> String {
    lookup(agent_id).map_or_else(|| generated_label(agent_id), |p| p.name.to_string())
}

/// Label for identifiers missing from the catalog
///
/// Drops a trailing `_agent`, turns `_` and `-` into spaces and capitalizes
/// each word: `flood_gauge_agent` → `Flood Gauge`. Falls back to the raw id
/// when nothing is left.
pub fn generated_label(agent_id: &str) -> String {
    let base = agent_id.strip_suffix("_agent").unwrap_or(agent_id);
    let words: Vec<String> = base
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        agent_id.to_string()
    } else {
        words.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn icon(agent_id: &str) -> &'static str {
    lookup(agent_id).map_or(UNKNOWN_ICON, |p| p.icon)
}

pub fn category(agent_id: &str) -> AgentCategory {
    lookup(agent_id).map_or(AgentCategory::Unknown, |p| p.category)
}

/// Status line shown while the agent is in focus
pub fn status_line(agent_id: &str) -> String {
    lookup(agent_id).map_or_else(
        || format!("Running {}...", generated_label(agent_id)),
        |p| p.status.to_string(),
    )
}

/// Lifecycle of one run episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Running,
    Completed,
}

/// One run episode of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub agent: String,
    /// Epoch milliseconds (`timestamp` accepted on input)
    #[serde(alias = "timestamp")]
    pub started_at: i64,
    pub status: ActivityStatus,
    /// Epoch milliseconds, set when the episode completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    /// Latest repeated start seen while the episode was running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<i64>,
}

impl AgentActivity {
    pub fn running(agent: impl Into<String>, started_at: i64) -> Self {
        Self {
            agent: agent.into(),
            started_at,
            status: ActivityStatus::Running,
            finished_at: None,
            last_seen_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ActivityStatus::Running
    }

    /// Relative age for display: `"12s ago"`, `"3m ago"`
    pub fn age_label(&self, now: i64) -> String {
        let secs = now.saturating_sub(self.started_at).max(0) / 1000;
        if secs < 60 {
            format!("{secs}s ago")
        } else {
            format!("{}m ago", secs / 60)
        }
    }
}

/// Agent currently in focus, as exposed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAgent {
    pub id: String,
    pub display_label: String,
    pub category: AgentCategory,
    pub icon: &'static str,
    /// Catalog description, absent for unknown agents
    pub description: Option<&'static str>,
}

impl CurrentAgent {
    pub fn from_id(agent_id: &str) -> Self {
        Self {
            id: agent_id.to_string(),
            display_label: display_label(agent_id),
            category: category(agent_id),
            icon: icon(agent_id),
            description: lookup(agent_id).map(|p| p.description),
        }
    }
}

/// History row with display fields attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub agent: String,
    pub label: String,
    pub icon: &'static str,
    pub started_at: i64,
    pub status: ActivityStatus,
    pub age: String,
}

impl ActivityRow {
    pub fn new(activity: &AgentActivity, now: i64) -> Self {
        Self {
            agent: activity.agent.clone(),
            label: display_label(&activity.agent),
            icon: icon(&activity.agent),
            started_at: activity.started_at,
            status: activity.status,
            age: activity.age_label(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_labels() {
        let cases = vec![
            ("flood_gauge_agent", "Flood Gauge"),
            ("road-closure-agent", "Road Closure Agent"),
            ("wildfire", "Wildfire"),
            ("evac__route_agent", "Evac Route"),
            ("_agent", "_agent"),
            ("", ""),
        ];
        for (id, expected) in cases {
            assert_eq!(generated_label(id), expected, "id: {:?}", id);
        }
    }

    #[test]
    fn test_catalog_wins_over_generated() {
        assert_eq!(display_label("noaa_live_agent"), "NOAA Weather");
        assert_eq!(category("noaa_live_agent"), AgentCategory::LiveFeed);
        assert_eq!(status_line("shelter_finder_agent"), "Finding shelters around you...");
    }

    #[test]
    fn test_unknown_agent_still_described() {
        let current = CurrentAgent::from_id("levee_monitor_agent");
        assert_eq!(current.display_label, "Levee Monitor");
        assert_eq!(current.category, AgentCategory::Unknown);
        assert_eq!(current.icon, UNKNOWN_ICON);
        assert_eq!(status_line("levee_monitor_agent"), "Running Levee Monitor...");
    }

    #[test]
    fn test_age_label() {
        let activity = AgentActivity::running("a", 10_000);
        assert_eq!(activity.age_label(10_000), "0s ago");
        assert_eq!(activity.age_label(22_500), "12s ago");
        assert_eq!(activity.age_label(10_000 + 185_000), "3m ago");
        // Clock skew never goes negative
        assert_eq!(activity.age_label(0), "0s ago");

        let ancient = AgentActivity::running("a", i64::MIN);
        assert_eq!(ancient.age_label(1_000), format!("{}m ago", i64::MAX / 1000 / 60));
        let future = AgentActivity::running("a", i64::MAX);
        assert_eq!(future.age_label(i64::MIN), "0s ago");
    }
}
