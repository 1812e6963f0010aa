use crate::errors::WatchError;
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Delay before a stopped agent is cleared from focus (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Maximum inbound line length accepted from the socket
pub const MAX_LINE_BYTES: usize = 256 * 1024;

/// Application configuration loaded from file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WatchConfig {
    /// Activity tracking configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Map marker configuration
    #[serde(default)]
    pub map: MapConfig,

    /// Socket listener configuration
    #[serde(default)]
    pub listener: ListenerConfig,
}

/// Activity tracker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Debounce window before clearing the current agent after it stops
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Map settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapConfig {
    /// Center used while no markers have been extracted
    #[serde(default = "default_center")]
    pub default_center: Coordinate,

    /// Report out-of-range coordinates as diagnostics
    #[serde(default = "default_true")]
    pub report_invalid_coordinates: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            report_invalid_coordinates: true,
        }
    }
}

fn default_center() -> Coordinate {
    // San Francisco
    Coordinate {
        lat: 37.7749,
        lng: -122.4194,
    }
}

fn default_true() -> bool {
    true
}

/// Socket listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerConfig {
    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-connection read timeout in seconds
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_max_connections() -> usize {
    100
}

fn default_read_timeout_secs() -> u64 {
    2
}

impl WatchConfig {
    /// Get the default configuration path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from("~/.config/responder-watch/config.toml"),
            |dirs| {
                dirs.config_dir()
                    .join("responder-watch")
                    .join("config.toml")
            },
        )
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or unreadable
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::parse_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse a config file strictly
    pub fn parse_file(path: &Path) -> Result<Self, WatchError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WatchError::ConfigError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Generate example configuration file content
    pub fn example() -> String {
        r#"# responder-watch configuration
# Place this file at ~/.config/responder-watch/config.toml

[tracker]
# Delay before a stopped agent stops being shown as active (ms)
debounce_ms = 500

[map]
# Map center while no markers have been extracted
default_center = { lat = 37.7749, lng = -122.4194 }

# Emit a diagnostic for latitudes outside [-90, 90] or longitudes outside [-180, 180]
report_invalid_coordinates = true

[listener]
max_connections = 100
read_timeout_secs = 2
"#
        .to_string()
    }
}
