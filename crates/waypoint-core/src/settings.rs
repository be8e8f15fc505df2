//! Configuration for the waypoint routing engine.
//!
//! [`Settings`] holds the handful of values the engine reads from its
//! environment: the identity of the root routing table, the script prefix
//! prepended to every reversed URL, and logging options. Settings are
//! plain data; components receive the values they need explicitly rather
//! than reading a process global.

use serde::{Deserialize, Serialize};

use crate::error::{WaypointError, WaypointResult};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enables pretty, human-readable log output.
    pub debug: bool,
    /// Log level filter (e.g. `"info"`, `"waypoint_urls=debug"`).
    pub log_level: String,
    /// Identity of the root routing table, resolved through the
    /// application's table loader.
    pub root_table: String,
    /// Prefix prepended to every successfully reversed URL. Always
    /// normalized to start and end with `/`.
    pub script_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            root_table: "root".to_string(),
            script_prefix: "/".to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] if the document is
    /// not valid TOML or a key has the wrong type.
    pub fn from_toml_str(source: &str) -> WaypointResult<Self> {
        toml::from_str(source)
            .map_err(|e| WaypointError::config(format!("invalid settings: {e}")))
    }

    /// Returns the script prefix normalized to start and end with `/`.
    pub fn normalized_script_prefix(&self) -> String {
        let mut prefix = self.script_prefix.clone();
        if !prefix.starts_with('/') {
            prefix.insert(0, '/');
        }
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        prefix
    }
}
