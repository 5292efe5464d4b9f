// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Tether configuration.
///
/// Every section is optional and defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    /// Agent identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Session store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Rotation policy for active sessions.
    #[serde(default)]
    pub session: SessionConfig,

    /// Per-user message queue behavior.
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent, used in replies and logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "tether".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tether").join("tether.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tether.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Session rotation policy.
///
/// A session rotates when it has been idle longer than `rotation_timeout_hours`,
/// or when its context usage crosses the ratios below. Crossing the soft ratio
/// starts a background summary; crossing the force ratio blocks the next query
/// until the switch is done.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle hours after which the next message starts a new session.
    #[serde(default = "default_rotation_timeout_hours")]
    pub rotation_timeout_hours: f64,

    /// Soft context ratio (0.0-1.0) that starts background summary preparation.
    #[serde(default = "default_rotation_context_ratio")]
    pub rotation_context_ratio: f64,

    /// Force context ratio (0.0-1.0) at which the switch blocks. Must exceed the soft ratio.
    #[serde(default = "default_rotation_force_ratio")]
    pub rotation_force_ratio: f64,

    /// Summarize sessions on archive. When false the summarizer is never called.
    #[serde(default = "default_summary_enabled")]
    pub summary_enabled: bool,

    /// Number of newest archived sessions kept in full before folding into the
    /// cumulative summary.
    #[serde(default = "default_max_recent_sessions")]
    pub max_recent_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rotation_timeout_hours: default_rotation_timeout_hours(),
            rotation_context_ratio: default_rotation_context_ratio(),
            rotation_force_ratio: default_rotation_force_ratio(),
            summary_enabled: default_summary_enabled(),
            max_recent_sessions: default_max_recent_sessions(),
        }
    }
}

fn default_rotation_timeout_hours() -> f64 {
    4.0
}

fn default_rotation_context_ratio() -> f64 {
    0.8
}

fn default_rotation_force_ratio() -> f64 {
    0.9
}

fn default_summary_enabled() -> bool {
    true
}

fn default_max_recent_sessions() -> usize {
    3
}

/// Message queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Pause length when the agent is rate limited without a known reset time.
    #[serde(default = "default_rate_limit_wait_secs")]
    pub default_rate_limit_wait_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_rate_limit_wait_secs: default_rate_limit_wait_secs(),
        }
    }
}

fn default_rate_limit_wait_secs() -> u64 {
    300 // 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.rotation_timeout_hours, 4.0);
        assert_eq!(session.rotation_context_ratio, 0.8);
        assert_eq!(session.rotation_force_ratio, 0.9);
        assert!(session.summary_enabled);
        assert_eq!(session.max_recent_sessions, 3);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: TetherConfig = toml::from_str(
            r#"
[session]
rotation_timeout_hours = 2.5
"#,
        )
        .unwrap();
        assert_eq!(config.session.rotation_timeout_hours, 2.5);
        assert_eq!(config.session.max_recent_sessions, 3);
        assert_eq!(config.queue.default_rate_limit_wait_secs, 300);
        assert_eq!(config.agent.name, "tether");
    }

    #[test]
    fn unknown_session_key_is_rejected() {
        let result = toml::from_str::<TetherConfig>(
            r#"
[session]
rotation_timeout = 2
"#,
        );
        assert!(result.is_err());
    }
}
