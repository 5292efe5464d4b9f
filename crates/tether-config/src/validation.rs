// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TetherConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &TetherConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let session = &config.session;

    if !(session.rotation_timeout_hours > 0.0) {
        fail(format!(
            "session.rotation_timeout_hours must be positive, got {}",
            session.rotation_timeout_hours
        ));
    }

    for (key, value) in [
        ("rotation_context_ratio", session.rotation_context_ratio),
        ("rotation_force_ratio", session.rotation_force_ratio),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            fail(format!("session.{key} must be in (0.0, 1.0], got {value}"));
        }
    }

    if session.rotation_force_ratio <= session.rotation_context_ratio {
        fail(format!(
            "session.rotation_force_ratio ({}) must be greater than session.rotation_context_ratio ({})",
            session.rotation_force_ratio, session.rotation_context_ratio
        ));
    }

    if session.max_recent_sessions < 1 {
        fail("session.max_recent_sessions must be at least 1".to_string());
    }

    if config.queue.default_rate_limit_wait_secs == 0 {
        fail("queue.default_rate_limit_wait_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &TetherConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TetherConfig::default()).is_ok());
    }

    #[test]
    fn force_ratio_must_exceed_soft_ratio() {
        let mut config = TetherConfig::default();
        config.session.rotation_context_ratio = 0.9;
        config.session.rotation_force_ratio = 0.9;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("must be greater than")));
    }

    #[test]
    fn out_of_range_ratios_fail() {
        let mut config = TetherConfig::default();
        config.session.rotation_context_ratio = 0.0;
        config.session.rotation_force_ratio = 1.5;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("rotation_context_ratio must be in")));
        assert!(msgs.iter().any(|m| m.contains("rotation_force_ratio must be in")));
    }

    #[test]
    fn zero_recent_sessions_fails() {
        let mut config = TetherConfig::default();
        config.session.max_recent_sessions = 0;
        assert!(messages(&config)
            .iter()
            .any(|m| m.contains("max_recent_sessions")));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TetherConfig::default();
        config.storage.database_path = "  ".to_string();
        config.session.rotation_timeout_hours = -1.0;
        config.agent.log_level = "loud".to_string();
        assert_eq!(messages(&config).len(), 3);
    }
}
