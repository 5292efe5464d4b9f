// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rotation thresholds derived from `[session]` configuration.

use chrono::{DateTime, TimeDelta, Utc};
use tether_config::model::SessionConfig;
use tether_core::SessionMetadata;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationPolicy {
    pub timeout: TimeDelta,
    pub soft_ratio: f64,
    pub force_ratio: f64,
    pub summary_enabled: bool,
    pub max_recent_sessions: usize,
}

impl RotationPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        let timeout_ms = (config.rotation_timeout_hours * 3_600_000.0).round() as i64;
        Self {
            timeout: TimeDelta::milliseconds(timeout_ms),
            soft_ratio: config.rotation_context_ratio,
            force_ratio: config.rotation_force_ratio,
            summary_enabled: config.summary_enabled,
            max_recent_sessions: config.max_recent_sessions.max(1),
        }
    }

    /// Idle for longer than the rotation timeout.
    pub fn timed_out(&self, meta: &SessionMetadata, now: DateTime<Utc>) -> bool {
        now - meta.updated_at > self.timeout
    }

    pub fn soft_crossed(&self, meta: &SessionMetadata) -> bool {
        meta.context_ratio() >= self.soft_ratio
    }

    pub fn force_crossed(&self, meta: &SessionMetadata) -> bool {
        meta.context_ratio() >= self.force_ratio
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
