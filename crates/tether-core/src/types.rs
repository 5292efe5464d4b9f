// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by the store, the rotation engine, and the dispatch layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Author of a conversation log row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Why an active session was archived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RotationReason {
    /// Idle longer than the configured rotation timeout.
    Timeout,
    /// Context window usage crossed the soft or force ratio.
    MaxContext,
    /// Explicit user or agent request.
    Manual,
}

/// Per-turn accounting attached to assistant entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub cost_usd: f64,
    pub turns: u64,
    pub duration_ms: u64,
}

/// One append-only row of a session's conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            role: Role::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: EntryMetadata,
    ) -> Self {
        Self {
            timestamp,
            role: Role::Assistant,
            content: content.into(),
            metadata: Some(metadata),
        }
    }
}

/// A conversation turn transplanted into a new session after a rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryoverEntry {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

impl From<&ConversationEntry> for CarryoverEntry {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            role: entry.role,
            content: entry.content.clone(),
        }
    }
}

/// Metadata for an active or archived session.
///
/// Exactly one active instance exists per user; archived instances carry
/// `ended_at` and are never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub local_id: String,
    #[serde(default)]
    pub external_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub message_count: u64,
    pub total_turns: u64,
    pub total_cost_usd: f64,
    pub context_tokens: u64,
    pub context_window_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carryover: Option<Vec<CarryoverEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_reason: Option<RotationReason>,
}

impl SessionMetadata {
    /// Creates fresh metadata with a new local id and zeroed counters.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            external_session_id: None,
            created_at: now,
            updated_at: now,
            ended_at: None,
            message_count: 0,
            total_turns: 0,
            total_cost_usd: 0.0,
            context_tokens: 0,
            context_window_tokens: 0,
            summary: None,
            carryover: None,
            rotation_reason: None,
        }
    }

    /// Fraction of the context window used by the last query, or 0 when unknown.
    pub fn context_ratio(&self) -> f64 {
        if self.context_window_tokens == 0 {
            return 0.0;
        }
        self.context_tokens as f64 / self.context_window_tokens as f64
    }

    pub fn is_archived(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Whether the agent runtime has handed back a resumable session id yet.
    pub fn has_external_session(&self) -> bool {
        self.external_session_id.is_some()
    }
}

/// Long-term condensation of all archived sessions older than the recency window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSummary {
    pub text: String,
    /// High-water mark of old sessions already folded into `text`. Never decreases.
    pub session_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Optional presentation hints for a file reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    pub caption: Option<String>,
    pub mime_type: Option<String>,
}
