// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row shapes and column codecs.
//!
//! Query closures run on the tokio-rusqlite thread and can only fail with
//! `rusqlite::Error`, so they hand back raw rows; JSON and timestamp decoding
//! happens here, on the caller's side.

use chrono::{DateTime, SecondsFormat, Utc};
use tether_core::{
    ConversationEntry, CumulativeSummary, EntryMetadata, Role, SessionMetadata, TetherError,
};

/// Fixed-width RFC 3339 so lexical order matches chronological order.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, TetherError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| TetherError::storage(format!("invalid timestamp `{raw}`: {e}")))
}

pub fn encode_metadata(meta: &SessionMetadata) -> Result<String, TetherError> {
    Ok(serde_json::to_string(meta)?)
}

pub fn decode_metadata(raw: &str) -> Result<SessionMetadata, TetherError> {
    Ok(serde_json::from_str(raw)?)
}

/// A `conversation_entries` row before decoding.
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub timestamp: String,
    pub role: String,
    pub content: String,
    pub metadata: Option<String>,
}

impl EntryRow {
    pub fn encode(entry: &ConversationEntry) -> Result<Self, TetherError> {
        Ok(Self {
            timestamp: format_ts(&entry.timestamp),
            role: entry.role.to_string(),
            content: entry.content.clone(),
            metadata: entry
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }

    pub fn decode(self) -> Result<ConversationEntry, TetherError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|_| TetherError::storage(format!("unknown role `{}`", self.role)))?;
        let metadata: Option<EntryMetadata> = self
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(ConversationEntry {
            timestamp: parse_ts(&self.timestamp)?,
            role,
            content: self.content,
            metadata,
        })
    }
}

/// A `cumulative_summaries` row before decoding.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub text: String,
    pub session_count: i64,
    pub updated_at: String,
}

impl SummaryRow {
    pub fn encode(summary: &CumulativeSummary) -> Self {
        Self {
            text: summary.text.clone(),
            session_count: i64::try_from(summary.session_count).unwrap_or(i64::MAX),
            updated_at: format_ts(&summary.updated_at),
        }
    }

    pub fn decode(self) -> Result<CumulativeSummary, TetherError> {
        Ok(CumulativeSummary {
            text: self.text,
            session_count: u64::try_from(self.session_count).unwrap_or(0),
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}
