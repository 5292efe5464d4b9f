// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tether session engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The primary error type used across Tether components and collaborator traits.
///
/// Variants are tagged by how the caller must react: [`Interrupted`](TetherError::Interrupted)
/// is not a failure at all, [`RateLimited`](TetherError::RateLimited) pauses the
/// user's queue, [`AgentCrashed`](TetherError::AgentCrashed) is retried once, and
/// [`Storage`](TetherError::Storage) is fatal to the current operation.
#[derive(Debug, Error)]
pub enum TetherError {
    /// The in-flight unit of work was cancelled by the user.
    #[error("interrupted by user")]
    Interrupted,

    /// The agent runtime is throttling requests.
    ///
    /// `reset_at` is when the upstream expects to accept requests again, if known.
    #[error("rate limited{}", format_reset(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The agent process died while resuming an external session.
    #[error("agent process crashed: {message}")]
    AgentCrashed { message: String },

    /// Summary or condensation call failed or produced unusable output.
    #[error("summarization failed: {message}")]
    Summarization { message: String },

    /// Persistence backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other agent runtime failure.
    #[error("agent error: {message}")]
    Agent {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid values, missing sections).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TetherError::Storage {
            source: source.into(),
        }
    }

    /// Builds an agent error from a message alone.
    pub fn agent(message: impl Into<String>) -> Self {
        TetherError::Agent {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the operation may succeed if attempted again later without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TetherError::RateLimited { .. } | TetherError::AgentCrashed { .. }
        )
    }
}

fn format_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(t) => format!(" until {}", t.to_rfc3339()),
        None => String::new(),
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(e: serde_json::Error) -> Self {
        TetherError::storage(e)
    }
}
