// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External text-generation calls used when archiving sessions.

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::ConversationEntry;

/// Produces session summaries and folds them into a long-term summary.
///
/// Implementations may fail or return poor output; callers never let such
/// failures abort a rotation.
#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
    /// Summarizes one session's conversation log.
    async fn summarize(&self, entries: &[ConversationEntry]) -> Result<String, TetherError>;

    /// Condenses an existing cumulative summary plus newly aged session summaries
    /// into a new, shorter cumulative text.
    async fn condense(
        &self,
        existing: Option<&str>,
        new_summaries: &[String],
    ) -> Result<String, TetherError>;
}
