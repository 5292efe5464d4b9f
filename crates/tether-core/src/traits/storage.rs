// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: typed persistence with no policy.

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::{ConversationEntry, CumulativeSummary, SessionMetadata};

/// Persistence for session metadata, conversation logs, archives, and the
/// cumulative summary, keyed by user id and session local id.
///
/// Each call completes fully before returning: no partial writes are visible,
/// and a read issued after a write from the same process observes it.
/// No operation spans more than one user.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the user's active session, if any.
    async fn read_active(&self, user_id: &str) -> Result<Option<SessionMetadata>, TetherError>;

    /// Overwrites the active session pointer.
    async fn write_active(&self, user_id: &str, meta: &SessionMetadata)
        -> Result<(), TetherError>;

    /// Removes the active session pointer without archiving.
    async fn clear_active(&self, user_id: &str) -> Result<(), TetherError>;

    /// Allocates a new session with zeroed counters and an empty log and makes it active.
    async fn create_active(&self, user_id: &str) -> Result<SessionMetadata, TetherError>;

    /// Appends entries to a session's conversation log in order.
    async fn append_conversation(
        &self,
        user_id: &str,
        local_id: &str,
        entries: &[ConversationEntry],
    ) -> Result<(), TetherError>;

    /// Reads a session's full conversation log in insertion order.
    async fn read_conversation(
        &self,
        user_id: &str,
        local_id: &str,
    ) -> Result<Vec<ConversationEntry>, TetherError>;

    /// Stores final metadata for a session. `meta.ended_at` must be set.
    async fn archive(&self, user_id: &str, meta: &SessionMetadata) -> Result<(), TetherError>;

    /// Lists archived sessions, newest first by `created_at`.
    async fn list_archived(&self, user_id: &str) -> Result<Vec<SessionMetadata>, TetherError>;

    async fn read_cumulative_summary(
        &self,
        user_id: &str,
    ) -> Result<Option<CumulativeSummary>, TetherError>;

    async fn write_cumulative_summary(
        &self,
        user_id: &str,
        summary: &CumulativeSummary,
    ) -> Result<(), TetherError>;
}
