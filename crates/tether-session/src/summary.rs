// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session summaries with a deterministic fallback.

use tether_core::{ConversationEntry, SessionMetadata, Summarizer};
use tracing::{debug, warn};

const FALLBACK_PREFIX: &str = "[Summary generation failed]";

/// Placeholder stored when the summarizer fails or returns nothing usable.
pub fn fallback_summary(meta: &SessionMetadata) -> String {
    format!(
        "{FALLBACK_PREFIX} Session had {} messages over {} turns.",
        meta.message_count, meta.total_turns
    )
}

pub fn is_fallback(summary: &str) -> bool {
    summary.starts_with(FALLBACK_PREFIX)
}

/// Summarize a session's log. Never fails: errors and blank output become
/// [`fallback_summary`].
pub async fn summarize_or_fallback(
    summarizer: &dyn Summarizer,
    entries: &[ConversationEntry],
    meta: &SessionMetadata,
) -> String {
    match summarizer.summarize(entries).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(
                local_id = %meta.local_id,
                entries = entries.len(),
                "session summary generated"
            );
            text.trim().to_string()
        }
        Ok(_) => {
            warn!(local_id = %meta.local_id, "summarizer returned empty output, using fallback");
            fallback_summary(meta)
        }
        Err(e) => {
            warn!(local_id = %meta.local_id, error = %e, "summarization failed, using fallback");
            fallback_summary(meta)
        }
    }
}
