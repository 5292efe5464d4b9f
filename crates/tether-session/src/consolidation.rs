// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding aged archived sessions into the cumulative summary.
//!
//! The newest `max_recent_sessions` archives are kept in full. Everything older
//! is "old"; the cumulative summary's `session_count` records how many old
//! sessions it already covers, and only sessions beyond that mark are merged.

use chrono::Utc;
use tether_core::{CumulativeSummary, SessionStore, Summarizer, TetherError};
use tracing::{debug, info, warn};

use crate::summary::is_fallback;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// No old session is left uncovered.
    UpToDate,
    /// Newly aged sessions had no usable summary; only the count moved.
    Advanced { session_count: u64 },
    /// Newly aged summaries were condensed into the cumulative text.
    Merged { merged: usize, session_count: u64 },
    /// The condenser failed; the cumulative summary was left unchanged.
    CondenseFailed,
}

pub async fn consolidate(
    store: &dyn SessionStore,
    summarizer: &dyn Summarizer,
    user_id: &str,
    max_recent_sessions: usize,
) -> Result<ConsolidationOutcome, TetherError> {
    let archived = store.list_archived(user_id).await?;
    if archived.len() <= max_recent_sessions {
        return Ok(ConsolidationOutcome::UpToDate);
    }

    // Newest first, so the most recently aged sessions lead the slice.
    let old = &archived[max_recent_sessions..];
    let existing = store.read_cumulative_summary(user_id).await?;
    let covered = existing
        .as_ref()
        .map(|s| usize::try_from(s.session_count).unwrap_or(usize::MAX))
        .unwrap_or(0);
    if old.len() <= covered {
        debug!(user_id, old = old.len(), covered, "cumulative summary up to date");
        return Ok(ConsolidationOutcome::UpToDate);
    }

    let newly_aged = &old[..old.len() - covered];
    let summaries: Vec<String> = newly_aged
        .iter()
        .rev()
        .filter_map(|meta| meta.summary.as_deref())
        .filter(|summary| !is_fallback(summary))
        .map(str::to_string)
        .collect();
    let session_count = old.len() as u64;

    if summaries.is_empty() {
        let text = existing.map(|s| s.text).unwrap_or_default();
        store
            .write_cumulative_summary(
                user_id,
                &CumulativeSummary {
                    text,
                    session_count,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        debug!(user_id, session_count, "no usable summaries to merge, advanced count");
        return Ok(ConsolidationOutcome::Advanced { session_count });
    }

    let existing_text = existing.as_ref().map(|s| s.text.as_str()).filter(|t| !t.is_empty());
    let text = match summarizer.condense(existing_text, &summaries).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(user_id, "condenser returned empty output, cumulative summary unchanged");
            return Ok(ConsolidationOutcome::CondenseFailed);
        }
        Err(e) => {
            warn!(user_id, error = %e, "condense failed, cumulative summary unchanged");
            return Ok(ConsolidationOutcome::CondenseFailed);
        }
    };

    store
        .write_cumulative_summary(
            user_id,
            &CumulativeSummary {
                text,
                session_count,
                updated_at: Utc::now(),
            },
        )
        .await?;
    info!(
        user_id,
        merged = summaries.len(),
        session_count,
        "cumulative summary updated"
    );
    Ok(ConsolidationOutcome::Merged {
        merged: summaries.len(),
        session_count,
    })
}
