// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly.
//!
//! Once a session has answered a query, the runtime holds its own context
//! and the user's text goes through unchanged. The first prompt of a fresh
//! session is primed with what the rotation engine kept from earlier
//! sessions: the cumulative summary, the recent session summaries, and the
//! carried-over turns of the session it replaced.

use std::fmt::Write as _;

use tether_core::{CarryoverEntry, Role, SessionMetadata, TetherError};
use tether_session::summary::is_fallback;
use tether_session::{RecallContext, RotationEngine};
use tracing::debug;

/// Builds the prompt sent to the runtime for `text`.
pub async fn assemble_prompt(
    engine: &RotationEngine,
    user_id: &str,
    session: &SessionMetadata,
    text: &str,
) -> Result<String, TetherError> {
    if session.message_count > 0 {
        return Ok(text.to_string());
    }

    let recall = engine.recall(user_id).await?;
    let carryover = session.carryover.as_deref().unwrap_or_default();
    let prompt = render_prompt(text, carryover, &recall);
    debug!(
        user_id,
        local_id = session.local_id.as_str(),
        carryover = carryover.len(),
        recent = recall.recent.len(),
        primed = prompt.len() != text.len(),
        "assembled first prompt of session"
    );
    Ok(prompt)
}

/// Renders the priming sections ahead of `text`. Returns `text` unchanged
/// when there is nothing to prime with.
pub fn render_prompt(text: &str, carryover: &[CarryoverEntry], recall: &RecallContext) -> String {
    let mut out = String::new();

    if let Some(cumulative) = &recall.cumulative {
        out.push_str("[Context from earlier conversations]\n");
        out.push_str(cumulative.text.trim());
        out.push_str("\n\n");
    }

    // Newest first in storage, oldest first in the prompt.
    let recent: Vec<_> = recall
        .recent
        .iter()
        .rev()
        .filter_map(|meta| {
            meta.summary
                .as_deref()
                .filter(|summary| !is_fallback(summary))
                .map(|summary| (meta.created_at, summary))
        })
        .collect();
    if !recent.is_empty() {
        out.push_str("[Recent sessions]\n");
        for (created_at, summary) in recent {
            let _ = writeln!(out, "- {}: {}", created_at.format("%Y-%m-%d %H:%M UTC"), summary.trim());
        }
        out.push('\n');
    }

    if !carryover.is_empty() {
        out.push_str("[Continuing from the previous session]\n");
        for entry in carryover {
            let speaker = match entry.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            let _ = writeln!(out, "{speaker}: {}", entry.content);
        }
        out.push('\n');
    }

    if out.is_empty() {
        return text.to_string();
    }
    out.push_str("[Current message]\n");
    out.push_str(text);
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tether_core::CumulativeSummary;

    use super::*;

    fn archived(summary: &str, day: u32) -> SessionMetadata {
        let mut meta = SessionMetadata::new(Utc.with_ymd_and_hms(2026, 3, day, 9, 30, 0).unwrap());
        meta.summary = Some(summary.to_string());
        meta
    }

    #[test]
    fn nothing_to_prime_returns_text() {
        let recall = RecallContext::default();
        assert_eq!(render_prompt("hi", &[], &recall), "hi");
    }

    #[test]
    fn renders_all_sections_in_order() {
        let now = Utc::now();
        let recall = RecallContext {
            cumulative: Some(CumulativeSummary {
                text: "likes rust".to_string(),
                session_count: 2,
                updated_at: now,
            }),
            recent: vec![archived("newer talk", 5), archived("older talk", 4)],
        };
        let carryover = vec![
            CarryoverEntry {
                timestamp: now,
                role: Role::User,
                content: "and then?".to_string(),
            },
            CarryoverEntry {
                timestamp: now,
                role: Role::Assistant,
                content: "then it compiled".to_string(),
            },
        ];

        let prompt = render_prompt("next question", &carryover, &recall);

        let expected = "[Context from earlier conversations]\nlikes rust\n\n\
            [Recent sessions]\n\
            - 2026-03-04 09:30 UTC: older talk\n\
            - 2026-03-05 09:30 UTC: newer talk\n\n\
            [Continuing from the previous session]\n\
            User: and then?\n\
            Assistant: then it compiled\n\n\
            [Current message]\nnext question";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn fallback_summaries_are_not_rendered() {
        let recall = RecallContext {
            cumulative: None,
            recent: vec![archived(
                "[Summary generation failed] Session had 3 messages over 3 turns.",
                1,
            )],
        };
        assert_eq!(render_prompt("hi", &[], &recall), "hi");
    }
}
