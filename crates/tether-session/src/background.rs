// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background rotation preparation.
//!
//! Started when the soft context threshold is crossed. The task summarizes a
//! snapshot of the current conversation and consolidates aged sessions, then
//! parks its result until the engine performs the switch.

use std::sync::Arc;

use strum::Display;
use tether_core::{ConversationEntry, SessionMetadata, SessionStore, Summarizer};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::consolidation::consolidate;
use crate::policy::RotationPolicy;
use crate::summary::summarize_or_fallback;

/// Observable state of a user's background preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PrepStatus {
    /// Still summarizing.
    Pending,
    /// Finished; the next `ensure_active_session` switches instantly.
    Ready,
    /// Prepared for a session that is no longer active; will be dropped.
    Discarded,
}

/// What a finished preparation hands to the switch.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRotation {
    /// `None` when summaries are disabled.
    pub summary: Option<String>,
}

/// A running or finished preparation for one user.
pub struct BackgroundRotation {
    pub old_local_id: String,
    /// `message_count` of the session when the snapshot was taken.
    pub trigger_message_count: u64,
    handle: JoinHandle<PreparedRotation>,
}

impl BackgroundRotation {
    /// Spawn preparation for `meta`, summarizing `snapshot`.
    pub fn spawn(
        user_id: &str,
        meta: &SessionMetadata,
        snapshot: Vec<ConversationEntry>,
        store: Arc<dyn SessionStore>,
        summarizer: Arc<dyn Summarizer>,
        policy: RotationPolicy,
    ) -> Self {
        let user_id = user_id.to_string();
        let task_meta = meta.clone();
        let handle = tokio::spawn(async move {
            if !policy.summary_enabled {
                return PreparedRotation { summary: None };
            }
            let summary =
                summarize_or_fallback(summarizer.as_ref(), &snapshot, &task_meta).await;
            if let Err(e) = consolidate(
                store.as_ref(),
                summarizer.as_ref(),
                &user_id,
                policy.max_recent_sessions,
            )
            .await
            {
                warn!(user_id = %user_id, error = %e, "background consolidation failed");
            }
            debug!(user_id = %user_id, local_id = %task_meta.local_id, "background rotation ready");
            PreparedRotation {
                summary: Some(summary),
            }
        });

        Self {
            old_local_id: meta.local_id.clone(),
            trigger_message_count: meta.message_count,
            handle,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_finished()
    }

    /// Status relative to the session that is currently active.
    pub fn status(&self, active_local_id: Option<&str>) -> PrepStatus {
        if active_local_id != Some(self.old_local_id.as_str()) {
            PrepStatus::Discarded
        } else if self.is_ready() {
            PrepStatus::Ready
        } else {
            PrepStatus::Pending
        }
    }

    /// Await the result. `None` if the task was aborted or panicked.
    pub async fn wait(self) -> Option<PreparedRotation> {
        match self.handle.await {
            Ok(prepared) => Some(prepared),
            Err(e) => {
                warn!(local_id = %self.old_local_id, error = %e, "background rotation did not complete");
                None
            }
        }
    }

    /// Abort the task and wait for it to stop.
    pub async fn discard(self) {
        self.handle.abort();
        let _ = self.handle.await;
        debug!(local_id = %self.old_local_id, "background rotation discarded");
    }
}
