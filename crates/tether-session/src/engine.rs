// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rotation engine.
//!
//! Per user, the engine moves through these derived states:
//!
//! - **no session**: the first [`RotationEngine::ensure_active_session`] creates one.
//! - **fresh**: no external session id yet. Nothing to summarize, so no checks run.
//! - **normal**: thresholds are evaluated on every ensure.
//! - **preparing**: the soft ratio was crossed and a background summary is running.
//! - **ready**: the summary is done; the next ensure switches without waiting.
//!
//! Timeouts and manual rotations are synchronous and cancel any preparation.
//! Crossing the force ratio while preparing blocks the caller until the
//! summary is ready. Every operation for a user runs under that user's lock;
//! only the background task runs outside it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tether_config::model::SessionConfig;
use tether_core::{
    AgentResponse, ConversationEntry, CumulativeSummary, EntryMetadata, RotationReason,
    SessionMetadata, SessionStore, Summarizer, TetherError,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::background::{BackgroundRotation, PrepStatus, PreparedRotation};
use crate::carryover::extract_carryover;
use crate::consolidation::{consolidate, ConsolidationOutcome};
use crate::policy::RotationPolicy;
use crate::summary::summarize_or_fallback;

/// One completed agent query, as reported back to the engine.
#[derive(Debug, Clone)]
pub struct QueryExchange {
    pub prompt: String,
    pub prompted_at: DateTime<Utc>,
    pub response: AgentResponse,
}

/// Result of [`RotationEngine::record_query_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Applied,
    /// The query ran against a session that is no longer active. Nothing was written.
    Stale,
}

/// Snapshot for inspection tools.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub active: Option<SessionMetadata>,
    pub context_ratio: f64,
    pub prep: Option<PrepStatus>,
}

/// Long-term context used to prime a fresh session.
#[derive(Debug, Clone, Default)]
pub struct RecallContext {
    pub cumulative: Option<CumulativeSummary>,
    /// Newest archived sessions, newest first, at most `max_recent_sessions`.
    pub recent: Vec<SessionMetadata>,
}

#[derive(Default)]
struct UserRotationState {
    background: Option<BackgroundRotation>,
}

pub struct RotationEngine {
    store: Arc<dyn SessionStore>,
    summarizer: Arc<dyn Summarizer>,
    policy: RotationPolicy,
    users: DashMap<String, Arc<Mutex<UserRotationState>>>,
}

impl RotationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        summarizer: Arc<dyn Summarizer>,
        config: &SessionConfig,
    ) -> Self {
        Self::with_policy(store, summarizer, RotationPolicy::from_config(config))
    }

    pub fn with_policy(
        store: Arc<dyn SessionStore>,
        summarizer: Arc<dyn Summarizer>,
        policy: RotationPolicy,
    ) -> Self {
        Self {
            store,
            summarizer,
            policy,
            users: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn user_state(&self, user_id: &str) -> Arc<Mutex<UserRotationState>> {
        self.users.entry(user_id.to_string()).or_default().clone()
    }

    /// Return the session the next query should run in, rotating first if
    /// the active one has timed out, filled its context, or has a prepared
    /// replacement waiting.
    pub async fn ensure_active_session(&self, user_id: &str) -> Result<SessionMetadata, TetherError> {
        let state = self.user_state(user_id);
        let mut state = state.lock().await;

        let Some(active) = self.store.read_active(user_id).await? else {
            if let Some(stale) = state.background.take() {
                stale.discard().await;
            }
            let meta = self.store.create_active(user_id).await?;
            info!(user_id, local_id = %meta.local_id, "started first session");
            return Ok(meta);
        };

        if let Some(bg) = state
            .background
            .take_if(|bg| bg.old_local_id != active.local_id)
        {
            warn!(
                user_id,
                prepared_for = %bg.old_local_id,
                active = %active.local_id,
                "discarding background rotation for inactive session"
            );
            bg.discard().await;
        }

        if !active.has_external_session() {
            return Ok(active);
        }

        if self.policy.timed_out(&active, Utc::now()) {
            info!(
                user_id,
                local_id = %active.local_id,
                idle_since = %active.updated_at,
                "session timed out"
            );
            return self
                .rotate_locked(user_id, &mut state, RotationReason::Timeout)
                .await;
        }

        if let Some(bg) = state.background.take() {
            if bg.is_ready() {
                return self.instant_switch(user_id, &mut state, bg).await;
            } else if self.policy.force_crossed(&active) {
                info!(
                    user_id,
                    local_id = %active.local_id,
                    ratio = active.context_ratio(),
                    "force threshold reached, waiting for background summary"
                );
                return self.instant_switch(user_id, &mut state, bg).await;
            } else {
                state.background = Some(bg);
                return Ok(active);
            }
        }

        if self.policy.force_crossed(&active) {
            warn!(
                user_id,
                local_id = %active.local_id,
                ratio = active.context_ratio(),
                "force threshold reached without background preparation"
            );
            return self
                .rotate_locked(user_id, &mut state, RotationReason::MaxContext)
                .await;
        }

        if self.policy.soft_crossed(&active) {
            self.start_preparation(user_id, &mut state, &active).await?;
        }
        Ok(active)
    }

    /// Apply a completed query to the session it ran in and append the
    /// exchange to its log.
    ///
    /// Returns [`RecordOutcome::Stale`] without writing anything when
    /// `local_id` is no longer the active session.
    pub async fn record_query_result(
        &self,
        user_id: &str,
        local_id: &str,
        exchange: &QueryExchange,
    ) -> Result<RecordOutcome, TetherError> {
        let state = self.user_state(user_id);
        let mut state = state.lock().await;

        let active = self.store.read_active(user_id).await?;
        let Some(mut active) = active.filter(|meta| meta.local_id == local_id) else {
            warn!(user_id, local_id, "query finished after its session was rotated, dropping result");
            return Ok(RecordOutcome::Stale);
        };

        let response = &exchange.response;
        let now = Utc::now();
        active.message_count += 1;
        active.total_turns += response.turns;
        active.total_cost_usd += response.cost_usd;
        active.context_tokens = response.context_tokens;
        active.context_window_tokens = response.context_window_tokens;
        if let Some(external) = &response.external_session_id {
            active.external_session_id = Some(external.clone());
        }
        active.updated_at = now;
        active.carryover = None;

        let entries = [
            ConversationEntry::user(exchange.prompt.clone(), exchange.prompted_at),
            ConversationEntry::assistant(
                response.text.clone(),
                now,
                EntryMetadata {
                    cost_usd: response.cost_usd,
                    turns: response.turns,
                    duration_ms: response.duration_ms,
                },
            ),
        ];
        self.store
            .append_conversation(user_id, local_id, &entries)
            .await?;
        self.store.write_active(user_id, &active).await?;
        debug!(
            user_id,
            local_id,
            message_count = active.message_count,
            ratio = active.context_ratio(),
            "recorded query result"
        );

        if state.background.is_none()
            && active.has_external_session()
            && self.policy.soft_crossed(&active)
        {
            self.start_preparation(user_id, &mut state, &active).await?;
        }
        Ok(RecordOutcome::Applied)
    }

    /// Archive the active session and start a new one, regardless of thresholds.
    ///
    /// A session that never reached the agent is returned unchanged: there is
    /// nothing to summarize or archive.
    pub async fn rotate(
        &self,
        user_id: &str,
        reason: RotationReason,
    ) -> Result<SessionMetadata, TetherError> {
        let state = self.user_state(user_id);
        let mut state = state.lock().await;
        self.rotate_locked(user_id, &mut state, reason).await
    }

    /// Fold aged archives into the cumulative summary.
    pub async fn consolidate(&self, user_id: &str) -> Result<ConsolidationOutcome, TetherError> {
        if !self.policy.summary_enabled {
            return Ok(ConsolidationOutcome::UpToDate);
        }
        consolidate(
            self.store.as_ref(),
            self.summarizer.as_ref(),
            user_id,
            self.policy.max_recent_sessions,
        )
        .await
    }

    /// Forget the agent-side session so the next query starts it fresh.
    pub async fn clear_external_session(&self, user_id: &str) -> Result<(), TetherError> {
        let state = self.user_state(user_id);
        let _state = state.lock().await;

        if let Some(mut active) = self.store.read_active(user_id).await? {
            if active.external_session_id.take().is_some() {
                self.store.write_active(user_id, &active).await?;
                info!(user_id, local_id = %active.local_id, "cleared external session id");
            }
        }
        Ok(())
    }

    pub async fn status(&self, user_id: &str) -> Result<SessionStatus, TetherError> {
        let state = self.user_state(user_id);
        let state = state.lock().await;

        let active = self.store.read_active(user_id).await?;
        let active_id = active.as_ref().map(|meta| meta.local_id.as_str());
        let prep = state.background.as_ref().map(|bg| bg.status(active_id));
        Ok(SessionStatus {
            context_ratio: active.as_ref().map_or(0.0, SessionMetadata::context_ratio),
            active,
            prep,
        })
    }

    pub async fn recall(&self, user_id: &str) -> Result<RecallContext, TetherError> {
        let cumulative = self
            .store
            .read_cumulative_summary(user_id)
            .await?
            .filter(|summary| !summary.text.trim().is_empty());
        let mut recent = self.store.list_archived(user_id).await?;
        recent.truncate(self.policy.max_recent_sessions);
        Ok(RecallContext { cumulative, recent })
    }

    async fn start_preparation(
        &self,
        user_id: &str,
        state: &mut UserRotationState,
        active: &SessionMetadata,
    ) -> Result<(), TetherError> {
        let mut snapshot = self
            .store
            .read_conversation(user_id, &active.local_id)
            .await?;
        let snapshot_len = usize::try_from(active.message_count.saturating_mul(2)).unwrap_or(usize::MAX);
        snapshot.truncate(snapshot_len);

        info!(
            user_id,
            local_id = %active.local_id,
            ratio = active.context_ratio(),
            trigger_message_count = active.message_count,
            "soft threshold reached, preparing rotation in background"
        );
        state.background = Some(BackgroundRotation::spawn(
            user_id,
            active,
            snapshot,
            Arc::clone(&self.store),
            Arc::clone(&self.summarizer),
            self.policy,
        ));
        Ok(())
    }

    /// Switch to a new session using a prepared summary, waiting for it if needed.
    async fn instant_switch(
        &self,
        user_id: &str,
        state: &mut UserRotationState,
        bg: BackgroundRotation,
    ) -> Result<SessionMetadata, TetherError> {
        let old_local_id = bg.old_local_id.clone();
        let trigger_message_count = bg.trigger_message_count;
        let Some(PreparedRotation { summary }) = bg.wait().await else {
            return self
                .rotate_locked(user_id, state, RotationReason::MaxContext)
                .await;
        };

        // Re-read: the prepared result only applies to the session it was made for.
        let current = self.store.read_active(user_id).await?;
        let Some(current) = current.filter(|meta| meta.local_id == old_local_id) else {
            warn!(user_id, prepared_for = %old_local_id, "stale background rotation discarded");
            return match self.store.read_active(user_id).await? {
                Some(meta) => Ok(meta),
                None => self.store.create_active(user_id).await,
            };
        };

        let entries = self
            .store
            .read_conversation(user_id, &current.local_id)
            .await?;
        let carryover = extract_carryover(&entries, trigger_message_count);

        let mut archived = current;
        archived.ended_at = Some(Utc::now());
        archived.summary = summary;
        archived.rotation_reason = Some(RotationReason::MaxContext);
        self.store.archive(user_id, &archived).await?;

        let mut fresh = self.store.create_active(user_id).await?;
        if !carryover.is_empty() {
            fresh.carryover = Some(carryover);
            self.store.write_active(user_id, &fresh).await?;
        }
        info!(
            user_id,
            old_local_id = %archived.local_id,
            new_local_id = %fresh.local_id,
            carryover = fresh.carryover.as_ref().map_or(0, Vec::len),
            "rotated session using prepared summary"
        );
        Ok(fresh)
    }

    async fn rotate_locked(
        &self,
        user_id: &str,
        state: &mut UserRotationState,
        reason: RotationReason,
    ) -> Result<SessionMetadata, TetherError> {
        if let Some(bg) = state.background.take() {
            bg.discard().await;
        }

        let Some(active) = self.store.read_active(user_id).await? else {
            let meta = self.store.create_active(user_id).await?;
            info!(user_id, local_id = %meta.local_id, "started first session");
            return Ok(meta);
        };
        if !active.has_external_session() {
            debug!(user_id, local_id = %active.local_id, %reason, "session never used, nothing to rotate");
            return Ok(active);
        }

        let summary = if self.policy.summary_enabled {
            let entries = self
                .store
                .read_conversation(user_id, &active.local_id)
                .await?;
            Some(summarize_or_fallback(self.summarizer.as_ref(), &entries, &active).await)
        } else {
            None
        };

        let mut archived = active;
        archived.ended_at = Some(Utc::now());
        archived.summary = summary;
        archived.rotation_reason = Some(reason);
        self.store.archive(user_id, &archived).await?;
        let fresh = self.store.create_active(user_id).await?;
        info!(
            user_id,
            old_local_id = %archived.local_id,
            new_local_id = %fresh.local_id,
            %reason,
            "rotated session"
        );

        self.consolidate(user_id).await?;
        Ok(fresh)
    }
}
