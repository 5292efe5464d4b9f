// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue's unit of work: one message through the rotation engine and
//! the agent runtime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tether_core::{
    AgentRequest, AgentResponse, AgentRuntime, EventCallback, ReplySink, StreamEvent, TetherError,
};
use tether_queue::{HandleOutcome, MessageHandler, QueuedMessage};
use tether_session::{QueryExchange, RecordOutcome, RotationEngine};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::assemble_prompt;

/// Runs queued messages against the agent runtime.
///
/// For each message: show typing, make sure the session is still valid,
/// assemble the prompt, query the runtime, record the result and reply.
/// Rate limits are returned to the queue untouched so it can pause.
pub struct AgentDispatcher {
    engine: Arc<RotationEngine>,
    runtime: Arc<dyn AgentRuntime>,
}

impl AgentDispatcher {
    pub fn new(engine: Arc<RotationEngine>, runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { engine, runtime }
    }

    pub fn engine(&self) -> &Arc<RotationEngine> {
        &self.engine
    }

    async fn query(
        &self,
        message: &QueuedMessage,
        prompt: String,
        resume_session_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, TetherError> {
        let request = AgentRequest {
            user_id: message.user_id.clone(),
            prompt,
            resume_session_id,
            on_event: Some(typing_refresher(Arc::clone(&message.sink))),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TetherError::Interrupted),
            result = self.runtime.query(request, cancel.clone()) => result,
        }
    }
}

#[async_trait]
impl MessageHandler for AgentDispatcher {
    async fn handle(
        &self,
        message: &QueuedMessage,
        cancel: CancellationToken,
    ) -> Result<HandleOutcome, TetherError> {
        let user_id = message.user_id.as_str();
        show_typing(message.sink.as_ref(), user_id).await;

        let session = self.engine.ensure_active_session(user_id).await?;
        let prompt = assemble_prompt(&self.engine, user_id, &session, &message.text).await?;
        let prompted_at = Utc::now();

        let resume = session.external_session_id.clone();
        let result = match self.query(message, prompt.clone(), resume, &cancel).await {
            Err(TetherError::AgentCrashed { message: crash }) if session.has_external_session() => {
                warn!(
                    user_id,
                    local_id = session.local_id.as_str(),
                    error = crash.as_str(),
                    "agent crashed while resuming, retrying with a fresh agent session"
                );
                self.engine.clear_external_session(user_id).await?;
                self.query(message, prompt, None, &cancel).await
            }
            other => other,
        };

        let response = match result {
            Ok(response) => response,
            Err(TetherError::Interrupted) => {
                info!(user_id, local_id = session.local_id.as_str(), "query interrupted");
                return Ok(HandleOutcome::Interrupted);
            }
            Err(e) => return Err(e),
        };

        let exchange = QueryExchange {
            prompt: message.text.clone(),
            prompted_at,
            response,
        };
        let outcome = self
            .engine
            .record_query_result(user_id, &session.local_id, &exchange)
            .await?;
        debug!(
            user_id,
            local_id = session.local_id.as_str(),
            applied = outcome == RecordOutcome::Applied,
            cost_usd = exchange.response.cost_usd,
            "query completed"
        );

        if let Err(e) = message.sink.reply(&exchange.response.text).await {
            warn!(user_id, error = %e, "failed to send reply");
        }
        Ok(HandleOutcome::Completed)
    }
}

async fn show_typing(sink: &dyn ReplySink, user_id: &str) {
    if let Err(e) = sink.show_typing().await {
        debug!(user_id, error = %e, "failed to send typing indicator");
    }
}

/// Callback that refreshes the typing indicator whenever the runtime
/// reports progress.
fn typing_refresher(sink: Arc<dyn ReplySink>) -> EventCallback {
    Arc::new(move |event| {
        if event != StreamEvent::Progress {
            return;
        }
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            if let Err(e) = sink.show_typing().await {
                debug!(error = %e, "failed to refresh typing indicator");
            }
        });
    })
}
