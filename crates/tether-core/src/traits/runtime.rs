// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent runtime trait: answers one prompt, optionally resuming agent-side state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TetherError;

/// Progress notifications emitted while the runtime works on a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The runtime is still producing output (tool use, partial text).
    Progress,
    /// A chunk of assistant text.
    Text(String),
}

/// Callback invoked for each [`StreamEvent`].
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// A single prompt for the agent runtime.
#[derive(Clone)]
pub struct AgentRequest {
    pub user_id: String,
    pub prompt: String,
    /// External session id to resume, `None` to start agent-side state fresh.
    pub resume_session_id: Option<String>,
    pub on_event: Option<EventCallback>,
}

impl std::fmt::Debug for AgentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRequest")
            .field("user_id", &self.user_id)
            .field("prompt_len", &self.prompt.len())
            .field("resume_session_id", &self.resume_session_id)
            .finish()
    }
}

/// Final result of a completed agent query with its usage metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub text: String,
    pub cost_usd: f64,
    pub turns: u64,
    pub duration_ms: u64,
    /// Tokens occupied in the model's context after this query.
    pub context_tokens: u64,
    pub context_window_tokens: u64,
    pub external_session_id: Option<String>,
}

/// The process that actually answers prompts.
///
/// Implementations must observe `cancel` and return [`TetherError::Interrupted`]
/// when it fires. Throttling is reported as [`TetherError::RateLimited`]; a
/// crash while resuming is reported as [`TetherError::AgentCrashed`].
#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    async fn query(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<AgentResponse, TetherError>;
}
