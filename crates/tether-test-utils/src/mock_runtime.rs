// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted agent runtime.
//!
//! `MockRuntime` pops one [`ScriptedReply`] per query. When the script is
//! empty it answers with a small default response.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use tether_core::{AgentRequest, AgentResponse, AgentRuntime, StreamEvent, TetherError};

/// What the runtime does for one query.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond(AgentResponse),
    /// Respond after a delay, unless cancelled first.
    Delayed(Duration, AgentResponse),
    /// Block until cancelled, then report the interruption.
    Hang,
    RateLimited(Option<DateTime<Utc>>),
    Crash(String),
    Fail(String),
}

/// The parts of an [`AgentRequest`] tests assert on.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub user_id: String,
    pub prompt: String,
    pub resume_session_id: Option<String>,
}

pub struct MockRuntime {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(VecDeque::from(script)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, reply: ScriptedReply) {
        self.script.lock().await.push_back(reply);
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// A response reporting `context_tokens` of a `window`-token context.
    pub fn response(text: &str, context_tokens: u64, window: u64) -> AgentResponse {
        AgentResponse {
            text: text.to_string(),
            cost_usd: 0.01,
            turns: 1,
            duration_ms: 100,
            context_tokens,
            context_window_tokens: window,
            external_session_id: Some("ext-session".to_string()),
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    async fn query(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<AgentResponse, TetherError> {
        self.requests.lock().await.push(RecordedRequest {
            user_id: request.user_id.clone(),
            prompt: request.prompt.clone(),
            resume_session_id: request.resume_session_id.clone(),
        });
        let next = self.script.lock().await.pop_front();

        if let Some(on_event) = &request.on_event {
            on_event(StreamEvent::Progress);
        }

        match next {
            None => Ok(Self::response("mock response", 1_000, 100_000)),
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Delayed(delay, response)) => tokio::select! {
                _ = cancel.cancelled() => Err(TetherError::Interrupted),
                _ = tokio::time::sleep(delay) => Ok(response),
            },
            Some(ScriptedReply::Hang) => {
                cancel.cancelled().await;
                Err(TetherError::Interrupted)
            }
            Some(ScriptedReply::RateLimited(reset_at)) => Err(TetherError::RateLimited { reset_at }),
            Some(ScriptedReply::Crash(message)) => Err(TetherError::AgentCrashed { message }),
            Some(ScriptedReply::Fail(message)) => Err(TetherError::agent(message)),
        }
    }
}
