// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Units of work and the handler that processes them.

use std::sync::Arc;

use async_trait::async_trait;
use strum::Display;
use tether_core::{ReplySink, TetherError};
use tokio_util::sync::CancellationToken;

/// One inbound message plus the sink its replies go to.
///
/// The queue never looks at `text`.
#[derive(Clone)]
pub struct QueuedMessage {
    pub user_id: String,
    pub text: String,
    /// Originating platform, for logs (`telegram`, `cli`, ...).
    pub platform: String,
    pub sink: Arc<dyn ReplySink>,
}

impl QueuedMessage {
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        platform: impl Into<String>,
        sink: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            platform: platform.into(),
            sink,
        }
    }
}

impl std::fmt::Debug for QueuedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedMessage")
            .field("user_id", &self.user_id)
            .field("platform", &self.platform)
            .field("text_len", &self.text.len())
            .finish()
    }
}

/// How a unit of work ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HandleOutcome {
    Completed,
    /// Cancelled through [`MessageQueue::interrupt`](crate::MessageQueue::interrupt).
    Interrupted,
}

/// Processes one queued message.
///
/// Implementations observe `cancel` and return [`HandleOutcome::Interrupted`]
/// when it fires. Returning [`TetherError::RateLimited`] pauses the user's
/// queue and replays the same message later.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        message: &QueuedMessage,
        cancel: CancellationToken,
    ) -> Result<HandleOutcome, TetherError>;
}
