// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every seam uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` by the engine, the queue, and the dispatch layer.

pub mod runtime;
pub mod sink;
pub mod storage;
pub mod summarizer;

pub use runtime::{AgentRequest, AgentResponse, AgentRuntime, EventCallback, StreamEvent};
pub use sink::ReplySink;
pub use storage::SessionStore;
pub use summarizer::Summarizer;
