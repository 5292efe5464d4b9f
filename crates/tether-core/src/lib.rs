// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tether session engine.
//!
//! Holds the error taxonomy, the session data model, and the collaborator
//! traits (store, summarizer, agent runtime, reply sink) that the rotation
//! engine, the message queue, and the dispatch layer are written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TetherError;
pub use types::{
    CarryoverEntry, ConversationEntry, CumulativeSummary, EntryMetadata, FileOptions, Role,
    RotationReason, SessionMetadata,
};

pub use traits::{
    AgentRequest, AgentResponse, AgentRuntime, EventCallback, ReplySink, SessionStore,
    StreamEvent, Summarizer,
};
