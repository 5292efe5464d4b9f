// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user message queue.
//!
//! Serializes all inbound work for a user so the agent never handles two of
//! their messages at once, lets the user interrupt the message in flight,
//! and pauses the user's queue while the agent is rate limited.

pub mod handler;
pub mod queue;

pub use handler::{HandleOutcome, MessageHandler, QueuedMessage};
pub use queue::MessageQueue;
