// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent dispatch for Tether.
//!
//! [`AgentDispatcher`] is the [`MessageHandler`](tether_queue::MessageHandler)
//! the message queue drives: it asks the rotation engine for the session to
//! use, primes fresh sessions with recalled context, queries the agent
//! runtime and records the result.

pub mod context;
pub mod dispatch;

pub use context::{assemble_prompt, render_prompt};
pub use dispatch::AgentDispatcher;
