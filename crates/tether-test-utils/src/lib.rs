// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tether integration tests.
//!
//! Provides scripted mocks for the external collaborators (agent runtime,
//! summarizer, reply sink) and a temp-SQLite store harness.

pub mod harness;
pub mod mock_runtime;
pub mod mock_sink;
pub mod mock_summarizer;

pub use harness::{session_config, TestStore};
pub use mock_runtime::{MockRuntime, RecordedRequest, ScriptedReply};
pub use mock_sink::MockSink;
pub use mock_summarizer::{MockSummarizer, SummarizerMode};
