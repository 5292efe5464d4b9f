// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock summarizer with call counters, failure modes, and an optional gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use tether_core::{ConversationEntry, Summarizer, TetherError};

/// How the mock answers `summarize` and `condense`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerMode {
    Succeed,
    Fail,
    Empty,
}

/// Deterministic [`Summarizer`] for tests.
///
/// `summarize` returns `"summary of N entries"`. `condense` joins the
/// existing text and the new summaries with ` | `. A gated mock blocks every
/// `summarize` call until [`MockSummarizer::release`] is called.
pub struct MockSummarizer {
    mode: Mutex<SummarizerMode>,
    summarize_calls: AtomicUsize,
    condense_calls: AtomicUsize,
    condense_inputs: Mutex<Vec<Vec<String>>>,
    gate: Option<Semaphore>,
    started: Notify,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A summarizer whose `summarize` calls wait for [`release`](Self::release).
    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            mode: Mutex::new(SummarizerMode::Succeed),
            summarize_calls: AtomicUsize::new(0),
            condense_calls: AtomicUsize::new(0),
            condense_inputs: Mutex::new(Vec::new()),
            gate,
            started: Notify::new(),
        }
    }

    pub fn set_mode(&self, mode: SummarizerMode) {
        if let Ok(mut current) = self.mode.lock() {
            *current = mode;
        }
    }

    /// Opens the gate for all current and future `summarize` calls.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.close();
        }
    }

    /// Waits until a `summarize` call has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn condense_calls(&self) -> usize {
        self.condense_calls.load(Ordering::SeqCst)
    }

    /// The `new_summaries` argument of every `condense` call, in call order.
    pub fn condense_inputs(&self) -> Vec<Vec<String>> {
        self.condense_inputs
            .lock()
            .map(|inputs| inputs.clone())
            .unwrap_or_default()
    }

    fn mode(&self) -> SummarizerMode {
        self.mode
            .lock()
            .map(|mode| *mode)
            .unwrap_or(SummarizerMode::Succeed)
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, entries: &[ConversationEntry]) -> Result<String, TetherError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            // A closed semaphore means the gate is open.
            let _ = gate.acquire().await;
        }
        match self.mode() {
            SummarizerMode::Succeed => Ok(format!("summary of {} entries", entries.len())),
            SummarizerMode::Empty => Ok("   ".to_string()),
            SummarizerMode::Fail => Err(TetherError::Summarization {
                message: "mock summarizer failure".to_string(),
            }),
        }
    }

    async fn condense(
        &self,
        existing: Option<&str>,
        new_summaries: &[String],
    ) -> Result<String, TetherError> {
        self.condense_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.condense_inputs.lock() {
            inputs.push(new_summaries.to_vec());
        }
        match self.mode() {
            SummarizerMode::Succeed => {
                let mut parts: Vec<&str> = existing.into_iter().collect();
                parts.extend(new_summaries.iter().map(String::as_str));
                Ok(parts.join(" | "))
            }
            SummarizerMode::Empty => Ok(String::new()),
            SummarizerMode::Fail => Err(TetherError::Summarization {
                message: "mock condense failure".to_string(),
            }),
        }
    }
}
