// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing reply sink.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use tether_core::{FileOptions, ReplySink, TetherError};

/// A [`ReplySink`] that records everything sent through it.
///
/// With `set_failing(true)` every call records nothing and returns an error,
/// which lets tests check that sink failures never stop processing.
pub struct MockSink {
    replies: Mutex<Vec<String>>,
    files: Mutex<Vec<PathBuf>>,
    typing: AtomicUsize,
    failing: AtomicBool,
    notify: Notify,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            typing: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn replies(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }

    pub async fn files(&self) -> Vec<PathBuf> {
        self.files.lock().await.clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` replies have been captured.
    pub async fn wait_for_replies(&self, count: usize) -> Vec<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let replies = self.replies.lock().await;
                if replies.len() >= count {
                    return replies.clone();
                }
            }
            notified.await;
        }
    }

    fn check(&self) -> Result<(), TetherError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TetherError::Internal("mock sink failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySink for MockSink {
    async fn reply(&self, text: &str) -> Result<(), TetherError> {
        self.check()?;
        self.replies.lock().await.push(text.to_string());
        self.notify.notify_waiters();
        Ok(())
    }

    async fn send_file(&self, path: &Path, _opts: &FileOptions) -> Result<(), TetherError> {
        self.check()?;
        self.files.lock().await.push(path.to_path_buf());
        Ok(())
    }

    async fn show_typing(&self) -> Result<(), TetherError> {
        self.check()?;
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
