// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply sink supplied by the message-routing layer with each inbound message.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::FileOptions;

/// Per-message reply callbacks (Telegram chat, CLI stdout, ...).
///
/// Failures are reported to the caller, who logs them; a failing sink never
/// stops queue processing.
#[async_trait]
pub trait ReplySink: Send + Sync + 'static {
    async fn reply(&self, text: &str) -> Result<(), TetherError>;

    async fn send_file(&self, path: &Path, opts: &FileOptions) -> Result<(), TetherError>;

    async fn show_typing(&self) -> Result<(), TetherError>;
}
