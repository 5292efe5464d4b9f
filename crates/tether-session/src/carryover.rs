// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carryover of turns that completed while a background summary was being prepared.

use tether_core::{CarryoverEntry, ConversationEntry};

/// Entries recorded after the background summary's snapshot.
///
/// Each logical message occupies two log rows (user, assistant), so the
/// snapshot taken at `trigger_message_count` ends at row `2 * trigger_message_count`.
/// Order is preserved.
pub fn extract_carryover(
    entries: &[ConversationEntry],
    trigger_message_count: u64,
) -> Vec<CarryoverEntry> {
    let start = usize::try_from(trigger_message_count.saturating_mul(2)).unwrap_or(usize::MAX);
    entries.iter().skip(start).map(CarryoverEntry::from).collect()
}
