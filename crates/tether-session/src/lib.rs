// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session rotation engine.
//!
//! Decides when a user's active session must be archived and replaced,
//! prepares summaries in the background once the soft context threshold is
//! crossed, swaps sessions with carryover of in-flight turns, and folds aged
//! sessions into a cumulative summary.

pub mod background;
pub mod carryover;
pub mod consolidation;
pub mod engine;
pub mod policy;
pub mod summary;

pub use background::PrepStatus;
pub use carryover::extract_carryover;
pub use consolidation::ConsolidationOutcome;
pub use engine::{QueryExchange, RecallContext, RecordOutcome, RotationEngine, SessionStatus};
pub use policy::RotationPolicy;
