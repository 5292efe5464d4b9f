// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Tether session engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for the active
//! session pointer, archived sessions, conversation logs, and cumulative
//! summaries. [`SqliteSessionStore`] exposes them through the
//! [`tether_core::SessionStore`] trait.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteSessionStore;
pub use database::Database;
