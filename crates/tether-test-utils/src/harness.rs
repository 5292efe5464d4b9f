// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-directory SQLite store for integration tests.

use std::sync::Arc;

use tether_config::model::{SessionConfig, StorageConfig};
use tether_core::TetherError;
use tether_storage::SqliteSessionStore;

/// A file-backed [`SqliteSessionStore`] living in a temp directory that is
/// removed on drop.
pub struct TestStore {
    pub store: Arc<SqliteSessionStore>,
    _temp_dir: tempfile::TempDir,
}

impl TestStore {
    pub async fn new() -> Result<Self, TetherError> {
        let temp_dir = tempfile::TempDir::new().map_err(TetherError::storage)?;
        let config = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        let store = SqliteSessionStore::open(&config).await?;
        Ok(Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        })
    }
}

/// Session config with the given soft/force ratios and the remaining defaults.
pub fn session_config(soft: f64, force: f64) -> SessionConfig {
    SessionConfig {
        rotation_context_ratio: soft,
        rotation_force_ratio: force,
        ..SessionConfig::default()
    }
}
