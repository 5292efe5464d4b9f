// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use tether_core::TetherError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `TetherError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TetherError {
    TetherError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Tether SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    wal_mode: bool,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and apply migrations.
    pub async fn open(path: &str) -> Result<Self, TetherError> {
        Self::open_with(path, true).await
    }

    /// Open the database with an explicit journal mode choice.
    ///
    /// Missing parent directories are created.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TetherError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(TetherError::storage)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(TetherError::storage)?;
        let db = Self { conn, wal_mode };
        db.initialize().await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema. Used by tests and tooling.
    pub async fn open_in_memory() -> Result<Self, TetherError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(TetherError::storage)?;
        let db = Self {
            conn,
            wal_mode: false,
        };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), TetherError> {
        let wal_mode = self.wal_mode;
        let journal = self
            .conn
            .call(move |conn| -> Result<String, rusqlite::Error> {
                let journal = if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?
                } else {
                    conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))?
                };
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                Ok(journal)
            })
            .await
            .map_err(map_tr_err)?;
        debug!(journal_mode = %journal, "pragmas applied");

        self.conn
            .call(|conn| run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<TetherError>| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => TetherError::storage(other.to_string()),
            })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL (when enabled) and close the connection.
    pub async fn close(self) -> Result<(), TetherError> {
        if self.wal_mode {
            self.conn
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
        }
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}
