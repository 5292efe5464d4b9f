// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionStore`] trait.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use tether_config::model::StorageConfig;
use tether_core::{
    ConversationEntry, CumulativeSummary, SessionMetadata, SessionStore, TetherError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed session store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database described by `config` and wrap it.
    pub async fn open(config: &StorageConfig) -> Result<Self, TetherError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(self) -> Result<(), TetherError> {
        self.db.close().await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn read_active(&self, user_id: &str) -> Result<Option<SessionMetadata>, TetherError> {
        queries::active::read_active(&self.db, user_id).await
    }

    async fn write_active(
        &self,
        user_id: &str,
        meta: &SessionMetadata,
    ) -> Result<(), TetherError> {
        queries::active::write_active(&self.db, user_id, meta).await
    }

    async fn clear_active(&self, user_id: &str) -> Result<(), TetherError> {
        let existed = queries::active::clear_active(&self.db, user_id).await?;
        debug!(user_id, existed, "cleared active session pointer");
        Ok(())
    }

    async fn create_active(&self, user_id: &str) -> Result<SessionMetadata, TetherError> {
        let meta = SessionMetadata::new(Utc::now());
        queries::active::create_active(&self.db, user_id, &meta).await?;
        debug!(user_id, local_id = %meta.local_id, "created active session");
        Ok(meta)
    }

    async fn append_conversation(
        &self,
        user_id: &str,
        local_id: &str,
        entries: &[ConversationEntry],
    ) -> Result<(), TetherError> {
        queries::conversation::append(&self.db, user_id, local_id, entries).await
    }

    async fn read_conversation(
        &self,
        user_id: &str,
        local_id: &str,
    ) -> Result<Vec<ConversationEntry>, TetherError> {
        queries::conversation::read(&self.db, user_id, local_id).await
    }

    async fn archive(&self, user_id: &str, meta: &SessionMetadata) -> Result<(), TetherError> {
        queries::sessions::archive(&self.db, user_id, meta).await?;
        debug!(user_id, local_id = %meta.local_id, "archived session");
        Ok(())
    }

    async fn list_archived(&self, user_id: &str) -> Result<Vec<SessionMetadata>, TetherError> {
        queries::sessions::list_archived(&self.db, user_id).await
    }

    async fn read_cumulative_summary(
        &self,
        user_id: &str,
    ) -> Result<Option<CumulativeSummary>, TetherError> {
        queries::summary::read(&self.db, user_id).await
    }

    async fn write_cumulative_summary(
        &self,
        user_id: &str,
        summary: &CumulativeSummary,
    ) -> Result<(), TetherError> {
        queries::summary::write(&self.db, user_id, summary).await
    }
}
