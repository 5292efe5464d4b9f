// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Active session pointer: one row per user.

use rusqlite::params;
use tether_core::{SessionMetadata, TetherError};

use crate::database::{map_tr_err, Database};
use crate::models::{decode_metadata, encode_metadata, format_ts};

/// Read the user's active session metadata.
pub async fn read_active(db: &Database, user_id: &str) -> Result<Option<SessionMetadata>, TetherError> {
    let user_id = user_id.to_string();
    let raw = db
        .connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT metadata FROM active_sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(raw) => Ok(Some(raw)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    raw.as_deref().map(decode_metadata).transpose()
}

/// Insert or overwrite the user's active session pointer.
pub async fn write_active(
    db: &Database,
    user_id: &str,
    meta: &SessionMetadata,
) -> Result<(), TetherError> {
    let user_id = user_id.to_string();
    let local_id = meta.local_id.clone();
    let metadata = encode_metadata(meta)?;
    let updated_at = format_ts(&meta.updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO active_sessions (user_id, local_id, metadata, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    local_id = excluded.local_id,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at",
                params![user_id, local_id, metadata, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove the pointer. Returns whether a row existed.
pub async fn clear_active(db: &Database, user_id: &str) -> Result<bool, TetherError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM active_sessions WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Make `meta` the active session, dropping any log rows already stored
/// under its local id so the new session starts empty.
pub async fn create_active(
    db: &Database,
    user_id: &str,
    meta: &SessionMetadata,
) -> Result<(), TetherError> {
    let user_id = user_id.to_string();
    let local_id = meta.local_id.clone();
    let metadata = encode_metadata(meta)?;
    let updated_at = format_ts(&meta.updated_at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM conversation_entries WHERE user_id = ?1 AND local_id = ?2",
                params![user_id, local_id],
            )?;
            tx.execute(
                "INSERT INTO active_sessions (user_id, local_id, metadata, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    local_id = excluded.local_id,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at",
                params![user_id, local_id, metadata, updated_at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
