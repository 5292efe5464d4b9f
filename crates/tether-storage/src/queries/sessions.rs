// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archived sessions.

use rusqlite::params;
use tether_core::{SessionMetadata, TetherError};

use crate::database::{map_tr_err, Database};
use crate::models::{decode_metadata, encode_metadata, format_ts};

/// Archive a finished session.
///
/// In one transaction: inserts the final metadata and, if the active pointer
/// still refers to this session, removes it. Archived rows are immutable, so a
/// second archive of the same local id fails.
pub async fn archive(db: &Database, user_id: &str, meta: &SessionMetadata) -> Result<(), TetherError> {
    let Some(ended_at) = meta.ended_at else {
        return Err(TetherError::storage(format!(
            "cannot archive session {} without ended_at",
            meta.local_id
        )));
    };

    let user_id = user_id.to_string();
    let local_id = meta.local_id.clone();
    let metadata = encode_metadata(meta)?;
    let created_at = format_ts(&meta.created_at);
    let ended_at = format_ts(&ended_at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sessions (user_id, local_id, metadata, created_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, local_id, metadata, created_at, ended_at],
            )?;
            tx.execute(
                "DELETE FROM active_sessions WHERE user_id = ?1 AND local_id = ?2",
                params![user_id, local_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Archived sessions for a user, newest first by creation time.
pub async fn list_archived(db: &Database, user_id: &str) -> Result<Vec<SessionMetadata>, TetherError> {
    let user_id = user_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT metadata FROM sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    rows.iter().map(|raw| decode_metadata(raw)).collect()
}
