// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only conversation logs.

use rusqlite::params;
use tether_core::{ConversationEntry, TetherError};

use crate::database::{map_tr_err, Database};
use crate::models::EntryRow;

/// Append entries in order, all or nothing.
pub async fn append(
    db: &Database,
    user_id: &str,
    local_id: &str,
    entries: &[ConversationEntry],
) -> Result<(), TetherError> {
    if entries.is_empty() {
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(EntryRow::encode)
        .collect::<Result<Vec<_>, _>>()?;
    let user_id = user_id.to_string();
    let local_id = local_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO conversation_entries
                        (user_id, local_id, timestamp, role, content, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in &rows {
                    stmt.execute(params![
                        user_id,
                        local_id,
                        row.timestamp,
                        row.role,
                        row.content,
                        row.metadata,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The full log of one session in insertion order.
pub async fn read(
    db: &Database,
    user_id: &str,
    local_id: &str,
) -> Result<Vec<ConversationEntry>, TetherError> {
    let user_id = user_id.to_string();
    let local_id = local_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, role, content, metadata
                 FROM conversation_entries
                 WHERE user_id = ?1 AND local_id = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(params![user_id, local_id], |row| {
                    Ok(EntryRow {
                        timestamp: row.get(0)?,
                        role: row.get(1)?,
                        content: row.get(2)?,
                        metadata: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter().map(EntryRow::decode).collect()
}
