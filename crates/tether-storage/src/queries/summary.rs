// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cumulative summary: one row per user.

use rusqlite::params;
use tether_core::{CumulativeSummary, TetherError};

use crate::database::{map_tr_err, Database};
use crate::models::SummaryRow;

pub async fn read(db: &Database, user_id: &str) -> Result<Option<CumulativeSummary>, TetherError> {
    let user_id = user_id.to_string();
    let row = db
        .connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT text, session_count, updated_at
                 FROM cumulative_summaries WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(SummaryRow {
                        text: row.get(0)?,
                        session_count: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    row.map(SummaryRow::decode).transpose()
}

pub async fn write(
    db: &Database,
    user_id: &str,
    summary: &CumulativeSummary,
) -> Result<(), TetherError> {
    let user_id = user_id.to_string();
    let row = SummaryRow::encode(summary);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO cumulative_summaries (user_id, text, session_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    text = excluded.text,
                    session_count = excluded.session_count,
                    updated_at = excluded.updated_at",
                params![user_id, row.text, row.session_count, row.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn upsert_replaces_previous_summary() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(read(&db, "alice").await.unwrap().is_none());

        let first = CumulativeSummary {
            text: "likes rust".to_string(),
            session_count: 1,
            updated_at: Utc::now(),
        };
        write(&db, "alice", &first).await.unwrap();

        let second = CumulativeSummary {
            text: "likes rust and tea".to_string(),
            session_count: 2,
            updated_at: Utc::now(),
        };
        write(&db, "alice", &second).await.unwrap();

        let read_back = read(&db, "alice").await.unwrap().unwrap();
        assert_eq!(read_back.text, "likes rust and tea");
        assert_eq!(read_back.session_count, 2);
    }
}
