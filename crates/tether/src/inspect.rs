// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether status` and `tether summary`.
//!
//! Both read the session store directly; the rotation engine is not
//! involved, so nothing is rotated or summarized here.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tether_config::TetherConfig;
use tether_core::{CumulativeSummary, SessionMetadata, SessionStore, TetherError};
use tether_storage::SqliteSessionStore;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub user_id: String,
    pub active: Option<ActiveReport>,
    pub archived: Vec<ArchivedReport>,
}

#[derive(Debug, Serialize)]
pub struct ActiveReport {
    pub local_id: String,
    pub external_session_id: Option<String>,
    pub message_count: u64,
    pub total_turns: u64,
    pub total_cost_usd: f64,
    pub context_ratio: f64,
    pub carryover_entries: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ArchivedReport {
    pub local_id: String,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message_count: u64,
    pub rotation_reason: Option<String>,
    pub summary: Option<String>,
}

impl From<&SessionMetadata> for ActiveReport {
    fn from(meta: &SessionMetadata) -> Self {
        Self {
            local_id: meta.local_id.clone(),
            external_session_id: meta.external_session_id.clone(),
            message_count: meta.message_count,
            total_turns: meta.total_turns,
            total_cost_usd: meta.total_cost_usd,
            context_ratio: meta.context_ratio(),
            carryover_entries: meta.carryover.as_ref().map_or(0, Vec::len),
            updated_at: meta.updated_at,
        }
    }
}

impl From<&SessionMetadata> for ArchivedReport {
    fn from(meta: &SessionMetadata) -> Self {
        Self {
            local_id: meta.local_id.clone(),
            created_at: meta.created_at,
            ended_at: meta.ended_at,
            message_count: meta.message_count,
            rotation_reason: meta.rotation_reason.map(|reason| reason.to_string()),
            summary: meta.summary.clone(),
        }
    }
}

/// Collect the active and archived sessions for `user_id`.
pub async fn build_status_report(
    store: &dyn SessionStore,
    user_id: &str,
) -> Result<StatusReport, TetherError> {
    let active = store.read_active(user_id).await?;
    let archived = store.list_archived(user_id).await?;
    Ok(StatusReport {
        user_id: user_id.to_string(),
        active: active.as_ref().map(ActiveReport::from),
        archived: archived.iter().map(ArchivedReport::from).collect(),
    })
}

pub async fn run_status(
    config: &TetherConfig,
    user_id: &str,
    json: bool,
    plain: bool,
) -> Result<(), TetherError> {
    debug!(path = config.storage.database_path.as_str(), user_id, "reading session status");
    let store = SqliteSessionStore::open(&config.storage).await?;
    let report = build_status_report(&store, user_id).await;
    store.close().await?;
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&report, use_color);
    }
    Ok(())
}

pub async fn run_summary(config: &TetherConfig, user_id: &str, json: bool) -> Result<(), TetherError> {
    debug!(path = config.storage.database_path.as_str(), user_id, "reading cumulative summary");
    let store = SqliteSessionStore::open(&config.storage).await?;
    let summary = store.read_cumulative_summary(user_id).await;
    store.close().await?;
    let summary = summary?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    match summary {
        Some(summary) => print_summary(&summary),
        None => println!("No cumulative summary for {user_id} yet."),
    }
    Ok(())
}

fn print_status(report: &StatusReport, use_color: bool) {
    println!();
    println!("  tether status: {}", report.user_id);
    println!("  {}", "-".repeat(35));

    match &report.active {
        Some(active) => {
            let ratio = format!("{:.0}%", active.context_ratio * 100.0);
            let ratio = if use_color {
                use colored::Colorize;
                if active.context_ratio >= 0.8 {
                    ratio.yellow().to_string()
                } else {
                    ratio.green().to_string()
                }
            } else {
                ratio
            };
            println!("    Active:   {}", active.local_id);
            println!(
                "    Agent:    {}",
                active.external_session_id.as_deref().unwrap_or("(not started)")
            );
            println!(
                "    Usage:    {} messages, {} turns, ${:.4}",
                active.message_count, active.total_turns, active.total_cost_usd
            );
            println!("    Context:  {ratio}");
            if active.carryover_entries > 0 {
                println!("    Carryover: {} entries pending", active.carryover_entries);
            }
            println!("    Updated:  {}", active.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("    Active:   none"),
    }

    println!();
    println!("  Archived sessions ({})", report.archived.len());
    for session in &report.archived {
        let reason = session.rotation_reason.as_deref().unwrap_or("unknown");
        println!(
            "    {}  {}  {} messages  [{reason}]",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.local_id,
            session.message_count
        );
        if let Some(summary) = &session.summary {
            println!("      {}", first_line(summary));
        }
    }
    println!();
}

fn print_summary(summary: &CumulativeSummary) {
    println!(
        "Cumulative summary ({} sessions, updated {}):",
        summary.session_count,
        summary.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
    println!("{}", summary.text);
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use tether_core::RotationReason;
    use tether_test_utils::TestStore;

    use super::*;

    #[tokio::test]
    async fn report_lists_active_and_archived_sessions() {
        let harness = TestStore::new().await.unwrap();
        let store = harness.store.as_ref();

        let mut old = store.create_active("alice").await.unwrap();
        old.message_count = 4;
        old.ended_at = Some(Utc::now());
        old.summary = Some("talked about tests\nsecond line".to_string());
        old.rotation_reason = Some(RotationReason::MaxContext);
        store.archive("alice", &old).await.unwrap();

        let mut active = store.create_active("alice").await.unwrap();
        active.context_tokens = 500;
        active.context_window_tokens = 1_000;
        store.write_active("alice", &active).await.unwrap();

        let report = build_status_report(store, "alice").await.unwrap();

        let reported = report.active.as_ref().unwrap();
        assert_eq!(reported.local_id, active.local_id);
        assert!((reported.context_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.archived.len(), 1);
        assert_eq!(report.archived[0].rotation_reason.as_deref(), Some("max_context"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"user_id\":\"alice\""));
        assert!(json.contains("\"message_count\":4"));
    }

    #[tokio::test]
    async fn report_for_unknown_user_is_empty() {
        let harness = TestStore::new().await.unwrap();
        let report = build_status_report(harness.store.as_ref(), "nobody")
            .await
            .unwrap();
        assert!(report.active.is_none());
        assert!(report.archived.is_empty());
    }

    #[test]
    fn first_line_of_multiline_summary() {
        assert_eq!(first_line("one\ntwo"), "one");
        assert_eq!(first_line(""), "");
    }
}
