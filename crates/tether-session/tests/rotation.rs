// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rotation engine behavior against a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tether_config::model::SessionConfig;
use tether_core::{Role, RotationReason, SessionStore};
use tether_session::{PrepStatus, QueryExchange, RecordOutcome, RotationEngine};
use tether_test_utils::{session_config, MockRuntime, MockSummarizer, TestStore};

const USER: &str = "alice";

struct Fixture {
    engine: Arc<RotationEngine>,
    summarizer: Arc<MockSummarizer>,
    harness: TestStore,
}

async fn fixture(summarizer: MockSummarizer, config: SessionConfig) -> Fixture {
    let harness = TestStore::new().await.unwrap();
    let summarizer = Arc::new(summarizer);
    let engine = Arc::new(RotationEngine::new(
        harness.store.clone(),
        summarizer.clone(),
        &config,
    ));
    Fixture {
        engine,
        summarizer,
        harness,
    }
}

fn exchange(prompt: &str, context_tokens: u64, cost_usd: f64) -> QueryExchange {
    let mut response = MockRuntime::response(&format!("re: {prompt}"), context_tokens, 1_000);
    response.cost_usd = cost_usd;
    QueryExchange {
        prompt: prompt.to_string(),
        prompted_at: Utc::now(),
        response,
    }
}

/// Run one query through the engine: ensure, then record.
async fn query(f: &Fixture, prompt: &str, context_tokens: u64) -> String {
    let session = f.engine.ensure_active_session(USER).await.unwrap();
    let outcome = f
        .engine
        .record_query_result(USER, &session.local_id, &exchange(prompt, context_tokens, 0.01))
        .await
        .unwrap();
    assert_eq!(outcome, RecordOutcome::Applied);
    session.local_id
}

async fn wait_for_prep(f: &Fixture, expected: PrepStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if f.engine.status(USER).await.unwrap().prep == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("background preparation did not reach the expected state");
}

#[tokio::test]
async fn rotating_an_unused_session_is_a_no_op() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    let fresh = f.engine.ensure_active_session(USER).await.unwrap();

    let after = f.engine.rotate(USER, RotationReason::Manual).await.unwrap();

    assert_eq!(after.local_id, fresh.local_id);
    assert_eq!(f.summarizer.summarize_calls(), 0);
    assert!(f.harness.store.list_archived(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_rotation_without_any_session_creates_one() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    let created = f.engine.rotate(USER, RotationReason::Manual).await.unwrap();
    assert!(f.harness.store.read_active(USER).await.unwrap().is_some());
    assert_eq!(created.message_count, 0);
    assert_eq!(f.summarizer.summarize_calls(), 0);
}

#[tokio::test]
async fn counters_are_monotonic_across_queries() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    let costs = [0.01, 0.02, 0.005, 0.1, 0.0];

    let mut local_id = None;
    for (i, cost) in costs.iter().enumerate() {
        let session = f.engine.ensure_active_session(USER).await.unwrap();
        f.engine
            .record_query_result(USER, &session.local_id, &exchange(&format!("q{i}"), 100, *cost))
            .await
            .unwrap();
        local_id.get_or_insert(session.local_id.clone());
        assert_eq!(local_id.as_deref(), Some(session.local_id.as_str()));
    }

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, costs.len() as u64);
    assert_eq!(active.total_turns, costs.len() as u64);
    let expected: f64 = costs.iter().sum();
    assert!((active.total_cost_usd - expected).abs() < 1e-9);

    let log = f
        .harness
        .store
        .read_conversation(USER, &active.local_id)
        .await
        .unwrap();
    assert_eq!(log.len(), costs.len() * 2);
    assert!(log
        .chunks(2)
        .all(|pair| pair[0].role == Role::User && pair[1].role == Role::Assistant));
}

#[tokio::test]
async fn timeout_rotates_synchronously() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    let old_id = query(&f, "hello", 100).await;

    let mut stale = f.harness.store.read_active(USER).await.unwrap().unwrap();
    stale.updated_at = Utc::now() - TimeDelta::hours(5);
    f.harness.store.write_active(USER, &stale).await.unwrap();

    let fresh = f.engine.ensure_active_session(USER).await.unwrap();
    assert_ne!(fresh.local_id, old_id);

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].local_id, old_id);
    assert_eq!(archived[0].rotation_reason, Some(RotationReason::Timeout));
    assert_eq!(archived[0].summary.as_deref(), Some("summary of 2 entries"));
    assert!(archived[0].ended_at.is_some());
}

#[tokio::test]
async fn soft_threshold_prepares_and_next_ensure_switches_with_carryover() {
    let f = fixture(MockSummarizer::gated(), session_config(0.8, 0.9)).await;

    // Message 1 crosses the soft ratio: the snapshot covers one pair.
    let old_id = query(&f, "q1", 820).await;
    f.summarizer.wait_started().await;
    query(&f, "q2", 830).await;
    query(&f, "q3", 840).await;
    assert_eq!(
        f.engine.status(USER).await.unwrap().prep,
        Some(PrepStatus::Pending)
    );

    f.summarizer.release();
    wait_for_prep(&f, PrepStatus::Ready).await;

    let fresh = f.engine.ensure_active_session(USER).await.unwrap();
    assert_ne!(fresh.local_id, old_id);
    assert_eq!(fresh.context_tokens, 0);

    let carryover = fresh.carryover.clone().expect("carryover attached");
    let contents: Vec<_> = carryover.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["q2", "re: q2", "q3", "re: q3"]);

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].summary.as_deref(), Some("summary of 2 entries"));
    assert_eq!(archived[0].rotation_reason, Some(RotationReason::MaxContext));

    // Carryover is surfaced once, then cleared by the first completed query.
    f.engine
        .record_query_result(USER, &fresh.local_id, &exchange("q4", 10, 0.01))
        .await
        .unwrap();
    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert!(active.carryover.is_none());
    assert_eq!(active.message_count, 1);
}

#[tokio::test]
async fn force_threshold_blocks_until_preparation_finishes() {
    let f = fixture(MockSummarizer::gated(), session_config(0.8, 0.9)).await;

    let old_id = query(&f, "q1", 820).await;
    f.summarizer.wait_started().await;
    query(&f, "q2", 950).await;

    let engine = f.engine.clone();
    let pending = tokio::spawn(async move { engine.ensure_active_session(USER).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished(), "ensure must wait for the summary");
    assert!(f.harness.store.list_archived(USER).await.unwrap().is_empty());

    f.summarizer.release();
    let fresh = pending.await.unwrap().unwrap();

    assert_ne!(fresh.local_id, old_id);
    assert_eq!(fresh.context_tokens, 0);
    assert_eq!(fresh.carryover.as_ref().map(Vec::len), Some(2));

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 1, "exactly one archive");
    assert_eq!(archived[0].local_id, old_id);
    assert_eq!(
        f.harness.store.read_active(USER).await.unwrap().unwrap().local_id,
        fresh.local_id,
        "exactly one new active session"
    );
    assert_eq!(f.summarizer.summarize_calls(), 1);
}

#[tokio::test]
async fn manual_rotation_discards_in_flight_preparation() {
    let f = fixture(MockSummarizer::gated(), session_config(0.8, 0.9)).await;
    let old_id = query(&f, "q1", 850).await;
    f.summarizer.wait_started().await;

    let engine = f.engine.clone();
    let rotating = tokio::spawn(async move { engine.rotate(USER, RotationReason::Manual).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    f.summarizer.release();
    let manual = rotating.await.unwrap().unwrap();
    assert_ne!(manual.local_id, old_id);

    // The aborted preparation must not archive or switch anything later.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = f.engine.status(USER).await.unwrap();
    assert!(status.prep.is_none());

    let again = f.engine.ensure_active_session(USER).await.unwrap();
    assert_eq!(again.local_id, manual.local_id);

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].rotation_reason, Some(RotationReason::Manual));
}

#[tokio::test]
async fn preparation_for_a_replaced_session_is_discarded() {
    let f = fixture(MockSummarizer::new(), session_config(0.8, 0.9)).await;
    query(&f, "q1", 850).await;
    wait_for_prep(&f, PrepStatus::Ready).await;

    // Another writer replaced the active session behind the engine's back.
    let replacement = f.harness.store.create_active(USER).await.unwrap();
    assert_eq!(
        f.engine.status(USER).await.unwrap().prep,
        Some(PrepStatus::Discarded)
    );

    let current = f.engine.ensure_active_session(USER).await.unwrap();
    assert_eq!(current.local_id, replacement.local_id);
    assert!(f.harness.store.list_archived(USER).await.unwrap().is_empty());
    assert!(f.engine.status(USER).await.unwrap().prep.is_none());
}

#[tokio::test]
async fn query_finishing_after_rotation_is_dropped() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    let old_id = query(&f, "q1", 100).await;
    let fresh = f.engine.rotate(USER, RotationReason::Manual).await.unwrap();

    let late = f
        .engine
        .record_query_result(USER, &old_id, &exchange("late", 100, 0.5))
        .await
        .unwrap();
    assert_eq!(late, RecordOutcome::Stale);

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.local_id, fresh.local_id);
    assert_eq!(active.message_count, 0);
    assert_eq!(
        f.harness
            .store
            .read_conversation(USER, &old_id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn failed_summary_uses_fallback_and_rotation_completes() {
    let f = fixture(MockSummarizer::new(), SessionConfig::default()).await;
    f.summarizer.set_mode(tether_test_utils::SummarizerMode::Fail);
    query(&f, "q1", 100).await;
    query(&f, "q2", 100).await;

    f.engine.rotate(USER, RotationReason::Manual).await.unwrap();
    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(
        archived[0].summary.as_deref(),
        Some("[Summary generation failed] Session had 2 messages over 2 turns.")
    );
}

#[tokio::test]
async fn disabled_summaries_never_call_the_summarizer() {
    let config = SessionConfig {
        summary_enabled: false,
        max_recent_sessions: 1,
        ..SessionConfig::default()
    };
    let f = fixture(MockSummarizer::new(), config).await;

    for _ in 0..3 {
        query(&f, "q", 100).await;
        f.engine.rotate(USER, RotationReason::Manual).await.unwrap();
    }

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 3);
    assert!(archived.iter().all(|meta| meta.summary.is_none()));
    assert_eq!(f.summarizer.summarize_calls(), 0);
    assert_eq!(f.summarizer.condense_calls(), 0);
    assert!(f
        .harness
        .store
        .read_cumulative_summary(USER)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn rotations_fold_old_sessions_and_recall_returns_the_window() {
    let config = SessionConfig {
        max_recent_sessions: 2,
        ..SessionConfig::default()
    };
    let f = fixture(MockSummarizer::new(), config).await;

    for i in 0..4 {
        query(&f, &format!("session {i}"), 100).await;
        f.engine.rotate(USER, RotationReason::Manual).await.unwrap();
    }

    let cumulative = f
        .harness
        .store
        .read_cumulative_summary(USER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cumulative.session_count, 2);
    assert_eq!(f.summarizer.condense_calls(), 2);

    // Nothing new aged out, so a direct call changes nothing.
    f.engine.consolidate(USER).await.unwrap();
    let again = f
        .harness
        .store
        .read_cumulative_summary(USER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, cumulative);
    assert_eq!(f.summarizer.condense_calls(), 2);

    let recall = f.engine.recall(USER).await.unwrap();
    assert_eq!(recall.recent.len(), 2);
    assert!(recall.cumulative.is_some());
    assert!(recall.recent[0].created_at >= recall.recent[1].created_at);
}
