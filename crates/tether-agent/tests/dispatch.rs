// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatcher behavior with a scripted runtime and a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use tether_agent::AgentDispatcher;
use tether_config::model::{QueueConfig, SessionConfig};
use tether_core::{ReplySink, Role, SessionStore, TetherError};
use tether_queue::{HandleOutcome, MessageHandler, MessageQueue, QueuedMessage};
use tether_session::RotationEngine;
use tether_test_utils::{
    session_config, MockRuntime, MockSink, MockSummarizer, ScriptedReply, TestStore,
};
use tokio_util::sync::CancellationToken;

const USER: &str = "bob";

struct Fixture {
    dispatcher: Arc<AgentDispatcher>,
    runtime: Arc<MockRuntime>,
    summarizer: Arc<MockSummarizer>,
    sink: Arc<MockSink>,
    harness: TestStore,
}

async fn fixture(script: Vec<ScriptedReply>, summarizer: MockSummarizer, config: SessionConfig) -> Fixture {
    let harness = TestStore::new().await.unwrap();
    let summarizer = Arc::new(summarizer);
    let runtime = Arc::new(MockRuntime::with_script(script));
    let engine = Arc::new(RotationEngine::new(
        harness.store.clone(),
        summarizer.clone(),
        &config,
    ));
    Fixture {
        dispatcher: Arc::new(AgentDispatcher::new(engine, runtime.clone())),
        runtime,
        summarizer,
        sink: Arc::new(MockSink::new()),
        harness,
    }
}

fn message(f: &Fixture, text: &str) -> QueuedMessage {
    let sink: Arc<dyn ReplySink> = f.sink.clone();
    QueuedMessage::new(USER, text, "test", sink)
}

async fn send(f: &Fixture, text: &str) -> Result<HandleOutcome, TetherError> {
    f.dispatcher
        .handle(&message(f, text), CancellationToken::new())
        .await
}

#[tokio::test]
async fn first_message_starts_a_session_and_replies() {
    let f = fixture(Vec::new(), MockSummarizer::new(), SessionConfig::default()).await;

    let outcome = send(&f, "hello").await.unwrap();

    assert_eq!(outcome, HandleOutcome::Completed);
    assert_eq!(f.sink.replies().await, vec!["mock response"]);
    assert!(f.sink.typing_count() >= 1);

    let requests = f.runtime.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "hello");
    assert_eq!(requests[0].resume_session_id, None);

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 1);
    assert_eq!(active.external_session_id.as_deref(), Some("ext-session"));

    let log = f
        .harness
        .store
        .read_conversation(USER, &active.local_id)
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[0].content, "hello");
    assert_eq!(log[1].content, "mock response");
}

#[tokio::test]
async fn later_messages_resume_the_agent_session() {
    let f = fixture(Vec::new(), MockSummarizer::new(), SessionConfig::default()).await;

    send(&f, "one").await.unwrap();
    send(&f, "two").await.unwrap();

    let requests = f.runtime.requests().await;
    assert_eq!(requests[1].prompt, "two");
    assert_eq!(requests[1].resume_session_id.as_deref(), Some("ext-session"));
}

#[tokio::test]
async fn crash_while_resuming_is_retried_once_without_resume() {
    let f = fixture(
        vec![
            ScriptedReply::Respond(MockRuntime::response("first", 100, 1_000)),
            ScriptedReply::Crash("resume failed".to_string()),
        ],
        MockSummarizer::new(),
        SessionConfig::default(),
    )
    .await;

    send(&f, "one").await.unwrap();
    let outcome = send(&f, "two").await.unwrap();

    assert_eq!(outcome, HandleOutcome::Completed);
    let requests = f.runtime.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].resume_session_id.as_deref(), Some("ext-session"));
    assert_eq!(requests[2].resume_session_id, None);
    assert_eq!(f.sink.replies().await.len(), 2);

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 2);
}

#[tokio::test]
async fn crash_on_a_fresh_agent_session_is_not_retried() {
    let f = fixture(
        vec![ScriptedReply::Crash("startup failed".to_string())],
        MockSummarizer::new(),
        SessionConfig::default(),
    )
    .await;

    let result = send(&f, "hello").await;

    assert!(matches!(result, Err(TetherError::AgentCrashed { .. })));
    assert_eq!(f.runtime.call_count().await, 1);
    assert!(f.sink.replies().await.is_empty());
}

#[tokio::test]
async fn rate_limit_is_returned_to_the_queue() {
    let f = fixture(
        vec![ScriptedReply::RateLimited(None)],
        MockSummarizer::new(),
        SessionConfig::default(),
    )
    .await;

    let result = send(&f, "hello").await;

    assert!(matches!(result, Err(TetherError::RateLimited { reset_at: None })));
    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 0);
}

#[tokio::test]
async fn cancellation_interrupts_without_recording() {
    let f = fixture(
        vec![ScriptedReply::Hang],
        MockSummarizer::new(),
        SessionConfig::default(),
    )
    .await;
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let outcome = f
        .dispatcher
        .handle(&message(&f, "long task"), cancel)
        .await
        .unwrap();

    assert_eq!(outcome, HandleOutcome::Interrupted);
    assert!(f.sink.replies().await.is_empty());
    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 0);
}

#[tokio::test]
async fn fresh_session_after_switch_is_primed_with_carryover_and_recent_summary() {
    let f = fixture(
        vec![
            ScriptedReply::Respond(MockRuntime::response("a1", 850, 1_000)),
            ScriptedReply::Respond(MockRuntime::response("a2", 950, 1_000)),
        ],
        MockSummarizer::gated(),
        session_config(0.8, 0.9),
    )
    .await;

    // Crosses the soft threshold; preparation starts and stays pending.
    send(&f, "q1").await.unwrap();
    // Still below the force threshold, so this runs in the old session.
    send(&f, "q2").await.unwrap();

    f.summarizer.release();
    send(&f, "q3").await.unwrap();

    let requests = f.runtime.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].resume_session_id, None);
    let prompt = &requests[2].prompt;
    assert!(prompt.contains("[Recent sessions]"), "{prompt}");
    assert!(prompt.contains("summary of 2 entries"), "{prompt}");
    assert!(
        prompt.contains("[Continuing from the previous session]\nUser: q2\nAssistant: a2\n"),
        "{prompt}"
    );
    assert!(prompt.ends_with("[Current message]\nq3"), "{prompt}");

    let archived = f.harness.store.list_archived(USER).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].message_count, 2);

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 1);
    assert!(active.carryover.is_none(), "carryover is surfaced once");
}

#[tokio::test]
async fn queue_drives_dispatcher_end_to_end() {
    let f = fixture(Vec::new(), MockSummarizer::new(), SessionConfig::default()).await;
    let queue = MessageQueue::new(f.dispatcher.clone(), &QueueConfig::default());

    for text in ["a", "b", "c"] {
        queue.enqueue(message(&f, text));
    }

    let replies = f.sink.wait_for_replies(3).await;
    assert_eq!(replies.len(), 3);

    let prompts: Vec<_> = f
        .runtime
        .requests()
        .await
        .into_iter()
        .map(|request| request.prompt)
        .collect();
    assert_eq!(prompts, vec!["a", "b", "c"]);

    let active = f.harness.store.read_active(USER).await.unwrap().unwrap();
    assert_eq!(active.message_count, 3);
}
