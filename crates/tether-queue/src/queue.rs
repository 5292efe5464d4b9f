// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user FIFO with a single drain task per user.
//!
//! `enqueue` appends and, when the user is idle and not paused, spawns a
//! drain task. The drain task pops messages one at a time until the queue is
//! empty or paused. A rate-limited message goes back to the front and a
//! single resume timer restarts draining at the reset time.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tether_config::model::QueueConfig;
use tether_core::{ReplySink, TetherError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handler::{HandleOutcome, MessageHandler, QueuedMessage};

const APOLOGY: &str = "Sorry, something went wrong while handling your message. Please try again.";
const RESUMED_NOTICE: &str = "Rate limit lifted. Continuing with your queued messages.";

/// Shortest pause, used when the reported reset time has already passed.
const MIN_PAUSE_SECS: i64 = 1;

#[derive(Default)]
struct UserQueue {
    pending: VecDeque<QueuedMessage>,
    processing: bool,
    paused_until: Option<DateTime<Utc>>,
    current: Option<CancellationToken>,
    resume_timer: Option<JoinHandle<()>>,
}

struct QueueInner {
    handler: Arc<dyn MessageHandler>,
    default_wait: TimeDelta,
    users: DashMap<String, Arc<Mutex<UserQueue>>>,
}

/// Serializes message handling per user. Cheap to clone.
#[derive(Clone)]
pub struct MessageQueue {
    inner: Arc<QueueInner>,
}

impl MessageQueue {
    pub fn new(handler: Arc<dyn MessageHandler>, config: &QueueConfig) -> Self {
        let wait_secs = i64::try_from(config.default_rate_limit_wait_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Self {
            inner: Arc::new(QueueInner {
                handler,
                default_wait: TimeDelta::seconds(wait_secs),
                users: DashMap::new(),
            }),
        }
    }

    /// Append a message. Starts processing if the user is idle and not paused.
    pub fn enqueue(&self, message: QueuedMessage) {
        let user_id = message.user_id.clone();
        let start = self.inner.with_user(&user_id, |queue| {
            queue.pending.push_back(message);
            if queue.processing || queue.paused_until.is_some() {
                false
            } else {
                queue.processing = true;
                true
            }
        });

        debug!(user_id = %user_id, start, "message enqueued");
        if start {
            tokio::spawn(drain(Arc::clone(&self.inner), user_id));
        }
    }

    /// Cancel the message currently being handled for `user_id`.
    ///
    /// Queued messages are untouched. Returns false when nothing is in flight.
    pub fn interrupt(&self, user_id: &str) -> bool {
        let cancelled = self.inner.with_user(user_id, |queue| match &queue.current {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        });
        if cancelled {
            info!(user_id, "interrupt requested");
        }
        cancelled
    }

    pub fn pending_len(&self, user_id: &str) -> usize {
        self.inner.with_user(user_id, |queue| queue.pending.len())
    }

    pub fn is_processing(&self, user_id: &str) -> bool {
        self.inner.with_user(user_id, |queue| queue.processing)
    }

    pub fn paused_until(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.inner.with_user(user_id, |queue| queue.paused_until)
    }
}

impl QueueInner {
    /// Run `f` with the user's queue locked. Never held across an await.
    fn with_user<R>(&self, user_id: &str, f: impl FnOnce(&mut UserQueue) -> R) -> R {
        let queue = self.users.entry(user_id.to_string()).or_default().clone();
        let mut guard = queue.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Put `message` back at the front and pause until the reset time.
    async fn pause(self: &Arc<Self>, user_id: &str, message: QueuedMessage, reset_at: Option<DateTime<Utc>>) {
        let now = Utc::now();
        let min_pause = TimeDelta::seconds(MIN_PAUSE_SECS);
        let until = match reset_at {
            Some(reset) if reset - now >= min_pause => reset,
            Some(_) => now + min_pause,
            None => now
                .checked_add_signed(self.default_wait)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let wait = (until - now).to_std().unwrap_or_default();
        let sink = Arc::clone(&message.sink);

        let inner = Arc::clone(self);
        let timer_user = user_id.to_string();
        self.with_user(user_id, |queue| {
            queue.pending.push_front(message);
            queue.paused_until = Some(until);
            queue.processing = false;
            if let Some(previous) = queue.resume_timer.take() {
                previous.abort();
            }
            queue.resume_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                resume(inner, timer_user).await;
            }));
        });

        info!(
            user_id,
            until = %until,
            wait_secs = wait.as_secs(),
            "rate limited, queue paused"
        );
        notify(
            sink.as_ref(),
            user_id,
            &format!(
                "I'm being rate limited right now. Your messages are queued and I'll continue at {} UTC.",
                until.format("%H:%M")
            ),
        )
        .await;
    }
}

/// Process the user's queue until it is empty or paused.
///
/// Boxed because the resume timer spawned from inside the loop restarts it.
fn drain(inner: Arc<QueueInner>, user_id: String) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        loop {
            let next = inner.with_user(&user_id, |queue| {
                if queue.paused_until.is_some() {
                    queue.processing = false;
                    return None;
                }
                match queue.pending.pop_front() {
                    Some(message) => {
                        let token = CancellationToken::new();
                        queue.current = Some(token.clone());
                        Some((message, token))
                    }
                    None => {
                        queue.processing = false;
                        None
                    }
                }
            });
            let Some((message, token)) = next else {
                debug!(user_id = %user_id, "queue drained");
                return;
            };

            let result = run_unit(&inner.handler, &message, token).await;
            inner.with_user(&user_id, |queue| queue.current = None);

            match result {
                Ok(HandleOutcome::Completed) => {
                    debug!(user_id = %user_id, platform = %message.platform, "message handled");
                }
                Ok(HandleOutcome::Interrupted) | Err(TetherError::Interrupted) => {
                    info!(user_id = %user_id, "message interrupted");
                }
                Err(TetherError::RateLimited { reset_at }) => {
                    inner.pause(&user_id, message, reset_at).await;
                    return;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            user_id = %user_id,
                            platform = %message.platform,
                            error = %e,
                            "message failed with a transient error"
                        );
                    } else {
                        error!(
                            user_id = %user_id,
                            platform = %message.platform,
                            error = %e,
                            "failed to handle message"
                        );
                    }
                    notify(message.sink.as_ref(), &user_id, APOLOGY).await;
                }
            }
        }
    })
}

/// Run one unit of work on its own task so a panicking handler surfaces as
/// an error instead of killing the drain loop.
async fn run_unit(
    handler: &Arc<dyn MessageHandler>,
    message: &QueuedMessage,
    token: CancellationToken,
) -> Result<HandleOutcome, TetherError> {
    let handler = Arc::clone(handler);
    let message = message.clone();
    match tokio::spawn(async move { handler.handle(&message, token).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(TetherError::Internal(format!("message handler panicked: {e}"))),
        Err(e) => Err(TetherError::Internal(format!("message handler task failed: {e}"))),
    }
}

/// Lift the pause and restart draining, on the timer's task.
async fn resume(inner: Arc<QueueInner>, user_id: String) {
    let (start, sink) = inner.with_user(&user_id, |queue| {
        queue.paused_until = None;
        queue.resume_timer = None;
        let sink = queue.pending.front().map(|message| Arc::clone(&message.sink));
        let start = !queue.processing && !queue.pending.is_empty();
        if start {
            queue.processing = true;
        }
        (start, sink)
    });

    info!(user_id = %user_id, "rate limit pause lifted");
    if let Some(sink) = sink {
        notify(sink.as_ref(), &user_id, RESUMED_NOTICE).await;
    }
    if start {
        drain(inner, user_id).await;
    }
}

async fn notify(sink: &dyn ReplySink, user_id: &str, text: &str) {
    if let Err(e) = sink.reply(text).await {
        warn!(user_id, error = %e, "failed to send reply");
    }
}
